//! Authenticated request pipeline with transparent access-token refresh.
//!
//! [`AuthenticatedClient::request`] attaches the stored access token, sends the call, and on
//! HTTP 401 runs the single-flight refresh in [`refresh`] before replaying the call exactly
//! once. Every other outcome is surfaced to the caller unchanged:
//!
//! - 2xx: the decoded body, keys normalized to the local casing;
//! - other statuses (and 401 on anonymous calls): [`Error::RequestFailed`];
//! - network failures: [`Error::Transport`], never retried here;
//! - a failed refresh, or a 401 on the replay: [`Error::AuthExpired`] with the credential cleared;
//! - a store that cannot clear the credential afterwards: [`Error::Storage`], credential untouched.

pub mod pipeline;
pub mod refresh;

pub use pipeline::{BearerAuth, JsonHeaders, RequestStage};

pub(crate) use pipeline::{AuthMode, PendingRequest};
pub use refresh::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::Credential,
	client::pipeline::Pipeline,
	config::ClientConfig,
	error::PayloadError,
	http::{ApiHttpClient, ApiResponse, Method},
	obs::{self, CallKind, CallOutcome, CallSpan},
	store::{CompareAndSwapOutcome, CredentialStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAuthenticatedClient = AuthenticatedClient<ReqwestHttpClient>;

/// Issues requests against one backend on behalf of one credential.
///
/// The client owns the transport, the credential store, and the refresh gate. Clones share all
/// three, so a refresh triggered through any clone is observed by every other clone.
pub struct AuthenticatedClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// HTTP transport used for every outbound call.
	pub http_client: Arc<C>,
	/// Persisted credential slot.
	pub store: Arc<dyn CredentialStore>,
	/// Base endpoint, paths, timeout, and casing.
	pub config: ClientConfig,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	pipeline: Pipeline,
	refresh_gate: Arc<AsyncMutex<()>>,
}
impl<C> AuthenticatedClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			config,
			refresh_metrics: Default::default(),
			pipeline: Pipeline::new(),
			refresh_gate: Arc::new(AsyncMutex::new(())),
		}
	}

	/// Appends an outbound stage that runs after the JSON headers and before bearer auth.
	pub fn with_stage(mut self, stage: impl 'static + RequestStage) -> Self {
		self.pipeline.push(Arc::new(stage));

		self
	}

	/// Returns the stored credential, if any.
	pub async fn credential(&self) -> Result<Option<Credential>> {
		Ok(self.store.load().await?)
	}

	/// Stores `credential`, replacing whatever was stored.
	pub async fn set_credential(&self, credential: Credential) -> Result<()> {
		Ok(self.store.save(credential).await?)
	}

	/// Removes the stored credential, returning it.
	pub async fn clear_credential(&self) -> Result<Option<Credential>> {
		Ok(self.store.clear().await?)
	}

	/// Sends `body` (local casing) to `path` with the stored bearer credential and returns the
	/// response body in the local casing.
	pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
		const KIND: CallKind = CallKind::Request;

		let span = CallSpan::new(KIND, "request");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let body = body.map(|value| self.config.casing.outgoing(value));
				let pending = self.pending(method, path, body.as_ref(), AuthMode::Bearer)?;

				self.execute(pending).await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Same as [`request`](Self::request), decoding the response into `T`.
	pub async fn request_as<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let value = self.request(method, path, body).await?;

		pipeline::decode_value(value, None)
	}

	/// `GET path`, decoding the response into `T`.
	pub async fn get<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.request_as(Method::Get, path, None).await
	}

	/// `POST path` with a serialized `body`, decoding the response into `T`.
	pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.request_as(Method::Post, path, Some(to_value(body)?)).await
	}

	/// `PUT path` with a serialized `body`, decoding the response into `T`.
	pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.request_as(Method::Put, path, Some(to_value(body)?)).await
	}

	/// `PATCH path` with a serialized `body`, decoding the response into `T`.
	pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.request_as(Method::Patch, path, Some(to_value(body)?)).await
	}

	/// `DELETE path`, decoding the response into `T`.
	pub async fn delete<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.request_as(Method::Delete, path, None).await
	}

	/// Captures a call; `wire_body` must already be in the wire casing.
	pub(crate) fn pending(
		&self,
		method: Method,
		path: &str,
		wire_body: Option<&Value>,
		auth: AuthMode,
	) -> Result<PendingRequest> {
		let url = self.config.endpoint_url(path)?;
		let pending = PendingRequest::new(method, url, auth);

		match wire_body {
			Some(body) => pending.with_wire_body(body),
			None => Ok(pending),
		}
	}

	/// Runs the request algorithm: send, refresh on 401, replay once.
	pub(crate) async fn execute(&self, pending: PendingRequest) -> Result<Value> {
		let credential = match pending.auth {
			AuthMode::Bearer => self.store.load().await?,
			AuthMode::Anonymous => None,
		};
		let response = self.send(&pending, credential.as_ref()).await?;

		if !(response.is_unauthorized() && pending.auth == AuthMode::Bearer) {
			return self.finish(response);
		}

		obs::debug_event!(
			method = %pending.method,
			url = %pending.url,
			had_credential = credential.is_some(),
			"backend rejected the access token"
		);

		let rejected = credential.as_ref().map(|credential| credential.access_token.expose());
		let refreshed = self.refresh_after(rejected).await?;
		let replayed = self.send(&pending, Some(&refreshed)).await?;

		if replayed.is_unauthorized() {
			obs::warn_event!(
				method = %pending.method,
				url = %pending.url,
				"backend rejected the refreshed access token"
			);

			self.discard(&refreshed).await?;

			return Err(Error::auth_expired("the backend rejected the refreshed access token"));
		}

		self.finish(replayed)
	}

	/// Sends `pending` once through the pipeline.
	pub(crate) async fn send(
		&self,
		pending: &PendingRequest,
		credential: Option<&Credential>,
	) -> Result<ApiResponse> {
		let request = self.pipeline.build(pending, credential, self.config.transport_timeout())?;

		Ok(self.http_client.execute(request).await?)
	}

	/// Classifies a response that does not need a refresh.
	fn finish(&self, response: ApiResponse) -> Result<Value> {
		if !response.is_success() {
			return Err(pipeline::request_failed(response, &self.config.casing));
		}

		Ok(self.config.casing.incoming(pipeline::decode_json(&response)?))
	}

	/// Clears the store if it still holds `credential`; a newer login is left alone.
	pub(crate) async fn discard(&self, credential: &Credential) -> Result<CompareAndSwapOutcome> {
		match self.store.compare_and_swap(credential.refresh_token.expose(), None).await {
			Ok(CompareAndSwapOutcome::Updated) => {
				obs::debug_event!("cleared the stored credential");

				Ok(CompareAndSwapOutcome::Updated)
			},
			Ok(outcome) => {
				obs::debug_event!("stored credential changed meanwhile; left in place");

				Ok(outcome)
			},
			Err(e) => {
				obs::warn_event!(error = %e, "failed to clear the stored credential");

				Err(e.into())
			},
		}
	}
}
#[cfg(feature = "reqwest")]
impl AuthenticatedClient<ReqwestHttpClient> {
	/// Creates a client backed by a fresh reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Self {
		Self::with_http_client(config, store, ReqwestHttpClient::default())
	}

	/// Creates a client configured from the process environment (`API_BASE_URL`).
	pub fn from_env(store: Arc<dyn CredentialStore>) -> Result<Self> {
		Ok(Self::new(ClientConfig::from_env()?, store))
	}
}
impl<C> Clone for AuthenticatedClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			pipeline: self.pipeline.clone(),
			refresh_gate: self.refresh_gate.clone(),
		}
	}
}
impl<C> Debug for AuthenticatedClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("pipeline", &self.pipeline)
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}

pub(crate) fn to_value<B>(body: &B) -> Result<Value>
where
	B: ?Sized + Serialize,
{
	Ok(serde_json::to_value(body).map_err(PayloadError::Encode)?)
}
