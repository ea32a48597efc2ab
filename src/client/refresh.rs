//! Single-flight access-token refresh.
//!
//! Callers that observe HTTP 401 pass the access token they were rejected with to
//! `refresh_after`. The refresh gate admits one caller at a time; once inside, the caller
//! re-reads the store and either
//!
//! - fails with [`Error::AuthExpired`] when the store is empty (a concurrent refresh failed or the
//!   user logged out),
//! - reuses the stored credential when its access token differs from the rejected one (a
//!   concurrent caller already refreshed), or
//! - performs the refresh call itself.
//!
//! A burst of N rejected requests therefore costs one refresh call. A successful refresh
//! replaces the credential through `CredentialStore::compare_and_swap`; any failure clears it
//! the same way, so a login that lands mid-refresh is never overwritten. A store that fails to
//! clear the credential surfaces as [`Error::Storage`] instead of [`Error::AuthExpired`].

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use serde_json::Map;
// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenGrant},
	casing::KeyCase,
	client::{AuthMode, AuthenticatedClient, pipeline},
	error::PayloadError,
	http::{ApiHttpClient, Method},
	obs::{self, CallKind, CallOutcome, CallSpan},
	store::CompareAndSwapOutcome,
};

impl<C> AuthenticatedClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Exchanges the stored refresh token for a new access token and stores the result.
	///
	/// Concurrent calls (explicit or triggered by rejected requests) share one refresh call. On
	/// failure the stored credential is cleared and [`Error::AuthExpired`] is returned with the
	/// underlying failure as its source.
	pub async fn refresh(&self) -> Result<Credential> {
		const KIND: CallKind = CallKind::Refresh;

		let span = CallSpan::new(KIND, "refresh");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let observed = self.store.load().await?;
				let observed = observed.as_ref().map(|credential| credential.access_token.expose());

				self.refresh_after(observed).await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Refreshes unless the stored access token already differs from `rejected`.
	pub(crate) async fn refresh_after(&self, rejected: Option<&str>) -> Result<Credential> {
		let _singleflight = self.refresh_gate.lock().await;
		let Some(current) = self.store.load().await? else {
			return Err(Error::auth_expired("no credential is stored"));
		};

		if rejected != Some(current.access_token.expose()) {
			self.refresh_metrics.record_coalesced();

			obs::debug_event!("reusing the credential refreshed by a concurrent caller");

			return Ok(current);
		}

		self.refresh_metrics.record_attempt();

		obs::debug_event!(endpoint = %self.config.endpoints.refresh, "refreshing the access token");

		let refreshed = match self.exchange_refresh_token(&current).await {
			Ok(refreshed) => refreshed,
			Err(err) => {
				self.refresh_metrics.record_failure();

				obs::warn_event!(error = %err, "access-token refresh failed; ending the session");

				self.discard(&current).await?;

				return Err(Error::AuthExpired {
					reason: "the access token could not be refreshed".into(),
					source: Some(Box::new(err)),
				});
			},
		};

		self.install(&current, refreshed).await
	}

	async fn exchange_refresh_token(&self, current: &Credential) -> Result<Credential> {
		let mut body = Map::new();

		body.insert(
			self.config.refresh_field.clone(),
			Value::String(current.refresh_token.expose().to_owned()),
		);

		let body = self.config.casing.outgoing(Value::Object(body));
		let pending = self.pending(
			Method::Post,
			&self.config.endpoints.refresh,
			Some(&body),
			AuthMode::Anonymous,
		)?;
		let response = self.send(&pending, None).await?;

		if !response.is_success() {
			return Err(pipeline::request_failed(response, &self.config.casing));
		}

		let status = Some(response.status());
		let grant = pipeline::decode_value::<TokenGrant>(
			KeyCase::Snake.apply(pipeline::decode_json(&response)?),
			status,
		)?;

		if grant.access_token.is_empty() {
			return Err(PayloadError::EmptyToken { field: "access_token" }.into());
		}

		Ok(current.rotate(grant.access_token, grant.refresh_token))
	}

	async fn install(&self, current: &Credential, refreshed: Credential) -> Result<Credential> {
		let outcome = self
			.store
			.compare_and_swap(current.refresh_token.expose(), Some(refreshed.clone()))
			.await
			.inspect_err(|_| self.refresh_metrics.record_failure())?;

		match outcome {
			CompareAndSwapOutcome::Updated => {
				self.refresh_metrics.record_success();

				Ok(refreshed)
			},
			CompareAndSwapOutcome::RefreshMismatch => {
				self.refresh_metrics.record_success();

				obs::debug_event!("a new credential was stored during the refresh; keeping it");

				self.store
					.load()
					.await?
					.ok_or_else(|| Error::auth_expired("the credential was cleared during the refresh"))
			},
			CompareAndSwapOutcome::Missing => {
				self.refresh_metrics.record_failure();

				Err(Error::auth_expired("the credential was cleared during the refresh"))
			},
		}
	}
}
