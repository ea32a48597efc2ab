//! Ordered outbound stages and response decoding.
//!
//! Every transport attempt (including the retry after a refresh) is rebuilt from the captured
//! call by running the stages in order:
//!
//! 1. [`JsonHeaders`]
//! 2. caller stages registered through [`AuthenticatedClient::with_stage`], in insertion order
//! 3. [`BearerAuth`]
//!
//! Running the bearer stage last means a caller stage can never overwrite `Authorization`, and a
//! retried attempt always carries the credential the refresh produced.
//!
//! [`AuthenticatedClient::with_stage`]: crate::client::AuthenticatedClient::with_stage

// self
use crate::{
	_prelude::*,
	auth::Credential,
	casing::CaseConvention,
	error::{ConfigError, PayloadError},
	http::{ApiRequest, ApiResponse, Method},
};

/// Whether a request carries the bearer credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum AuthMode {
	/// Attach the stored access token and recover from HTTP 401 through a refresh.
	Bearer,
	/// Never attach a token; HTTP 401 is an ordinary failure.
	Anonymous,
}

/// A captured outbound call, replayable for the single retry after a refresh.
#[derive(Clone, Debug)]
pub(crate) struct PendingRequest {
	pub(crate) method: Method,
	pub(crate) url: Url,
	/// Wire-encoded JSON body.
	pub(crate) body: Option<Vec<u8>>,
	pub(crate) auth: AuthMode,
}
impl PendingRequest {
	pub(crate) fn new(method: Method, url: Url, auth: AuthMode) -> Self {
		Self { method, url, body: None, auth }
	}

	/// Serializes a body that is already in the wire casing.
	pub(crate) fn with_wire_body(mut self, body: &Value) -> Result<Self> {
		self.body = Some(serde_json::to_vec(body).map_err(PayloadError::Encode)?);

		Ok(self)
	}
}

/// Outbound request-handling stage.
pub trait RequestStage
where
	Self: Send + Sync,
{
	/// Stable name used in logs.
	fn name(&self) -> &'static str;

	/// Mutates `request`. `credential` is `None` for anonymous requests or when nothing is stored.
	fn apply(&self, request: &mut ApiRequest, credential: Option<&Credential>) -> Result<()>;
}

/// Sets `Accept`, and `Content-Type` when a body is present.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonHeaders;
impl RequestStage for JsonHeaders {
	fn name(&self) -> &'static str {
		"json_headers"
	}

	fn apply(&self, request: &mut ApiRequest, _: Option<&Credential>) -> Result<()> {
		request.set_header("accept", "application/json");

		if request.body.is_some() {
			request.set_header("content-type", "application/json");
		}

		Ok(())
	}
}

/// Attaches `Authorization: Bearer <access_token>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerAuth;
impl RequestStage for BearerAuth {
	fn name(&self) -> &'static str {
		"bearer_auth"
	}

	fn apply(&self, request: &mut ApiRequest, credential: Option<&Credential>) -> Result<()> {
		match credential {
			Some(credential) => request.set_header("authorization", credential.bearer()),
			None => {
				request.headers.remove("authorization");
			},
		}

		Ok(())
	}
}

/// Ordered stage list shared by clones of a client.
#[derive(Clone)]
pub(crate) struct Pipeline {
	custom: Vec<Arc<dyn RequestStage>>,
}
impl Pipeline {
	pub(crate) fn new() -> Self {
		Self { custom: Vec::new() }
	}

	pub(crate) fn push(&mut self, stage: Arc<dyn RequestStage>) {
		self.custom.push(stage);
	}

	pub(crate) fn stage_names(&self) -> Vec<&'static str> {
		let mut names = vec![JsonHeaders.name()];

		names.extend(self.custom.iter().map(|stage| stage.name()));
		names.push(BearerAuth.name());

		names
	}

	/// Builds the transport request for one attempt.
	pub(crate) fn build(
		&self,
		pending: &PendingRequest,
		credential: Option<&Credential>,
		timeout: Option<std::time::Duration>,
	) -> Result<ApiRequest> {
		let credential = match pending.auth {
			AuthMode::Bearer => credential,
			AuthMode::Anonymous => None,
		};
		let mut request = ApiRequest::new(pending.method, pending.url.clone());

		request.body = pending.body.clone();
		request.timeout = timeout;

		JsonHeaders.apply(&mut request, credential)?;

		for stage in &self.custom {
			stage.apply(&mut request, credential)?;
		}

		BearerAuth.apply(&mut request, credential)?;

		if let Some((name, _)) =
			request.headers.iter().find(|(_, value)| value.contains(['\r', '\n']))
		{
			return Err(ConfigError::InvalidHeader { name: name.clone() }.into());
		}

		Ok(request)
	}
}
impl Debug for Pipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_list().entries(self.stage_names()).finish()
	}
}

/// Parses a response body as JSON; an empty body decodes to `null`.
pub(crate) fn decode_json(response: &ApiResponse) -> Result<Value> {
	if response.body.iter().all(u8::is_ascii_whitespace) {
		return Ok(Value::Null);
	}

	let mut de = serde_json::Deserializer::from_slice(&response.body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|source| PayloadError::Decode { source, status: Some(response.status()) }.into())
}

/// Decodes a typed value out of an already-normalized JSON value.
pub(crate) fn decode_value<T>(value: Value, status: Option<u16>) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value)
		.map_err(|source| PayloadError::Decode { source, status }.into())
}

/// Maps a non-success response into [`Error::RequestFailed`]; the body is kept as JSON when it
/// parses and as a JSON string otherwise.
pub(crate) fn request_failed(response: ApiResponse, casing: &CaseConvention) -> Error {
	let body = match decode_json(&response) {
		Ok(value) => casing.incoming(value),
		Err(_) => Value::String(String::from_utf8_lossy(&response.body).into_owned()),
	};

	Error::RequestFailed {
		status: response.metadata.status,
		body,
		retry_after: response.metadata.retry_after,
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::casing::KeyCase;

	struct TraceId(&'static str);
	impl RequestStage for TraceId {
		fn name(&self) -> &'static str {
			"trace_id"
		}

		fn apply(&self, request: &mut ApiRequest, _: Option<&Credential>) -> Result<()> {
			request.set_header("x-trace-id", self.0);
			request.set_header("authorization", "Bearer forged");

			Ok(())
		}
	}

	fn pending(auth: AuthMode) -> PendingRequest {
		let url = Url::parse("http://localhost:8000/auth/profile").expect("URL should parse.");

		PendingRequest::new(Method::Get, url, auth)
	}

	#[test]
	fn bearer_stage_runs_last_and_wins() {
		let mut pipeline = Pipeline::new();

		pipeline.push(Arc::new(TraceId("t-1")));

		let credential = Credential::new("A1", "R1");
		let request = pipeline
			.build(&pending(AuthMode::Bearer), Some(&credential), None)
			.expect("Pipeline should build the request.");

		assert_eq!(request.header("authorization"), Some("Bearer A1"));
		assert_eq!(request.header("x-trace-id"), Some("t-1"));
		assert_eq!(request.header("accept"), Some("application/json"));
		assert_eq!(request.header("content-type"), None);
		assert_eq!(pipeline.stage_names(), ["json_headers", "trace_id", "bearer_auth"]);
	}

	#[test]
	fn anonymous_requests_never_carry_a_token() {
		let credential = Credential::new("A1", "R1");
		let pending = pending(AuthMode::Anonymous)
			.with_wire_body(&json!({ "username": "ada" }))
			.expect("Body should encode.");
		let request = Pipeline::new()
			.build(&pending, Some(&credential), None)
			.expect("Pipeline should build the request.");

		assert_eq!(request.header("authorization"), None);
		assert_eq!(request.header("content-type"), Some("application/json"));
	}

	struct Note(&'static str);
	impl RequestStage for Note {
		fn name(&self) -> &'static str {
			"note"
		}

		fn apply(&self, request: &mut ApiRequest, _: Option<&Credential>) -> Result<()> {
			request.set_header("x-note", self.0);

			Ok(())
		}
	}

	#[test]
	fn header_injection_is_rejected() {
		let mut pipeline = Pipeline::new();

		pipeline.push(Arc::new(Note("a\r\nb: c")));

		let err = pipeline
			.build(&pending(AuthMode::Anonymous), None, None)
			.expect_err("CR/LF in header values must be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidHeader { .. })));
	}

	#[test]
	fn failure_bodies_fall_back_to_text() {
		let casing = CaseConvention::new(KeyCase::Snake, KeyCase::Camel);
		let json = request_failed(ApiResponse::new(400, r#"{"error_detail":"nope"}"#), &casing);
		let text = request_failed(ApiResponse::new(502, "Bad Gateway"), &casing);

		match json {
			Error::RequestFailed { status, body, .. } => {
				assert_eq!(status, 400);
				assert_eq!(body, json!({ "errorDetail": "nope" }));
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
		match text {
			Error::RequestFailed { body, .. } => assert_eq!(body, json!("Bad Gateway")),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn empty_bodies_decode_to_null() {
		assert_eq!(
			decode_json(&ApiResponse::new(204, Vec::new())).expect("Empty body should decode."),
			Value::Null
		);
	}
}
