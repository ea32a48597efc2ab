//! Client configuration: base endpoint, endpoint paths, timeout, and payload casing.

// self
use crate::{
	_prelude::*,
	casing::{CaseConvention, KeyCase},
	error::ConfigError,
};

/// Environment variable that overrides [`ClientConfig::DEFAULT_BASE_URL`].
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";

/// Backend paths used by the client and the built-in flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
	/// Credential exchange (`username` + `password` → token pair).
	pub login: String,
	/// Access-token refresh.
	pub refresh: String,
	/// Account registration.
	pub register: String,
	/// Current user's profile.
	pub profile: String,
	/// Profile update.
	pub profile_update: String,
	/// Password change for the authenticated user.
	pub change_password: String,
	/// Password-reset email request.
	pub reset_password_email: String,
	/// Password reset confirmation.
	pub reset_password: String,
}
impl Default for Endpoints {
	fn default() -> Self {
		Self {
			login: "/auth/login".into(),
			refresh: "/auth/token/refresh".into(),
			register: "/auth/register".into(),
			profile: "/auth/profile".into(),
			profile_update: "/auth/profile/update".into(),
			change_password: "/auth/change-password".into(),
			reset_password_email: "/auth/reset-password-email".into(),
			reset_password: "/auth/reset-password".into(),
		}
	}
}

/// Settings shared by every request a client issues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL every endpoint path is appended to.
	pub base_url: Url,
	/// Endpoint paths relative to [`base_url`](Self::base_url).
	pub endpoints: Endpoints,
	/// Timeout applied to each transport attempt, including refresh calls.
	pub timeout: Duration,
	/// Key casing applied to JSON bodies.
	pub casing: CaseConvention,
	/// Body field carrying the refresh token on refresh calls.
	pub refresh_field: String,
}
impl ClientConfig {
	/// Endpoint used when `API_BASE_URL` is not set.
	pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
	/// Per-attempt timeout used unless overridden.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(30);
	/// Refresh-token body field used unless overridden.
	pub const DEFAULT_REFRESH_FIELD: &str = "refresh_token";

	/// Creates a config for `base_url` with default endpoints, timeout, and snake-case payloads.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			endpoints: Endpoints::default(),
			timeout: Self::DEFAULT_TIMEOUT,
			casing: CaseConvention::new(KeyCase::Snake, KeyCase::Snake),
			refresh_field: Self::DEFAULT_REFRESH_FIELD.into(),
		}
	}

	/// Builds a config from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Builds a config from an arbitrary variable lookup; blank values count as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let raw = lookup(API_BASE_URL_ENV)
			.map(|value| value.trim().to_owned())
			.filter(|value| !value.is_empty())
			.unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_owned());

		Ok(Self::new(parse_base_url(&raw)?))
	}

	/// Parses and installs a new base URL.
	pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
		self.base_url = parse_base_url(raw)?;

		Ok(self)
	}

	/// Replaces the endpoint paths.
	pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the per-attempt timeout; non-positive values disable it.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the payload casing.
	pub fn with_casing(mut self, casing: CaseConvention) -> Self {
		self.casing = casing;

		self
	}

	/// Overrides the body field the refresh token is sent in (`refresh` for simplejwt backends).
	pub fn with_refresh_field(mut self, field: impl Into<String>) -> Self {
		self.refresh_field = field.into();

		self
	}

	/// Joins `path` onto the base URL, keeping any path prefix the base URL carries.
	pub fn endpoint_url(&self, path: &str) -> Result<Url, ConfigError> {
		let joined = format!(
			"{}/{}",
			self.base_url.as_str().trim_end_matches('/'),
			path.trim_start_matches('/')
		);

		Url::parse(&joined).map_err(|source| ConfigError::InvalidEndpoint { path: path.into(), source })
	}

	/// Timeout in the form transports consume, or `None` when disabled.
	pub fn transport_timeout(&self) -> Option<std::time::Duration> {
		if self.timeout.is_positive() { self.timeout.try_into().ok() } else { None }
	}
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(raw)
		.map_err(|source| ConfigError::InvalidBaseUrl { value: raw.into(), source })?;

	match url.scheme() {
		"http" | "https" => Ok(url),
		other => Err(ConfigError::UnsupportedScheme { scheme: other.into() }),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn api_base_url_overrides_default() {
		let config = ClientConfig::from_lookup(|key| {
			(key == API_BASE_URL_ENV).then(|| "https://api.example.com/v1/".to_owned())
		})
		.expect("Config should accept a valid override.");

		assert_eq!(config.base_url.as_str(), "https://api.example.com/v1/");
		assert_eq!(
			config.endpoint_url("/auth/login").expect("Endpoint should join.").as_str(),
			"https://api.example.com/v1/auth/login"
		);
	}

	#[test]
	fn missing_or_blank_override_falls_back_to_default() {
		let unset = ClientConfig::from_lookup(|_| None).expect("Default config should build.");
		let blank =
			ClientConfig::from_lookup(|_| Some("   ".into())).expect("Blank override is ignored.");

		assert_eq!(unset.base_url.as_str(), "http://localhost:8000/");
		assert_eq!(unset, blank);
		assert_eq!(unset.timeout, Duration::seconds(30));
		assert_eq!(unset.endpoints.refresh, "/auth/token/refresh");
		assert_eq!(unset.refresh_field, "refresh_token");
		assert_eq!(unset.with_refresh_field("refresh").refresh_field, "refresh");
	}

	#[test]
	fn invalid_base_urls_are_rejected() {
		let err = ClientConfig::from_lookup(|_| Some("not a url".into()))
			.expect_err("Garbage base URL should be rejected.");

		assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

		let err = ClientConfig::from_lookup(|_| Some("ftp://files.example.com".into()))
			.expect_err("Non-HTTP schemes should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));
	}

	#[test]
	fn transport_timeout_disables_on_non_positive_values() {
		let config = ClientConfig::new(
			Url::parse(ClientConfig::DEFAULT_BASE_URL).expect("Default URL should parse."),
		);

		assert_eq!(config.transport_timeout(), Some(std::time::Duration::from_secs(30)));
		assert_eq!(config.with_timeout(Duration::ZERO).transport_timeout(), None);
	}
}
