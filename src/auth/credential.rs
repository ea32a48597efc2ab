//! Access/refresh token pair persisted between sessions.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Token pair issued at login and rotated by refresh.
///
/// No expiry metadata is tracked; an expired access token is discovered only when the backend
/// rejects a request with HTTP 401.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Short-lived token attached to every authenticated request.
	pub access_token: TokenSecret,
	/// Longer-lived token used solely to mint new access tokens.
	pub refresh_token: TokenSecret,
}
impl Credential {
	/// Creates a credential from raw token strings.
	pub fn new(access_token: impl Into<TokenSecret>, refresh_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
	}

	/// Returns the credential produced by a refresh: the new access token, plus the rotated
	/// refresh token when the backend issued one.
	pub fn rotate(&self, access_token: TokenSecret, refresh_token: Option<TokenSecret>) -> Self {
		Self {
			access_token,
			refresh_token: refresh_token.unwrap_or_else(|| self.refresh_token.clone()),
		}
	}

	/// `Authorization` header value for this credential.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}

/// Token payload returned by the login and refresh endpoints, read after the body has been
/// normalized to snake case. Also accepts the short `access`/`refresh` field names.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenGrant {
	/// Newly issued access token.
	#[serde(alias = "access")]
	pub access_token: TokenSecret,
	/// Rotated refresh token; login responses must carry one, refresh responses may.
	#[serde(default, alias = "refresh")]
	pub refresh_token: Option<TokenSecret>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rotate_keeps_refresh_token_unless_replaced() {
		let credential = Credential::new("A1", "R1");
		let kept = credential.rotate("A2".into(), None);

		assert_eq!(kept, Credential::new("A2", "R1"));

		let rotated = credential.rotate("A3".into(), Some("R2".into()));

		assert_eq!(rotated, Credential::new("A3", "R2"));
	}

	#[test]
	fn debug_output_redacts_both_tokens() {
		let rendered = format!("{:?}", Credential::new("access-secret", "refresh-secret"));

		assert!(!rendered.contains("access-secret"));
		assert!(!rendered.contains("refresh-secret"));
		assert_eq!(Credential::new("A1", "R1").bearer(), "Bearer A1");
	}

	#[test]
	fn token_grant_accepts_short_field_names() {
		let grant: TokenGrant = serde_json::from_str(r#"{"access":"A2"}"#)
			.expect("Short refresh response should decode.");

		assert_eq!(grant.access_token.expose(), "A2");
		assert!(grant.refresh_token.is_none());

		let grant: TokenGrant =
			serde_json::from_str(r#"{"access_token":"A3","refresh_token":"R3"}"#)
				.expect("Long login response should decode.");

		assert_eq!(grant.refresh_token.map(|secret| secret.expose().to_owned()), Some("R3".into()));
	}
}
