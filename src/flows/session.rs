//! Credential lifecycle: exchanging a username/password pair for tokens and dropping them again.

// crates.io
use serde_json::json;
// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret},
	casing::KeyCase,
	client::{AuthMode, AuthenticatedClient, pipeline},
	error::PayloadError,
	http::{ApiHttpClient, Method},
	obs::{self, CallKind, CallOutcome, CallSpan},
};

/// Login response; unlike a refresh response it must carry both tokens.
#[derive(Deserialize)]
struct LoginGrant {
	#[serde(alias = "access")]
	access_token: TokenSecret,
	#[serde(alias = "refresh")]
	refresh_token: TokenSecret,
}

impl<C> AuthenticatedClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Exchanges `username` + `password` for a token pair and stores it.
	///
	/// Any previously stored credential is cleared first, so a failed login always leaves the
	/// client logged out.
	pub async fn login(&self, username: &str, password: &str) -> Result<Credential> {
		const KIND: CallKind = CallKind::Login;

		let span = CallSpan::new(KIND, "login");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.store.clear().await?;

				let body =
					self.config.casing.outgoing(json!({ "username": username, "password": password }));
				let pending = self.pending(
					Method::Post,
					&self.config.endpoints.login,
					Some(&body),
					AuthMode::Anonymous,
				)?;
				let value = self.execute(pending).await?;
				let grant = pipeline::decode_value::<LoginGrant>(KeyCase::Snake.apply(value), None)?;

				if grant.access_token.is_empty() {
					return Err(PayloadError::EmptyToken { field: "access_token" }.into());
				}
				if grant.refresh_token.is_empty() {
					return Err(PayloadError::EmptyToken { field: "refresh_token" }.into());
				}

				let credential = Credential {
					access_token: grant.access_token,
					refresh_token: grant.refresh_token,
				};

				self.store.save(credential.clone()).await?;

				obs::debug_event!("stored the credential issued at login");

				Ok(credential)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Forgets the stored credential without contacting the backend.
	///
	/// Returns `true` when a credential was present.
	pub async fn logout(&self) -> Result<bool> {
		const KIND: CallKind = CallKind::Logout;

		let span = CallSpan::new(KIND, "logout");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(async move { Ok(self.store.clear().await?.is_some()) }).await;

		obs::record_result(KIND, &result);

		result
	}

	/// Whether a credential is currently stored. The access token may still be expired.
	pub async fn is_authenticated(&self) -> Result<bool> {
		Ok(self.store.load().await?.is_some())
	}
}
