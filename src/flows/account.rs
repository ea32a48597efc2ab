//! Registration, profile, and password endpoints.

// crates.io
use serde_json::json;
// self
use crate::{
	_prelude::*,
	client::{self, AuthMode, AuthenticatedClient, pipeline},
	http::{ApiHttpClient, Method},
	obs::{self, CallKind, CallOutcome, CallSpan},
};

/// Password change for the authenticated user.
#[derive(Clone, Serialize)]
pub struct ChangePassword {
	/// Current password.
	pub old_password: String,
	/// Replacement password.
	pub new_password: String,
	/// Confirmation of [`new_password`](Self::new_password).
	pub new_password2: String,
}
impl ChangePassword {
	/// Creates a change request whose confirmation matches the new password.
	pub fn new(old_password: impl Into<String>, new_password: impl Into<String>) -> Self {
		let new_password = new_password.into();

		Self { old_password: old_password.into(), new_password2: new_password.clone(), new_password }
	}
}
impl Debug for ChangePassword {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ChangePassword(**redacted**)")
	}
}

/// Password reset confirmation, carrying the values from the reset email link.
#[derive(Clone, Serialize)]
pub struct ResetPassword {
	/// Reset token from the email link.
	pub token: String,
	/// Base64 user identifier from the email link.
	pub uidb64: String,
	/// New password.
	pub password: String,
	/// Confirmation of [`password`](Self::password).
	pub password2: String,
}
impl ResetPassword {
	fn validate(&self) -> Result<()> {
		let missing = [
			("token", &self.token),
			("uidb64", &self.uidb64),
			("password", &self.password),
			("password2", &self.password2),
		]
		.into_iter()
		.filter(|(_, value)| value.trim().is_empty())
		.map(|(name, _)| name)
		.collect::<Vec<_>>();

		if !missing.is_empty() {
			return Err(Error::InvalidInput {
				reason: format!("missing required fields: {}", missing.join(", ")),
			});
		}
		if self.password != self.password2 {
			return Err(Error::InvalidInput { reason: "passwords do not match".into() });
		}

		Ok(())
	}
}
impl Debug for ResetPassword {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResetPassword").field("uidb64", &self.uidb64).finish_non_exhaustive()
	}
}

impl<C> AuthenticatedClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates an account. `payload` is in the local casing and is sent without a credential.
	pub async fn register<B, T>(&self, payload: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		let body = self.config.casing.outgoing(client::to_value(payload)?);
		let value = self
			.submit("register", &self.config.endpoints.register, body, AuthMode::Anonymous)
			.await?;

		pipeline::decode_value(value, None)
	}

	/// Fetches the authenticated user's profile.
	pub async fn profile<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.get(&self.config.endpoints.profile).await
	}

	/// Applies a partial profile update (`PATCH`) and returns the updated profile.
	pub async fn update_profile<B, T>(&self, payload: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.patch(&self.config.endpoints.profile_update, payload).await
	}

	/// Changes the authenticated user's password.
	pub async fn change_password(&self, change: &ChangePassword) -> Result<Value> {
		let body = self.config.casing.outgoing(client::to_value(change)?);

		self.submit("change_password", &self.config.endpoints.change_password, body, AuthMode::Bearer)
			.await
	}

	/// Asks the backend to email a password-reset link to `email`.
	pub async fn reset_password_email(&self, email: &str) -> Result<Value> {
		let email = email.trim();

		if email.is_empty() {
			return Err(Error::InvalidInput { reason: "email is required".into() });
		}

		let body = self.config.casing.outgoing(json!({ "email": email }));

		self.submit(
			"reset_password_email",
			&self.config.endpoints.reset_password_email,
			body,
			AuthMode::Anonymous,
		)
		.await
	}

	/// Confirms a password reset. Missing fields and mismatching passwords are rejected before
	/// any request is sent.
	pub async fn reset_password(&self, reset: &ResetPassword) -> Result<Value> {
		reset.validate()?;

		let body = self.config.casing.outgoing(client::to_value(reset)?);

		self.submit("reset_password", &self.config.endpoints.reset_password, body, AuthMode::Anonymous)
			.await
	}

	/// `POST`s a wire-cased body and returns the response in the local casing.
	async fn submit(
		&self,
		stage: &'static str,
		path: &str,
		wire_body: Value,
		auth: AuthMode,
	) -> Result<Value> {
		const KIND: CallKind = CallKind::Request;

		let span = CallSpan::new(KIND, stage);

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let pending = self.pending(Method::Post, path, Some(&wire_body), auth)?;

				self.execute(pending).await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}
