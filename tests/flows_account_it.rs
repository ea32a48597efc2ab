#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use bearer_client::{
	_preludet::*,
	auth::Credential,
	casing::{CaseConvention, KeyCase},
	error::PayloadError,
	flows::{ChangePassword, ResetPassword},
};

#[derive(Debug, Serialize)]
struct Registration<'a> {
	username: &'a str,
	email: &'a str,
	password: &'a str,
	password2: &'a str,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Profile {
	username: String,
	email: String,
}

#[tokio::test]
async fn login_stores_both_tokens_and_logout_forgets_them() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/login")
				.header_missing("authorization")
				.json_body(json!({ "username": "ada", "password": "hunter2" }));
			then.status(200).json_body(json!({ "access": "A1", "refresh": "R1" }));
		})
		.await;
	let credential = client.login("ada", "hunter2").await.expect("Login should succeed.");

	login.assert_async().await;

	assert_eq!(credential, Credential::new("A1", "R1"));
	assert_eq!(store.snapshot(), Some(credential));
	assert!(client.is_authenticated().await.expect("Store should be readable."));
	assert!(client.logout().await.expect("Logout should succeed."));
	assert!(!client.logout().await.expect("Second logout should succeed."));
	assert!(!client.is_authenticated().await.expect("Store should be readable."));
}

#[tokio::test]
async fn failed_login_leaves_the_client_logged_out() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_credential(&store, "A0", "R0").await;

	let _login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(401).json_body(json!({ "detail": "No active account found" }));
		})
		.await;
	let err = client.login("ada", "wrong").await.expect_err("Rejected login should fail.");

	assert_eq!(err.status(), Some(401));
	assert_eq!(store.snapshot(), None);
	assert_eq!(client.refresh_metrics.attempts(), 0);
}

#[tokio::test]
async fn login_without_refresh_token_is_rejected() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));
	let _login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(200).json_body(json!({ "access_token": "A1" }));
		})
		.await;
	let err = client.login("ada", "hunter2").await.expect_err("Incomplete grant should fail.");

	match err {
		Error::Payload(PayloadError::Decode { source, .. }) => {
			assert!(source.to_string().contains("refresh_token"), "{source}");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert_eq!(store.snapshot(), None);
}

#[tokio::test]
async fn login_with_an_empty_token_is_a_payload_error() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));
	let _login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(200).json_body(json!({ "access": "", "refresh": "R1" }));
		})
		.await;
	let err = client.login("ada", "hunter2").await.expect_err("Empty access token should fail.");

	assert!(
		matches!(err, Error::Payload(PayloadError::EmptyToken { field: "access_token" })),
		"{err:?}"
	);
	assert!(!err.is_auth_expired());
	assert_eq!(store.snapshot(), None);
}

#[tokio::test]
async fn register_is_anonymous_and_profile_is_authenticated() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_credential(&store, "A1", "R1").await;

	let register = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/register")
				.header_missing("authorization")
				.json_body(json!({
					"username": "ada",
					"email": "ada@example.com",
					"password": "hunter2",
					"password2": "hunter2"
				}));
			then.status(201).json_body(json!({ "username": "ada", "email": "ada@example.com" }));
		})
		.await;
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path("/auth/profile").header("authorization", "Bearer A1");
			then.status(200).json_body(json!({ "username": "ada", "email": "ada@example.com" }));
		})
		.await;
	let update = server
		.mock_async(|when, then| {
			when.method(PATCH)
				.path("/auth/profile/update")
				.header("authorization", "Bearer A1")
				.json_body(json!({ "email": "ada@lovelace.dev" }));
			then.status(200).json_body(json!({ "username": "ada", "email": "ada@lovelace.dev" }));
		})
		.await;
	let created: Profile = client
		.register(&Registration {
			username: "ada",
			email: "ada@example.com",
			password: "hunter2",
			password2: "hunter2",
		})
		.await
		.expect("Registration should succeed.");
	let fetched: Profile = client.profile().await.expect("Profile should load.");
	let updated: Profile = client
		.update_profile(&json!({ "email": "ada@lovelace.dev" }))
		.await
		.expect("Profile update should succeed.");

	register.assert_async().await;
	profile.assert_async().await;
	update.assert_async().await;

	assert_eq!(created, fetched);
	assert_eq!(updated.email, "ada@lovelace.dev");
}

#[tokio::test]
async fn change_password_carries_the_bearer_token() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_credential(&store, "A1", "R1").await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/change-password").header("authorization", "Bearer A1").json_body(
				json!({ "old_password": "old", "new_password": "new", "new_password2": "new" }),
			);
			then.status(200).json_body(json!({ "detail": "Password updated." }));
		})
		.await;
	let body = client
		.change_password(&ChangePassword::new("old", "new"))
		.await
		.expect("Password change should succeed.");

	mock.assert_async().await;

	assert_eq!(body, json!({ "detail": "Password updated." }));
}

#[tokio::test]
async fn password_reset_validates_before_sending() {
	let server = MockServer::start_async().await;
	let (client, _store) = build_reqwest_test_client(test_config(&server.base_url()));
	let email = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/reset-password-email")
				.json_body(json!({ "email": "ada@example.com" }));
			then.status(200).json_body(json!({ "detail": "Email sent." }));
		})
		.await;
	let reset = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/reset-password").header_missing("authorization");
			then.status(200).json_body(json!({ "detail": "Password reset." }));
		})
		.await;

	assert!(matches!(
		client.reset_password_email("   ").await,
		Err(Error::InvalidInput { .. })
	));
	assert!(matches!(
		client
			.reset_password(&ResetPassword {
				token: "t".into(),
				uidb64: "MQ".into(),
				password: "hunter2".into(),
				password2: "hunter3".into(),
			})
			.await,
		Err(Error::InvalidInput { .. })
	));

	email.assert_hits_async(0).await;
	reset.assert_hits_async(0).await;

	client
		.reset_password_email(" ada@example.com ")
		.await
		.expect("Reset email request should succeed.");
	client
		.reset_password(&ResetPassword {
			token: "t".into(),
			uidb64: "MQ".into(),
			password: "hunter2".into(),
			password2: "hunter2".into(),
		})
		.await
		.expect("Password reset should succeed.");

	email.assert_async().await;
	reset.assert_async().await;
}

#[tokio::test]
async fn typed_payloads_follow_the_wire_casing() {
	let server = MockServer::start_async().await;
	let config = test_config(&server.base_url())
		.with_casing(CaseConvention::new(KeyCase::Camel, KeyCase::Snake));
	let (client, store) = build_reqwest_test_client(config);

	seed_credential(&store, "A1", "R1").await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/change-password").json_body(
				json!({ "oldPassword": "old", "newPassword": "new", "newPassword2": "new" }),
			);
			then.status(200).json_body(json!({ "passwordChanged": true }));
		})
		.await;
	let body = client
		.change_password(&ChangePassword::new("old", "new"))
		.await
		.expect("Password change should succeed.");

	mock.assert_async().await;

	assert_eq!(body, json!({ "password_changed": true }));
}
