//! Logs in against a mock backend, persists the token pair in a file-backed store, and fetches the
//! profile through an expired access token to show the transparent refresh.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use bearer_client::{
	client::AuthenticatedClient,
	config::ClientConfig,
	store::{CredentialStore, FileStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(200).json_body(json!({ "access": "demo-access-1", "refresh": "demo-refresh" }));
		})
		.await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/auth/profile").header("authorization", "Bearer demo-access-1");
			then.status(401).json_body(json!({ "detail": "Given token not valid for any token type" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token/refresh");
			then.status(200).json_body(json!({ "access": "demo-access-2" }));
		})
		.await;
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path("/auth/profile").header("authorization", "Bearer demo-access-2");
			then.status(200).json_body(json!({ "username": "ada", "email": "ada@example.com" }));
		})
		.await;
	let path = std::env::temp_dir().join(format!("bearer-client-demo-{}.json", std::process::id()));
	let store: Arc<dyn CredentialStore> = Arc::new(FileStore::open(&path)?);
	let config = ClientConfig::from_env()?.with_base_url(&server.base_url())?;
	let client = AuthenticatedClient::new(config, store);

	client.login("ada", "hunter2").await?;

	let body: Value = client.profile().await?;

	println!("profile: {body}");
	println!("credential persisted at {}", path.display());
	println!(
		"refresh attempts: {}, coalesced: {}",
		client.refresh_metrics.attempts(),
		client.refresh_metrics.coalesced()
	);

	login.assert_async().await;
	expired.assert_async().await;
	refresh.assert_async().await;
	profile.assert_async().await;

	client.logout().await?;

	Ok(())
}
