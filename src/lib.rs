//! Bearer-authenticated REST client with single-flight access-token refresh, pluggable
//! credential stores, and casing-normalized JSON payloads.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod casing;
pub mod client;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests and demos.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::Credential,
		client::AuthenticatedClient,
		config::ClientConfig,
		http::ReqwestHttpClient,
		store::{CredentialStore, MemoryStore},
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = AuthenticatedClient<ReqwestHttpClient>;

	/// Builds a config pointing at the provided mock server base URL.
	pub fn test_config(base_url: &str) -> ClientConfig {
		ClientConfig::new(
			Url::parse(base_url).expect("Mock server base URL should parse successfully."),
		)
	}

	/// Constructs an [`AuthenticatedClient`] backed by an in-memory store and the default
	/// reqwest transport.
	pub fn build_reqwest_test_client(config: ClientConfig) -> (ReqwestTestClient, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let client =
			AuthenticatedClient::with_http_client(config, store, ReqwestHttpClient::default());

		(client, store_backend)
	}

	/// Seeds the store with a credential built from plain strings.
	pub async fn seed_credential(store: &MemoryStore, access: &str, refresh: &str) {
		store
			.save(Credential::new(access, refresh))
			.await
			.expect("Failed to seed credential into the store.");
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use serde_json;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
