//! Storage contract and built-in implementations for the persisted [`Credential`].

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable key-value slot holding the single credential a client works with.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the stored credential, if any.
	fn load(&self) -> StoreFuture<'_, Option<Credential>>;

	/// Persists or replaces the stored credential.
	fn save(&self, credential: Credential) -> StoreFuture<'_, ()>;

	/// Removes the stored credential, returning what was removed.
	fn clear(&self) -> StoreFuture<'_, Option<Credential>>;

	/// Replaces (or clears, when `replacement` is `None`) the credential only if its refresh
	/// token still equals `expected_refresh`.
	fn compare_and_swap<'a>(
		&'a self,
		expected_refresh: &'a str,
		replacement: Option<Credential>,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;
}

/// Result of a refresh-token compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The refresh token matched and the slot was updated.
	Updated,
	/// A different credential was stored in the meantime; nothing changed.
	RefreshMismatch,
	/// The slot was empty; nothing changed.
	Missing,
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Applies a compare-and-swap to an in-memory slot. Shared by the built-in stores.
pub(crate) fn swap_slot(
	slot: &mut Option<Credential>,
	expected_refresh: &str,
	replacement: Option<Credential>,
) -> CompareAndSwapOutcome {
	let outcome = match slot.as_ref() {
		Some(current) if refresh_matches(&current.refresh_token, expected_refresh) =>
			CompareAndSwapOutcome::Updated,
		Some(_) => CompareAndSwapOutcome::RefreshMismatch,
		None => CompareAndSwapOutcome::Missing,
	};

	if matches!(outcome, CompareAndSwapOutcome::Updated) {
		*slot = replacement;
	}

	outcome
}

fn refresh_matches(current: &TokenSecret, expected: &str) -> bool {
	current.expose() == expected
}
