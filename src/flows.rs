//! Account flows built on top of [`AuthenticatedClient`](crate::client::AuthenticatedClient).
//!
//! - [`session`] owns the credential lifecycle: login, logout, and the authenticated check.
//! - [`account`] wraps the remaining account endpoints (registration, profile, and password
//!   management), validating inputs locally before any network I/O.

pub mod account;
pub mod session;

pub use account::*;
