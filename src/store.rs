//! Storage contracts for cached tokens and per-user sessions, plus built-in backends.

pub mod file;
pub mod memory;

pub use file::FileCacheStore;
pub use memory::{MemoryCacheStore, MemoryUserTokenStore};

// self
use crate::{
	_prelude::*,
	auth::{Principal, RefreshableToken},
};

/// Boxed future returned by every storage contract.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Generic key-value byte store backing the cache-aside token caches.
///
/// Entries carry no TTL at this layer; the caches embed absolute expiry instants in the values
/// and decide freshness themselves.
pub trait TokenCacheStore
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Vec<u8>>>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set<'a>(&'a self, key: &'a str, value: Vec<u8>) -> StoreFuture<'a, ()>;

	/// Removes the value stored under `key`; missing keys are not an error.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Per-principal store holding the current access/refresh token pair.
pub trait UserTokenStore
where
	Self: Send + Sync,
{
	/// Fetches the token pair for `principal`, if a session exists.
	fn get_token<'a>(
		&'a self,
		principal: &'a Principal,
	) -> StoreFuture<'a, Option<RefreshableToken>>;

	/// Persists or replaces the token pair for `principal`.
	fn store_token<'a>(
		&'a self,
		principal: &'a Principal,
		token: RefreshableToken,
	) -> StoreFuture<'a, ()>;

	/// Drops the session for `principal` (logout, revocation, external termination).
	fn clear_token<'a>(&'a self, principal: &'a Principal) -> StoreFuture<'a, ()>;
}

/// Error type produced by storage implementations.
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
