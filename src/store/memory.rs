//! Thread-safe in-memory stores for local development, tests, and single-process deployments.

// self
use crate::{
	_prelude::*,
	auth::{Principal, RefreshableToken, SubjectId},
	store::{StoreFuture, TokenCacheStore, UserTokenStore},
};

type CacheMap = Arc<RwLock<HashMap<String, Vec<u8>>>>;
type SessionMap = Arc<RwLock<HashMap<SubjectId, RefreshableToken>>>;

/// Byte cache kept in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryCacheStore(CacheMap);
impl MemoryCacheStore {
	/// Number of stored entries.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Synchronous read used by tests and diagnostics.
	pub fn get_now(&self, key: &str) -> Option<Vec<u8>> {
		self.0.read().get(key).cloned()
	}

	/// Synchronous write used to seed or corrupt entries in tests.
	pub fn set_now(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
		self.0.write().insert(key.into(), value.into());
	}
}
impl TokenCacheStore for MemoryCacheStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Vec<u8>>> {
		Box::pin(async move { Ok(self.get_now(key)) })
	}

	fn set<'a>(&'a self, key: &'a str, value: Vec<u8>) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.set_now(key, value);

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().remove(key);

			Ok(())
		})
	}
}

/// User session store kept in-process, keyed by principal subject.
#[derive(Clone, Debug, Default)]
pub struct MemoryUserTokenStore(SessionMap);
impl MemoryUserTokenStore {
	/// Seeds a session synchronously (login callbacks, tests).
	pub fn insert(&self, principal: &Principal, token: RefreshableToken) {
		self.0.write().insert(principal.subject.clone(), token);
	}

	/// Synchronous read used by tests and diagnostics.
	pub fn get_now(&self, principal: &Principal) -> Option<RefreshableToken> {
		self.0.read().get(&principal.subject).cloned()
	}
}
impl UserTokenStore for MemoryUserTokenStore {
	fn get_token<'a>(
		&'a self,
		principal: &'a Principal,
	) -> StoreFuture<'a, Option<RefreshableToken>> {
		Box::pin(async move { Ok(self.get_now(principal)) })
	}

	fn store_token<'a>(
		&'a self,
		principal: &'a Principal,
		token: RefreshableToken,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.insert(principal, token);

			Ok(())
		})
	}

	fn clear_token<'a>(&'a self, principal: &'a Principal) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().remove(&principal.subject);

			Ok(())
		})
	}
}
