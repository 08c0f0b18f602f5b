// self
use crate::{_prelude::*, auth::RefreshableToken, cache::CacheAside, store::TokenCacheStore};

/// Password-grant cache: one [`RefreshableToken`] per client name.
#[derive(Clone, Debug)]
pub struct PasswordTokenCache(CacheAside);
impl PasswordTokenCache {
	/// Wraps `store`, namespacing keys with `prefix`.
	pub fn new(store: Arc<dyn TokenCacheStore>, prefix: impl Into<String>) -> Self {
		Self(CacheAside::new(store, prefix, "password"))
	}

	/// Store key used for `client_name`.
	pub fn cache_key(&self, client_name: &str) -> Result<String> {
		self.0.key(client_name)
	}

	/// Reads the cached token pair; corrupted entries read as `None`.
	pub async fn get(&self, client_name: &str) -> Result<Option<RefreshableToken>> {
		self.0.read(client_name).await
	}

	/// Replaces the cached token pair, refresh token included.
	pub async fn set(&self, client_name: &str, token: &RefreshableToken) -> Result<()> {
		self.0.write(client_name, token).await
	}

	/// Removes the cached token pair.
	pub async fn delete(&self, client_name: &str) -> Result<()> {
		self.0.delete(client_name).await
	}
}
