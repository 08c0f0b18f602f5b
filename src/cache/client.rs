// self
use crate::{_prelude::*, auth::AccessToken, cache::CacheAside, store::TokenCacheStore};

/// Client-credentials cache: one [`AccessToken`] per client name.
#[derive(Clone, Debug)]
pub struct ClientTokenCache(CacheAside);
impl ClientTokenCache {
	/// Wraps `store`, namespacing keys with `prefix`.
	pub fn new(store: Arc<dyn TokenCacheStore>, prefix: impl Into<String>) -> Self {
		Self(CacheAside::new(store, prefix, "client"))
	}

	/// Store key used for `client_name`.
	pub fn cache_key(&self, client_name: &str) -> Result<String> {
		self.0.key(client_name)
	}

	/// Reads the cached token; corrupted entries read as `None`.
	pub async fn get(&self, client_name: &str) -> Result<Option<AccessToken>> {
		self.0.read(client_name).await
	}

	/// Replaces the cached token.
	pub async fn set(&self, client_name: &str, token: &AccessToken) -> Result<()> {
		self.0.write(client_name, token).await
	}

	/// Removes the cached token.
	pub async fn delete(&self, client_name: &str) -> Result<()> {
		self.0.delete(client_name).await
	}
}
