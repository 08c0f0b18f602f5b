//! Cache-aside token caches layered over a [`TokenCacheStore`].
//!
//! Each cache namespaces its entries with a configurable prefix and stores one JSON entry per
//! client name. Reads never fail because of a damaged entry: a value that does not deserialize is
//! logged at `error` level with the offending JSON path and reported as a miss, so operators can
//! tell "never cached" (a `debug` miss) apart from "corrupted entry". An empty or malformed client
//! name is a caller contract violation and is rejected with
//! [`Error::InvalidArgument`](crate::error::Error::InvalidArgument) before the store is touched.

mod client;
mod password;

pub use client::ClientTokenCache;
pub use password::PasswordTokenCache;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::ClientName,
	store::{StoreError, TokenCacheStore},
};

#[derive(Clone)]
struct CacheAside {
	store: Arc<dyn TokenCacheStore>,
	prefix: String,
	kind: &'static str,
}
impl CacheAside {
	fn new(store: Arc<dyn TokenCacheStore>, prefix: impl Into<String>, kind: &'static str) -> Self {
		Self { store, prefix: prefix.into(), kind }
	}

	fn key(&self, client_name: &str) -> Result<String> {
		let client = ClientName::new(client_name)?;

		Ok(format!("{}{client}", self.prefix))
	}

	async fn read<T>(&self, client_name: &str) -> Result<Option<T>>
	where
		T: DeserializeOwned,
	{
		let key = self.key(client_name)?;
		let Some(bytes) = self.store.get(&key).await? else {
			tracing::debug!(
				cache = self.kind,
				client = client_name,
				"Cache miss for access token."
			);

			return Ok(None);
		};

		match crate::error::from_json_slice::<T>(&bytes) {
			Ok(entry) => {
				tracing::debug!(
					cache = self.kind,
					client = client_name,
					"Cache hit for access token."
				);

				Ok(Some(entry))
			},
			Err(err) => {
				tracing::error!(
					cache = self.kind,
					client = client_name,
					path = %err.path(),
					error = %err.inner(),
					"Error parsing cached access token; treating the entry as a miss."
				);

				Ok(None)
			},
		}
	}

	async fn write<T>(&self, client_name: &str, entry: &T) -> Result<()>
	where
		T: Serialize,
	{
		let key = self.key(client_name)?;
		let bytes = serde_json::to_vec(entry)
			.map_err(|e| StoreError::Serialization { message: e.to_string() })?;

		tracing::debug!(cache = self.kind, client = client_name, "Caching access token.");
		self.store.set(&key, bytes).await?;

		Ok(())
	}

	async fn delete(&self, client_name: &str) -> Result<()> {
		let key = self.key(client_name)?;

		tracing::debug!(cache = self.kind, client = client_name, "Removing cached access token.");
		self.store.remove(&key).await?;

		Ok(())
	}
}
impl Debug for CacheAside {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f
			.debug_struct("CacheAside")
			.field("kind", &self.kind)
			.field("prefix", &self.prefix)
			.finish()
	}
}
