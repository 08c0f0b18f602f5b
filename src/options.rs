//! Manager configuration: refresh-ahead window, cache namespaces, default client.

// self
use crate::{
	_prelude::*,
	auth::{ClientName, MAX_EXPIRES_IN_SECS},
	error::ConfigError,
};

/// Options recognized by [`TokenManager`](crate::flows::TokenManager).
///
/// Every field is defaulted, so a configuration document only needs the values it overrides:
///
/// ```json
/// { "refresh_before_expiration": 120, "default_client_name": "billing-api" }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerOptions {
	/// Refresh-ahead window, serialized as whole seconds.
	#[serde(with = "duration_secs")]
	pub refresh_before_expiration: Duration,
	/// Namespace prefix for client-credentials cache entries.
	pub client_cache_key_prefix: String,
	/// Namespace prefix for password-grant cache entries.
	pub password_cache_key_prefix: String,
	/// Client name used when a request does not name one.
	pub default_client_name: String,
	/// Runs the credential-less password bootstrap grant when the password cache is empty.
	pub bootstrap_password_grant_on_miss: bool,
}
impl ManagerOptions {
	/// Default refresh-ahead window.
	pub const DEFAULT_REFRESH_BEFORE_EXPIRATION: Duration = Duration::seconds(60);
	/// Default client name sentinel.
	pub const DEFAULT_CLIENT_NAME: &'static str = "default";

	/// Parses options from a JSON document and validates them.
	pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
		let options: Self =
			crate::error::from_json_slice(bytes).map_err(ConfigError::invalid_document)?;

		options.validate()?;

		Ok(options)
	}

	/// Checks that the default client name is a usable cache key and that the refresh window
	/// fits within the longest honored token lifetime.
	pub fn validate(&self) -> Result<()> {
		self.default_client()?;

		let seconds = self.refresh_before_expiration.whole_seconds();

		if seconds > MAX_EXPIRES_IN_SECS {
			return Err(
				ConfigError::RefreshWindowOutOfRange { seconds, max: MAX_EXPIRES_IN_SECS }.into()
			);
		}

		Ok(())
	}

	/// Overrides the refresh-ahead window; negative values become zero.
	pub fn with_refresh_before_expiration(mut self, window: Duration) -> Self {
		self.refresh_before_expiration = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Overrides the client-credentials cache prefix.
	pub fn with_client_cache_key_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.client_cache_key_prefix = prefix.into();

		self
	}

	/// Overrides the password-grant cache prefix.
	pub fn with_password_cache_key_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.password_cache_key_prefix = prefix.into();

		self
	}

	/// Overrides the default client name.
	pub fn with_default_client_name(mut self, name: impl Into<String>) -> Self {
		self.default_client_name = name.into();

		self
	}

	/// Enables or disables the password bootstrap fallback on cache misses.
	pub fn with_bootstrap_password_grant_on_miss(mut self, enabled: bool) -> Self {
		self.bootstrap_password_grant_on_miss = enabled;

		self
	}

	/// Effective refresh-ahead window (never negative).
	pub fn refresh_window(&self) -> Duration {
		if self.refresh_before_expiration.is_negative() {
			Duration::ZERO
		} else {
			self.refresh_before_expiration
		}
	}

	/// Resolves the default client name into a validated key.
	pub fn default_client(&self) -> Result<ClientName> {
		Ok(ClientName::new(&self.default_client_name)?)
	}
}
impl Default for ManagerOptions {
	fn default() -> Self {
		Self {
			refresh_before_expiration: Self::DEFAULT_REFRESH_BEFORE_EXPIRATION,
			client_cache_key_prefix: "oauth2_token_manager::client::".into(),
			password_cache_key_prefix: "oauth2_token_manager::password::".into(),
			default_client_name: Self::DEFAULT_CLIENT_NAME.into(),
			bootstrap_password_grant_on_miss: false,
		}
	}
}

mod duration_secs {
	// crates.io
	use serde::{Deserialize, Deserializer, Serializer};
	use time::Duration;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::seconds)
	}
}
