//! Per-client token endpoint configuration.

// self
use crate::{_prelude::*, auth::ClientName, error::ConfigError};

/// Client authentication mode used on the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Request details for one token client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfiguration {
	/// Token endpoint URL.
	pub token_endpoint: Url,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Client secret for confidential clients.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_secret: Option<String>,
	/// Scopes requested on every grant.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub scope: Vec<String>,
	/// How the client authenticates.
	#[serde(default)]
	pub auth_method: ClientAuthMethod,
	/// Revocation endpoint URL, when the provider supports revocation.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub revocation_endpoint: Option<Url>,
}
impl ClientConfiguration {
	/// Creates a public client configuration for `token_endpoint`.
	pub fn new(token_endpoint: Url, client_id: impl Into<String>) -> Self {
		Self {
			token_endpoint,
			client_id: client_id.into(),
			client_secret: None,
			scope: Vec::new(),
			auth_method: ClientAuthMethod::default(),
			revocation_endpoint: None,
		}
	}

	/// Sets the client secret.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Replaces the requested scopes.
	pub fn with_scope<I, S>(mut self, scope: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scope = scope.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the client authentication mode.
	pub fn with_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.auth_method = method;

		self
	}

	/// Sets the revocation endpoint.
	pub fn with_revocation_endpoint(mut self, url: Url) -> Self {
		self.revocation_endpoint = Some(url);

		self
	}
}
impl Debug for ClientConfiguration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientConfiguration")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("scope", &self.scope)
			.field("auth_method", &self.auth_method)
			.field("revocation_endpoint", &self.revocation_endpoint.as_ref().map(Url::as_str))
			.finish()
	}
}

/// Token client configurations keyed by client name, plus the client used for user sessions.
///
/// ```json
/// {
///   "clients": {
///     "billing-api": { "token_endpoint": "https://idp.example/token", "client_id": "billing" }
///   },
///   "user": {
///     "token_endpoint": "https://idp.example/token",
///     "client_id": "web",
///     "revocation_endpoint": "https://idp.example/revoke"
///   }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointConfiguration {
	/// Configurations for client-credentials and password grants.
	pub clients: HashMap<ClientName, ClientConfiguration>,
	/// Configuration for delegated user refresh and revocation.
	pub user: Option<ClientConfiguration>,
}
impl EndpointConfiguration {
	/// Parses a configuration document, reporting the failing JSON path on error.
	pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
		crate::error::from_json_slice(bytes).map_err(|e| ConfigError::invalid_document(e).into())
	}

	/// Registers or replaces the configuration for `name`.
	pub fn with_client(mut self, name: ClientName, client: ClientConfiguration) -> Self {
		self.clients.insert(name, client);

		self
	}

	/// Sets the user-session client.
	pub fn with_user_client(mut self, client: ClientConfiguration) -> Self {
		self.user = Some(client);

		self
	}

	/// Looks up the configuration for `name`.
	pub fn client(&self, name: &ClientName) -> Result<&ClientConfiguration, ConfigError> {
		self.clients
			.get(name)
			.ok_or_else(|| ConfigError::UnknownClient { client: name.to_string() })
	}

	/// Returns the user-session client.
	pub fn user_client(&self) -> Result<&ClientConfiguration, ConfigError> {
		self.user.as_ref().ok_or(ConfigError::MissingUserClient)
	}
}
