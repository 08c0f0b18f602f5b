//! [`TokenEndpoint`] implemented over the `oauth2` crate.

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RefreshToken,
	RequestTokenError, ResourceOwnerPassword, ResourceOwnerUsername, RevocationUrl, Scope,
	StandardRevocableToken, TokenResponse as OAuth2TokenResponse, TokenUrl,
	basic::{BasicClient, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientName, TokenResponse, TokenSecret},
	endpoint::{
		ClientAuthMethod, ClientConfiguration, EndpointConfiguration, EndpointFuture,
		PasswordCredentials, RefreshTarget, TokenEndpoint,
	},
	error::ConfigError,
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

type TokenClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type RevocationClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet, EndpointSet>;

#[cfg(feature = "reqwest")]
/// Endpoint client specialized for the crate's default reqwest transport.
pub type ReqwestTokenEndpoint = OAuth2TokenEndpoint<ReqwestHttpClient>;

/// Token endpoint client that resolves request details from an [`EndpointConfiguration`].
///
/// Client-credentials, password, and password refresh requests use the configuration registered
/// under the request's client name. User refresh and revocation use the user client. A missing
/// configuration is reported as an error response rather than a panic, so a misconfigured client
/// name surfaces as an endpoint failure for that flow only.
pub struct OAuth2TokenEndpoint<C>
where
	C: ?Sized + TokenHttpClient,
{
	config: Arc<EndpointConfiguration>,
	http_client: Arc<C>,
}
impl<C> OAuth2TokenEndpoint<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates an endpoint client over a caller-provided transport.
	pub fn with_http_client(config: EndpointConfiguration, http_client: impl Into<Arc<C>>) -> Self {
		Self { config: Arc::new(config), http_client: http_client.into() }
	}

	/// Configuration this client resolves requests from.
	pub fn configuration(&self) -> &EndpointConfiguration {
		&self.config
	}

	async fn exchange(&self, client: &ClientConfiguration, grant: Grant<'_>) -> TokenResponse {
		let oauth_client = match token_client(client) {
			Ok(oauth_client) => oauth_client,
			Err(e) => return TokenResponse::error(e.to_string()),
		};
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let scopes = client.scope.iter().cloned().map(Scope::new);
		let result = match grant {
			Grant::ClientCredentials =>
				oauth_client
					.exchange_client_credentials()
					.add_scopes(scopes)
					.request_async(&handle)
					.await,
			Grant::Password(credentials) => {
				let username = ResourceOwnerUsername::new(credentials.login.clone());
				let password = ResourceOwnerPassword::new(credentials.password.expose().to_owned());

				oauth_client
					.exchange_password(&username, &password)
					.add_scopes(scopes)
					.request_async(&handle)
					.await
			},
			Grant::Refresh(secret) => {
				let refresh_token = RefreshToken::new(secret.expose().to_owned());

				oauth_client
					.exchange_refresh_token(&refresh_token)
					.add_scopes(scopes)
					.request_async(&handle)
					.await
			},
		};

		match result {
			Ok(response) => map_token_response(&response),
			Err(err) => TokenResponse::error(describe_request_error(err, meta.take().as_ref())),
		}
	}

	async fn revoke(&self, client: &ClientConfiguration, secret: &TokenSecret) -> TokenResponse {
		let oauth_client = match revocation_client(client) {
			Ok(oauth_client) => oauth_client,
			Err(e) => return TokenResponse::error(e.to_string()),
		};
		let token =
			StandardRevocableToken::RefreshToken(RefreshToken::new(secret.expose().to_owned()));
		let request = match oauth_client.revoke_token(token) {
			Ok(request) => request,
			Err(e) => return TokenResponse::error(format!("Revocation request is invalid: {e}.")),
		};
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());

		match request.request_async(&handle).await {
			Ok(()) => TokenResponse::default(),
			Err(err) => TokenResponse::error(describe_request_error(err, meta.take().as_ref())),
		}
	}
}
#[cfg(feature = "reqwest")]
impl OAuth2TokenEndpoint<ReqwestHttpClient> {
	/// Creates an endpoint client with its own redirect-free reqwest transport.
	pub fn new(config: EndpointConfiguration) -> Result<Self> {
		Ok(Self::with_http_client(config, ReqwestHttpClient::new()?))
	}
}
impl<C> TokenEndpoint for OAuth2TokenEndpoint<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn request_client_credentials_token<'a>(
		&'a self,
		client: &'a ClientName,
	) -> EndpointFuture<'a> {
		Box::pin(async move {
			match self.config.client(client) {
				Ok(config) => self.exchange(config, Grant::ClientCredentials).await,
				Err(e) => TokenResponse::error(e.to_string()),
			}
		})
	}

	fn request_password_token<'a>(
		&'a self,
		credentials: &'a PasswordCredentials,
		client: &'a ClientName,
	) -> EndpointFuture<'a> {
		Box::pin(async move {
			match self.config.client(client) {
				Ok(config) => self.exchange(config, Grant::Password(credentials)).await,
				Err(e) => TokenResponse::error(e.to_string()),
			}
		})
	}

	fn refresh_token<'a>(
		&'a self,
		refresh_token: &'a TokenSecret,
		target: RefreshTarget<'a>,
	) -> EndpointFuture<'a> {
		Box::pin(async move {
			let config = match target {
				RefreshTarget::User => self.config.user_client(),
				RefreshTarget::Password(client) => self.config.client(client),
			};

			match config {
				Ok(config) => self.exchange(config, Grant::Refresh(refresh_token)).await,
				Err(e) => TokenResponse::error(e.to_string()),
			}
		})
	}

	fn revoke_refresh_token<'a>(&'a self, refresh_token: &'a TokenSecret) -> EndpointFuture<'a> {
		Box::pin(async move {
			match self.config.user_client() {
				Ok(config) => self.revoke(config, refresh_token).await,
				Err(e) => TokenResponse::error(e.to_string()),
			}
		})
	}
}
impl<C> Debug for OAuth2TokenEndpoint<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2TokenEndpoint").field("config", &self.config).finish()
	}
}

#[derive(Clone, Copy)]
enum Grant<'a> {
	ClientCredentials,
	Password(&'a PasswordCredentials),
	Refresh(&'a TokenSecret),
}

fn token_client(client: &ClientConfiguration) -> Result<TokenClient, ConfigError> {
	let token_url = TokenUrl::new(client.token_endpoint.to_string())
		.map_err(|source| ConfigError::InvalidEndpoint { source })?;
	let mut oauth_client =
		BasicClient::new(ClientId::new(client.client_id.clone())).set_token_uri(token_url);

	if let Some(secret) = &client.client_secret {
		oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.clone()));
	}
	if matches!(client.auth_method, ClientAuthMethod::ClientSecretPost) {
		oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
	}

	Ok(oauth_client)
}

fn revocation_client(client: &ClientConfiguration) -> Result<RevocationClient, ConfigError> {
	let url = client.revocation_endpoint.as_ref().ok_or(ConfigError::MissingRevocationEndpoint)?;
	let revocation_url = RevocationUrl::new(url.to_string())
		.map_err(|source| ConfigError::InvalidEndpoint { source })?;

	Ok(token_client(client)?.set_revocation_url(revocation_url))
}

fn map_token_response(response: &BasicTokenResponse) -> TokenResponse {
	let Some(expires_in) = response.expires_in() else {
		return TokenResponse::error("Token endpoint response is missing `expires_in`.");
	};
	let expires_in = i64::try_from(expires_in.as_secs()).unwrap_or(i64::MAX);
	let mut mapped =
		TokenResponse::success(response.access_token().secret().to_owned(), expires_in);

	if let Some(refresh_token) = response.refresh_token() {
		mapped = mapped.with_refresh_token(refresh_token.secret().to_owned());
	}

	mapped
}

fn describe_request_error<RE, T>(
	err: RequestTokenError<RE, T>,
	meta: Option<&ResponseMetadata>,
) -> String
where
	RE: 'static + StdError,
	T: 'static + oauth2::ErrorResponse,
{
	let status = meta
		.and_then(|meta| meta.status)
		.map(|code| format!(" (HTTP {code})"))
		.unwrap_or_default();

	match err {
		RequestTokenError::ServerResponse(response) =>
			format!("Token endpoint returned an OAuth error{status}: {response}."),
		RequestTokenError::Request(e) =>
			format!("HTTP client error occurred while calling the token endpoint: {e}."),
		RequestTokenError::Parse(e, _body) =>
			format!("Token endpoint response could not be parsed{status}: {e}."),
		RequestTokenError::Other(message) =>
			format!("Token endpoint returned an unexpected response{status}: {message}."),
	}
}
