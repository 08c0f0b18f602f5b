//! Token endpoint contract consumed by the manager, plus the `oauth2` backed implementation.
//!
//! Every call resolves to a [`TokenResponse`]; transport and protocol failures are folded into
//! [`TokenResponse::error`] so the manager can treat them uniformly as endpoint errors.

pub mod config;
pub mod oauth;

pub use config::*;
pub use oauth::*;

// self
use crate::{
	_prelude::*,
	auth::{ClientName, TokenResponse, TokenSecret},
};

/// Boxed future returned by every [`TokenEndpoint`] call.
pub type EndpointFuture<'a> = Pin<Box<dyn Future<Output = TokenResponse> + 'a + Send>>;

/// Performs the network exchange for each grant type.
pub trait TokenEndpoint
where
	Self: Send + Sync,
{
	/// Runs the client-credentials grant for `client`.
	fn request_client_credentials_token<'a>(
		&'a self,
		client: &'a ClientName,
	) -> EndpointFuture<'a>;

	/// Runs the resource-owner password grant for `client`.
	fn request_password_token<'a>(
		&'a self,
		credentials: &'a PasswordCredentials,
		client: &'a ClientName,
	) -> EndpointFuture<'a>;

	/// Exchanges `refresh_token` for a new token pair using the configuration picked by `target`.
	fn refresh_token<'a>(
		&'a self,
		refresh_token: &'a TokenSecret,
		target: RefreshTarget<'a>,
	) -> EndpointFuture<'a>;

	/// Revokes `refresh_token`; a successful response carries no token.
	fn revoke_refresh_token<'a>(&'a self, refresh_token: &'a TokenSecret) -> EndpointFuture<'a>;
}

/// Client configuration a refresh-token exchange runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshTarget<'a> {
	/// Delegated user sessions.
	User,
	/// Password-grant tokens cached for the named client.
	Password(&'a ClientName),
}

/// Resource-owner credentials for the password grant.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordCredentials {
	/// Resource-owner login.
	pub login: String,
	/// Resource-owner password.
	pub password: TokenSecret,
}
impl PasswordCredentials {
	/// Pairs a login with its password.
	pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
		Self { login: login.into(), password: TokenSecret::new(password) }
	}

	/// Empty credentials used by the bootstrap grant.
	pub fn empty() -> Self {
		Self::new(String::new(), String::new())
	}

	/// Returns `true` when neither login nor password is set.
	pub fn is_empty(&self) -> bool {
		self.login.is_empty() && self.password.is_empty()
	}
}
impl Debug for PasswordCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PasswordCredentials")
			.field("login", &self.login)
			.field("password", &"<redacted>")
			.finish()
	}
}
