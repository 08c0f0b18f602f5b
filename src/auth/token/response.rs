//! Uniform token endpoint response shared by every grant.

// self
use crate::_prelude::*;

/// Result of one token endpoint exchange.
///
/// Transient: fields are copied into [`AccessToken`](crate::auth::AccessToken) or
/// [`RefreshableToken`](crate::auth::RefreshableToken) and the response itself is never stored.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenResponse {
	/// Error description when the exchange failed; `None` on success.
	pub error: Option<String>,
	/// Issued access token (empty on error).
	pub access_token: String,
	/// Lifetime of the access token in seconds.
	pub expires_in: i64,
	/// Rotated refresh token, when the provider issued one.
	pub refresh_token: Option<String>,
}
impl TokenResponse {
	/// Successful response carrying an access token.
	pub fn success(access_token: impl Into<String>, expires_in: i64) -> Self {
		Self { access_token: access_token.into(), expires_in, ..Default::default() }
	}

	/// Error response with the provided description.
	pub fn error(error: impl Into<String>) -> Self {
		Self { error: Some(error.into()), ..Default::default() }
	}

	/// Attaches a refresh token to a successful response.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
		self.refresh_token = Some(refresh_token.into());

		self
	}

	/// Returns `true` when the endpoint reported an error.
	pub fn is_error(&self) -> bool {
		self.error.is_some()
	}

	/// Error description, or an empty string for successful responses.
	pub fn error_message(&self) -> &str {
		self.error.as_deref().unwrap_or_default()
	}
}
impl Debug for TokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResponse")
			.field("error", &self.error)
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}
