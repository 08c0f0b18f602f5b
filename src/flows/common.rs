//! Request, key, freshness, and outcome types shared by every flow.

// self
use crate::{_prelude::*, auth::AccessToken, obs::FlowKind};

/// Per-call parameters for the client-credentials and password flows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenRequest {
	/// Client configuration name; `None` selects
	/// [`ManagerOptions::default_client_name`](crate::options::ManagerOptions).
	pub client_name: Option<String>,
	/// Bypasses the freshness check and the in-producer cache re-read.
	pub force_renewal: bool,
}
impl TokenRequest {
	/// Creates a request for the named client.
	pub fn new(client_name: impl Into<String>) -> Self {
		Self { client_name: Some(client_name.into()), force_renewal: false }
	}

	/// Forces a new acquisition even if a fresh token is cached.
	pub fn force_renewal(mut self) -> Self {
		self.force_renewal = true;

		self
	}

	/// Overrides the force flag.
	pub fn with_force(mut self, force: bool) -> Self {
		self.force_renewal = force;

		self
	}
}

/// Coordination key: at most one acquisition runs per key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FlowKey {
	/// Flow the acquisition belongs to.
	pub flow: FlowKind,
	/// Client name, or the refresh token fingerprint for user sessions.
	pub id: String,
}
impl FlowKey {
	/// Builds a key for `flow` and `id`.
	pub fn new(flow: FlowKind, id: impl Into<String>) -> Self {
		Self { flow, id: id.into() }
	}
}
impl Display for FlowKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}:{}", self.flow, self.id)
	}
}

/// Freshness of a cached entry, evaluated on every call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
	/// Usable as is.
	Fresh,
	/// Inside the refresh-ahead window, expired, or renewal was forced.
	NearExpiry,
	/// Nothing cached.
	Missing,
}
impl Freshness {
	/// Classifies an entry expiring at `expires_at` at instant `now`.
	pub fn evaluate(
		expires_at: Option<OffsetDateTime>,
		now: OffsetDateTime,
		window: Duration,
		force: bool,
	) -> Self {
		match expires_at {
			None => Self::Missing,
			Some(_) if force => Self::NearExpiry,
			// An out-of-range refresh instant can never be ahead of `now`.
			Some(expires_at) => match expires_at.checked_sub(window) {
				Some(refresh_at) if now < refresh_at => Self::Fresh,
				_ => Self::NearExpiry,
			},
		}
	}

	/// Returns `true` for [`Freshness::Fresh`].
	pub fn is_fresh(self) -> bool {
		matches!(self, Self::Fresh)
	}
}

/// Terminal result of one acquisition call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenOutcome {
	/// A usable access token.
	Token(AccessToken),
	/// The call could not produce a token; nothing was cached.
	Failure(FailureKind),
}
impl TokenOutcome {
	/// Returns the token, if any.
	pub fn token(&self) -> Option<&AccessToken> {
		match self {
			Self::Token(token) => Some(token),
			Self::Failure(_) => None,
		}
	}

	/// Consumes the outcome, returning the token if any.
	pub fn into_token(self) -> Option<AccessToken> {
		match self {
			Self::Token(token) => Some(token),
			Self::Failure(_) => None,
		}
	}

	/// Returns the failure, if any.
	pub fn failure(&self) -> Option<&FailureKind> {
		match self {
			Self::Token(_) => None,
			Self::Failure(kind) => Some(kind),
		}
	}

	/// Returns `true` when a token was produced.
	pub fn is_token(&self) -> bool {
		matches!(self, Self::Token(_))
	}
}
impl From<FailureKind> for TokenOutcome {
	fn from(kind: FailureKind) -> Self {
		Self::Failure(kind)
	}
}

/// Reasons an acquisition produced no token.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum FailureKind {
	/// The token endpoint returned an error.
	#[error("Token endpoint rejected the {flow} request: {error}")]
	Endpoint {
		/// Flow whose request failed.
		flow: FlowKind,
		/// Error description reported by the endpoint.
		error: String,
	},
	/// No authenticated principal is bound to the call.
	#[error("No authenticated principal is available.")]
	Unauthenticated,
	/// The principal has no stored token pair.
	#[error("No token is stored for the principal.")]
	NoSession,
	/// The password cache is empty and the bootstrap grant is disabled.
	#[error("No password grant is cached for the client.")]
	NoCachedGrant,
	/// A refresh was needed but the entry carries no refresh token.
	#[error("The cached token has no refresh token.")]
	MissingRefreshToken,
	/// The user token store could not be read.
	#[error("Token storage failed: {message}")]
	Storage {
		/// Storage error description.
		message: String,
	},
}
