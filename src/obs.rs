//! Observability helpers for manager flows.
//!
//! - Every public acquisition runs inside a `tracing` span named `oauth2_token_manager.flow` with
//!   the `flow` and `stage` (call site) fields.
//! - Enable `metrics` to increment the `oauth2_token_manager_flow_total` counter for every
//!   attempt, cache hit, success, and failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Acquisition flows coordinated by the manager.
///
/// Also the first half of every coordination key, so the explicit password grant and the cached
/// password refresh for one client never join each other's flights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
	/// Client-credentials grant.
	ClientCredentials,
	/// Password grant with explicit or bootstrap credentials.
	Password,
	/// Refresh-token exchange for a cached password grant.
	PasswordRefresh,
	/// Refresh-token exchange for a delegated user session.
	UserRefresh,
	/// Refresh-token revocation.
	Revocation,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::ClientCredentials => "client_credentials",
			FlowKind::Password => "password",
			FlowKind::PasswordRefresh => "password_refresh",
			FlowKind::UserRefresh => "user_refresh",
			FlowKind::Revocation => "revocation",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a manager operation.
	Attempt,
	/// Served from the cache or store without contacting the endpoint.
	CacheHit,
	/// A token was acquired (or revocation succeeded).
	Success,
	/// A failure outcome was returned to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::CacheHit => "cache_hit",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
