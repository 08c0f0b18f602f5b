//! Immutable access token values with absolute expiry instants.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Largest `expires_in` honored when computing an expiry (ten years).
pub const MAX_EXPIRES_IN_SECS: i64 = 315_360_000;

/// Bearer access token paired with the absolute instant it stops being valid.
///
/// Serialized as `{"access_token": "...", "expires_at": <unix seconds>}` so cached entries remain
/// meaningful regardless of when they are read back.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Access token secret; callers must avoid logging it.
	#[serde(rename = "access_token")]
	pub value: TokenSecret,
	/// Absolute expiry instant (UTC).
	#[serde(with = "time::serde::timestamp")]
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Wraps a token value and its absolute expiry.
	pub fn new(value: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { value: TokenSecret::new(value), expires_at }
	}

	/// Builds a token granted at `issued_at` that lives for `expires_in_secs` seconds.
	///
	/// Negative lifetimes are clamped to zero and lifetimes beyond [`MAX_EXPIRES_IN_SECS`] are
	/// capped.
	pub fn from_grant(
		value: impl Into<String>,
		expires_in_secs: i64,
		issued_at: OffsetDateTime,
	) -> Self {
		let lifetime = Duration::seconds(expires_in_secs.clamp(0, MAX_EXPIRES_IN_SECS));

		Self::new(value, issued_at + lifetime)
	}

	/// Returns the raw token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		self.value.expose()
	}

	/// Returns `true` once `instant` reaches the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Time left until expiry at `instant` (negative once expired).
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		self.expires_at - instant
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Access token plus the refresh token that renews it (password and user flows).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshableToken {
	/// Current access token.
	#[serde(flatten)]
	pub access: AccessToken,
	/// Refresh token; empty when the provider did not issue one.
	#[serde(default = "empty_secret")]
	pub refresh_token: TokenSecret,
}
impl RefreshableToken {
	/// Pairs an access token with its refresh token.
	pub fn new(access: AccessToken, refresh_token: impl Into<String>) -> Self {
		Self { access, refresh_token: TokenSecret::new(refresh_token) }
	}

	/// Returns `true` when a non-empty refresh token is available.
	pub fn has_refresh_token(&self) -> bool {
		!self.refresh_token.is_empty()
	}
}
impl Debug for RefreshableToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshableToken")
			.field("access", &self.access)
			.field("refresh_token", &if self.has_refresh_token() { "<redacted>" } else { "<none>" })
			.finish()
	}
}

fn empty_secret() -> TokenSecret {
	TokenSecret::new(String::new())
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn grant_computes_absolute_expiry() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let token = AccessToken::from_grant("abc123", 3600, issued);

		assert_eq!(token.expires_at, macros::datetime!(2025-01-01 01:00 UTC));
		assert!(!token.is_expired_at(macros::datetime!(2025-01-01 00:59:59 UTC)));
		assert!(token.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
		assert_eq!(token.remaining_at(issued), Duration::hours(1));
	}

	#[test]
	fn grant_clamps_out_of_range_lifetimes() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);

		assert_eq!(AccessToken::from_grant("born-expired", -30, issued).expires_at, issued);
		assert_eq!(
			AccessToken::from_grant("capped", i64::MAX, issued).expires_at,
			issued + Duration::seconds(MAX_EXPIRES_IN_SECS)
		);
	}

	#[test]
	fn cache_entry_layout_uses_unix_seconds() {
		let token = RefreshableToken::new(
			AccessToken::new("access", macros::datetime!(2025-01-01 00:00 UTC)),
			"refresh",
		);
		let json = serde_json::to_value(&token).expect("Token should serialize.");

		assert_eq!(
			json,
			serde_json::json!({
				"access_token": "access",
				"expires_at": 1_735_689_600,
				"refresh_token": "refresh",
			})
		);

		let without_refresh: RefreshableToken = serde_json::from_value(serde_json::json!({
			"access_token": "access",
			"expires_at": 1_735_689_600,
		}))
		.expect("Missing refresh token should default to empty.");

		assert!(!without_refresh.has_refresh_token());
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let token = RefreshableToken::new(AccessToken::new("access", OffsetDateTime::UNIX_EPOCH), "r");
		let rendered = format!("{token:?}");

		assert!(!rendered.contains("\"access\""));
		assert!(rendered.contains("<redacted>"));
	}
}
