//! Delegated user flow and refresh-token revocation.
//!
//! User sessions live in the [`UserTokenStore`](crate::store::UserTokenStore). Refreshes are
//! coordinated by the fingerprint of the stored refresh token, so every request for the same
//! session shares one exchange while the raw token never becomes a map key or a log field.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Principal, RefreshableToken},
	endpoint::RefreshTarget,
	flows::{FailureKind, FlowKey, Freshness, TokenManager, TokenOutcome},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl TokenManager {
	/// Returns an access token for the current principal, refreshing it ahead of expiry.
	///
	/// Without an authenticated principal the call fails with
	/// [`FailureKind::Unauthenticated`]; this is logged at `debug` level only.
	pub async fn user_access_token(&self, force_renewal: bool) -> Result<TokenOutcome> {
		let Some(principal) = self.current_principal() else {
			let span = FlowSpan::new(FlowKind::UserRefresh, "user_access_token");

			return Ok(span.span().in_scope(|| {
				obs::record_flow_outcome(FlowKind::UserRefresh, FlowOutcome::Attempt);
				tracing::debug!("No authenticated principal; cannot acquire a user access token.");

				self.fail(FlowKind::UserRefresh, FailureKind::Unauthenticated)
			}));
		};

		self.user_access_token_for(&principal, force_renewal).await
	}

	/// Returns an access token for `principal`, refreshing it ahead of expiry.
	pub async fn user_access_token_for(
		&self,
		principal: &Principal,
		force_renewal: bool,
	) -> Result<TokenOutcome> {
		const KIND: FlowKind = FlowKind::UserRefresh;

		let span = FlowSpan::new(KIND, "user_access_token");
		let outcome = span
			.instrument(async move {
				obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

				let user = principal.display_name();
				let stored = match self.user_store.get_token(principal).await {
					Ok(stored) => stored,
					Err(e) => {
						tracing::error!(user, error = %e, "Failed to read the user token store.");

						return self.fail(KIND, FailureKind::Storage { message: e.to_string() });
					},
				};
				let Some(stored) = stored else {
					tracing::debug!(user, "No token data found in the user token store.");

					return self.fail(KIND, FailureKind::NoSession);
				};
				let freshness = Freshness::evaluate(
					Some(stored.access.expires_at),
					self.clock.now(),
					self.options.refresh_window(),
					force_renewal,
				);

				if freshness.is_fresh() {
					return self.serve_cached(KIND, stored.access);
				}
				if !stored.has_refresh_token() {
					tracing::warn!(user, "Stored user token has no refresh token.");

					return self.fail(KIND, FailureKind::MissingRefreshToken);
				}

				let fingerprint = stored.refresh_token.fingerprint();

				tracing::debug!(
					user,
					refresh_fingerprint = %fingerprint,
					force = force_renewal,
					"Token for user needs refreshing."
				);

				let key = FlowKey::new(KIND, fingerprint);
				let manager = self.clone();
				let principal = principal.clone();

				self.coordinate(key, move || async move {
					manager.refresh_user_token(principal, stored, force_renewal).await
				})
				.await
			})
			.await;

		Ok(outcome)
	}

	/// Revokes the current principal's stored refresh token at the provider.
	///
	/// Revocation failures are logged and never surfaced; the local session is left in place.
	pub async fn revoke_refresh_token(&self) -> Result<()> {
		let Some(principal) = self.current_principal() else {
			FlowSpan::new(FlowKind::Revocation, "revoke_refresh_token")
				.span()
				.in_scope(|| tracing::debug!("No authenticated principal; nothing to revoke."));

			return Ok(());
		};

		self.revoke_refresh_token_for(&principal).await
	}

	/// Revokes the refresh token stored for `principal`.
	pub async fn revoke_refresh_token_for(&self, principal: &Principal) -> Result<()> {
		const KIND: FlowKind = FlowKind::Revocation;

		let span = FlowSpan::new(KIND, "revoke_refresh_token");

		span.instrument(async move {
			obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

			let user = principal.display_name();
			let stored = match self.user_store.get_token(principal).await {
				Ok(stored) => stored,
				Err(e) => {
					tracing::error!(user, error = %e, "Failed to read the user token store.");
					obs::record_flow_outcome(KIND, FlowOutcome::Failure);

					return;
				},
			};
			let Some(refresh_token) =
				stored.map(|token| token.refresh_token).filter(|secret| !secret.is_empty())
			else {
				tracing::debug!(user, "No refresh token to revoke.");

				return;
			};
			let response = self.endpoint.revoke_refresh_token(&refresh_token).await;

			if response.is_error() {
				tracing::error!(
					user,
					refresh_fingerprint = %refresh_token.fingerprint(),
					error = response.error_message(),
					"Error revoking refresh token."
				);
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			} else {
				tracing::debug!(user, "Revoked refresh token.");
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			}
		})
		.await;

		Ok(())
	}

	async fn refresh_user_token(
		&self,
		principal: Principal,
		stored: RefreshableToken,
		force: bool,
	) -> TokenOutcome {
		self.metrics.record_acquisition();

		let user = principal.display_name();

		if !force {
			match self.user_store.get_token(&principal).await {
				Ok(Some(current))
					if Freshness::evaluate(
						Some(current.access.expires_at),
						self.clock.now(),
						self.options.refresh_window(),
						false,
					)
					.is_fresh() =>
					return TokenOutcome::Token(current.access),
				Ok(_) => (),
				Err(e) => {
					tracing::warn!(user, error = %e, "Failed to re-read the user token store.")
				},
			}
		}

		let response = self
			.endpoint
			.refresh_token(&stored.refresh_token, RefreshTarget::User)
			.await;

		if response.is_error() {
			tracing::error!(
				user,
				error = response.error_message(),
				"Error refreshing access token."
			);

			return self.endpoint_failure(FlowKind::UserRefresh, response.error_message());
		}

		let access =
			AccessToken::from_grant(response.access_token, response.expires_in, self.clock.now());
		let token = match response.refresh_token {
			Some(rotated) => RefreshableToken::new(access, rotated),
			None => RefreshableToken { access, refresh_token: stored.refresh_token },
		};

		if let Err(e) = self.user_store.store_token(&principal, token.clone()).await {
			tracing::error!(user, error = %e, "Failed to store the refreshed user token.");
		}

		TokenOutcome::Token(token.access)
	}
}
