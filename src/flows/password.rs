//! Resource-owner password flow.
//!
//! Two coordination keys exist per client. `(password, client)` covers grants made with
//! credentials, explicit or bootstrap. `(password_refresh, client)` covers refreshes of the cached
//! grant. Both write the full token pair, refresh token included, to the password cache.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientName, RefreshableToken},
	endpoint::{PasswordCredentials, RefreshTarget},
	flows::{FailureKind, FlowKey, Freshness, TokenManager, TokenOutcome, TokenRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl TokenManager {
	/// Runs a coordinated password grant with `credentials`, replacing the cached grant.
	///
	/// The cache is not consulted first: every call that does not join an in-flight grant for the
	/// same client contacts the endpoint.
	pub async fn password_access_token_with(
		&self,
		credentials: PasswordCredentials,
		request: TokenRequest,
	) -> Result<TokenOutcome> {
		let client = self.resolve_client(&request)?;

		Ok(self.password_grant(credentials, client, "password_access_token_with").await)
	}

	/// Runs the password grant with empty credentials.
	///
	/// Suits providers that resolve the resource owner from the client itself.
	pub async fn bootstrap_password_access_token(
		&self,
		request: TokenRequest,
	) -> Result<TokenOutcome> {
		let client = self.resolve_client(&request)?;

		Ok(self
			.password_grant(PasswordCredentials::empty(), client, "bootstrap_password_access_token")
			.await)
	}

	/// Returns the cached password-grant token, refreshing it ahead of expiry.
	///
	/// With nothing cached the call fails with [`FailureKind::NoCachedGrant`], unless
	/// [`ManagerOptions::bootstrap_password_grant_on_miss`](crate::options::ManagerOptions) is
	/// enabled, in which case the bootstrap grant runs instead.
	pub async fn password_access_token(&self, request: TokenRequest) -> Result<TokenOutcome> {
		const KIND: FlowKind = FlowKind::PasswordRefresh;

		let client = self.resolve_client(&request)?;
		let force = request.force_renewal;
		let span = FlowSpan::new(KIND, "password_access_token");
		let outcome = span
			.instrument(async move {
				let cached = self.read_password_cache(&client).await;
				let freshness = Freshness::evaluate(
					cached.as_ref().map(|token| token.access.expires_at),
					self.clock.now(),
					self.options.refresh_window(),
					force,
				);

				match (freshness, cached) {
					(Freshness::Fresh, Some(token)) => {
						obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

						self.serve_cached(KIND, token.access)
					},
					(_, Some(entry)) => {
						obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
						tracing::debug!(
							client = %client,
							force,
							"Token for password grant needs refreshing."
						);

						self.coordinate_password_refresh(client, entry, force).await
					},
					(_, None) if self.options.bootstrap_password_grant_on_miss => {
						tracing::debug!(
							client = %client,
							"No token data found in the password cache; running the bootstrap grant."
						);

						self.password_grant(PasswordCredentials::empty(), client, "password_access_token")
							.await
					},
					(_, None) => {
						obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
						tracing::debug!(client = %client, "No token data found in the password cache.");

						self.fail(KIND, FailureKind::NoCachedGrant)
					},
				}
			})
			.await;

		Ok(outcome)
	}

	/// Removes the cached password grant.
	pub async fn delete_password_access_token(&self, request: TokenRequest) -> Result<()> {
		let client = self.resolve_client(&request)?;

		self.password_cache.delete(client.as_str()).await
	}

	async fn password_grant(
		&self,
		credentials: PasswordCredentials,
		client: ClientName,
		stage: &'static str,
	) -> TokenOutcome {
		const KIND: FlowKind = FlowKind::Password;

		let span = FlowSpan::new(KIND, stage);
		let key = FlowKey::new(KIND, client.as_str());
		let manager = self.clone();

		span.instrument(async move {
			obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

			self.coordinate(key, move || async move {
				manager.acquire_password_token(credentials, client).await
			})
			.await
		})
		.await
	}

	async fn coordinate_password_refresh(
		&self,
		client: ClientName,
		entry: RefreshableToken,
		force: bool,
	) -> TokenOutcome {
		let key = FlowKey::new(FlowKind::PasswordRefresh, client.as_str());
		let manager = self.clone();

		self.coordinate(key, move || async move {
			manager.refresh_password_token(client, entry, force).await
		})
		.await
	}

	async fn read_password_cache(&self, client: &ClientName) -> Option<RefreshableToken> {
		match self.password_cache.get(client.as_str()).await {
			Ok(token) => token,
			Err(e) => {
				tracing::warn!(
					client = %client,
					error = %e,
					"Failed to read the password token cache; treating it as a miss."
				);

				None
			},
		}
	}

	async fn acquire_password_token(
		&self,
		credentials: PasswordCredentials,
		client: ClientName,
	) -> TokenOutcome {
		self.metrics.record_acquisition();

		let response = self.endpoint.request_password_token(&credentials, &client).await;

		if response.is_error() {
			tracing::error!(
				client = %client,
				error = response.error_message(),
				"Error requesting password access token for client."
			);

			return self.endpoint_failure(FlowKind::Password, response.error_message());
		}

		let access =
			AccessToken::from_grant(response.access_token, response.expires_in, self.clock.now());
		let token = RefreshableToken::new(access, response.refresh_token.unwrap_or_default());

		self.write_password_cache(&client, &token).await;

		TokenOutcome::Token(token.access)
	}

	async fn refresh_password_token(
		&self,
		client: ClientName,
		entry: RefreshableToken,
		force: bool,
	) -> TokenOutcome {
		self.metrics.record_acquisition();

		let current = self.read_password_cache(&client).await.unwrap_or(entry);

		if !force
			&& Freshness::evaluate(
				Some(current.access.expires_at),
				self.clock.now(),
				self.options.refresh_window(),
				false,
			)
			.is_fresh()
		{
			return TokenOutcome::Token(current.access);
		}
		if !current.has_refresh_token() {
			tracing::warn!(client = %client, "Cached password grant has no refresh token.");
			self.metrics.record_failure();

			return TokenOutcome::Failure(FailureKind::MissingRefreshToken);
		}

		let response = self
			.endpoint
			.refresh_token(&current.refresh_token, RefreshTarget::Password(&client))
			.await;

		if response.is_error() {
			tracing::error!(
				client = %client,
				error = response.error_message(),
				"Error refreshing password access token for client."
			);

			return self.endpoint_failure(FlowKind::PasswordRefresh, response.error_message());
		}

		let access =
			AccessToken::from_grant(response.access_token, response.expires_in, self.clock.now());
		let token = match response.refresh_token {
			Some(rotated) => RefreshableToken::new(access, rotated),
			None => RefreshableToken { access, refresh_token: current.refresh_token },
		};

		self.write_password_cache(&client, &token).await;

		TokenOutcome::Token(token.access)
	}

	async fn write_password_cache(&self, client: &ClientName, token: &RefreshableToken) {
		if let Err(e) = self.password_cache.set(client.as_str(), token).await {
			tracing::error!(
				client = %client,
				error = %e,
				"Failed to cache the password access token."
			);
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		sync::atomic::{AtomicU64, AtomicUsize, Ordering},
		time::Duration as StdDuration,
	};
	// crates.io
	use futures::future;
	use tracing::{Event, Metadata, Subscriber, span};
	// self
	use super::*;
	use crate::{
		auth::TokenResponse,
		options::ManagerOptions,
		testing::{self, EndpointCall, T0},
	};

	/// Counts events by whether any span was entered when they fired.
	#[derive(Clone, Default)]
	struct SpanCoverage {
		next_id: Arc<AtomicU64>,
		depth: Arc<AtomicUsize>,
		inside: Arc<AtomicUsize>,
		outside: Arc<AtomicUsize>,
	}
	impl Subscriber for SpanCoverage {
		fn enabled(&self, _: &Metadata<'_>) -> bool {
			true
		}

		fn new_span(&self, _: &span::Attributes<'_>) -> span::Id {
			span::Id::from_u64(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
		}

		fn record(&self, _: &span::Id, _: &span::Record<'_>) {}

		fn record_follows_from(&self, _: &span::Id, _: &span::Id) {}

		fn event(&self, _: &Event<'_>) {
			if self.depth.load(Ordering::SeqCst) > 0 {
				self.inside.fetch_add(1, Ordering::SeqCst);
			} else {
				self.outside.fetch_add(1, Ordering::SeqCst);
			}
		}

		fn enter(&self, _: &span::Id) {
			self.depth.fetch_add(1, Ordering::SeqCst);
		}

		fn exit(&self, _: &span::Id) {
			self.depth.fetch_sub(1, Ordering::SeqCst);
		}
	}

	async fn cached(harness: &testing::Harness, client: &str) -> RefreshableToken {
		harness
			.manager
			.password_cache()
			.get(client)
			.await
			.expect("Cache read should succeed.")
			.expect("Grant should be cached.")
	}

	#[tokio::test]
	async fn explicit_grant_caches_the_token_pair() {
		let harness = testing::harness(ManagerOptions::default());

		harness
			.endpoint
			.push(TokenResponse::success("access-1", 3600).with_refresh_token("refresh-1"));

		let outcome = harness
			.manager
			.password_access_token_with(PasswordCredentials::new("alice", "pw"), TokenRequest::new("svc1"))
			.await
			.expect("Grant should succeed.");

		assert_eq!(outcome.token().map(AccessToken::expose), Some("access-1"));
		assert_eq!(
			harness.endpoint.calls(),
			vec![EndpointCall::Password { client: "svc1".into(), login: "alice".into() }]
		);

		let entry = cached(&harness, "svc1").await;

		assert_eq!(entry.refresh_token.expose(), "refresh-1");
		assert_eq!(entry.access.expires_at, T0 + Duration::hours(1));
		assert!(
			harness.cache.get_now("oauth2_token_manager::password::svc1").is_some(),
			"Password grants must live under the password prefix."
		);
	}

	#[tokio::test]
	async fn cached_grant_refreshes_inside_the_window() {
		let harness = testing::harness(ManagerOptions::default());

		harness
			.endpoint
			.push(TokenResponse::success("access-1", 3600).with_refresh_token("refresh-1"));
		harness.endpoint.push(TokenResponse::success("access-2", 3600));
		harness
			.manager
			.password_access_token_with(PasswordCredentials::new("alice", "pw"), TokenRequest::new("svc1"))
			.await
			.expect("Grant should succeed.");

		harness.clock.advance(Duration::seconds(3600 - 90));

		let fresh = harness
			.manager
			.password_access_token(TokenRequest::new("svc1"))
			.await
			.expect("Read should succeed.");

		assert_eq!(fresh.token().map(AccessToken::expose), Some("access-1"));
		assert_eq!(harness.endpoint.call_count(), 1);

		// 30 seconds left with a 60 second window.
		harness.clock.advance(Duration::seconds(60));

		let refreshed = harness
			.manager
			.password_access_token(TokenRequest::new("svc1"))
			.await
			.expect("Refresh should succeed.");

		assert_eq!(refreshed.token().map(AccessToken::expose), Some("access-2"));
		assert_eq!(
			harness.endpoint.calls()[1],
			EndpointCall::Refresh { target: "password:svc1".into(), refresh_token: "refresh-1".into() }
		);

		let entry = cached(&harness, "svc1").await;

		assert_eq!(entry.access.expose(), "access-2");
		assert_eq!(entry.refresh_token.expose(), "refresh-1", "Unrotated refresh tokens are kept.");
	}

	#[tokio::test]
	async fn concurrent_refreshes_share_one_exchange() {
		let harness = testing::harness(ManagerOptions::default());

		harness
			.endpoint
			.push(TokenResponse::success("access-1", 60).with_refresh_token("refresh-1"));
		harness
			.manager
			.bootstrap_password_access_token(TokenRequest::new("svc1"))
			.await
			.expect("Bootstrap should succeed.");
		harness.endpoint.set_delay(StdDuration::from_millis(20));
		harness
			.endpoint
			.push(TokenResponse::success("access-2", 3600).with_refresh_token("refresh-2"));

		let outcomes = future::join_all(
			(0..5).map(|_| harness.manager.password_access_token(TokenRequest::new("svc1"))),
		)
		.await;

		for outcome in outcomes {
			assert_eq!(
				outcome
					.expect("Every caller should get an outcome.")
					.token()
					.map(AccessToken::expose),
				Some("access-2")
			);
		}

		assert_eq!(harness.endpoint.call_count(), 2);
		assert_eq!(cached(&harness, "svc1").await.refresh_token.expose(), "refresh-2");
	}

	#[tokio::test]
	async fn misses_fail_unless_bootstrap_is_enabled() {
		let harness = testing::harness(ManagerOptions::default());
		let outcome = harness
			.manager
			.password_access_token(TokenRequest::new("svc1"))
			.await
			.expect("Miss should be an outcome.");

		assert_eq!(outcome, TokenOutcome::Failure(FailureKind::NoCachedGrant));
		assert_eq!(harness.endpoint.call_count(), 0);

		let harness = testing::harness(
			ManagerOptions::default().with_bootstrap_password_grant_on_miss(true),
		);

		harness.endpoint.push(TokenResponse::success("bootstrapped", 3600));

		let outcome = harness
			.manager
			.password_access_token(TokenRequest::new("svc1"))
			.await
			.expect("Bootstrap should succeed.");

		assert_eq!(outcome.token().map(AccessToken::expose), Some("bootstrapped"));
		assert_eq!(
			harness.endpoint.calls(),
			vec![EndpointCall::Password { client: "svc1".into(), login: String::new() }]
		);
		assert!(!cached(&harness, "svc1").await.has_refresh_token());
	}

	#[tokio::test]
	async fn entries_without_refresh_tokens_cannot_refresh() {
		let harness = testing::harness(ManagerOptions::default());

		harness.endpoint.push(TokenResponse::success("access-1", 30));
		harness
			.manager
			.bootstrap_password_access_token(TokenRequest::new("svc1"))
			.await
			.expect("Bootstrap should succeed.");

		let outcome = harness
			.manager
			.password_access_token(TokenRequest::new("svc1"))
			.await
			.expect("Failure should be an outcome.");

		assert_eq!(outcome, TokenOutcome::Failure(FailureKind::MissingRefreshToken));
		assert_eq!(harness.endpoint.call_count(), 1);
	}

	#[tokio::test]
	async fn refresh_errors_keep_the_previous_entry() {
		let harness = testing::harness(ManagerOptions::default());

		harness
			.endpoint
			.push(TokenResponse::success("access-1", 3600).with_refresh_token("refresh-1"));
		harness.endpoint.push(TokenResponse::error("invalid_grant"));
		harness
			.manager
			.password_access_token_with(PasswordCredentials::new("alice", "pw"), TokenRequest::new("svc1"))
			.await
			.expect("Grant should succeed.");

		let outcome = harness
			.manager
			.password_access_token(TokenRequest::new("svc1").force_renewal())
			.await
			.expect("Failure should be an outcome.");

		assert_eq!(
			outcome.failure(),
			Some(&FailureKind::Endpoint { flow: FlowKind::PasswordRefresh, error: "invalid_grant".into() })
		);
		assert_eq!(cached(&harness, "svc1").await.access.expose(), "access-1");
	}

	#[tokio::test]
	async fn deleting_clears_the_cached_grant() {
		let harness = testing::harness(ManagerOptions::default());

		harness
			.endpoint
			.push(TokenResponse::success("access-1", 3600).with_refresh_token("refresh-1"));
		harness
			.manager
			.password_access_token_with(PasswordCredentials::new("alice", "pw"), TokenRequest::new("svc1"))
			.await
			.expect("Grant should succeed.");
		harness
			.manager
			.delete_password_access_token(TokenRequest::new("svc1"))
			.await
			.expect("Delete should succeed.");

		let outcome = harness
			.manager
			.password_access_token(TokenRequest::new("svc1"))
			.await
			.expect("Miss should be an outcome.");

		assert_eq!(outcome, TokenOutcome::Failure(FailureKind::NoCachedGrant));
	}

	#[tokio::test]
	async fn entries_at_the_edge_of_time_are_refreshed() {
		let harness = testing::harness(ManagerOptions::default());

		harness.cache.set_now(
			"oauth2_token_manager::password::svc1",
			br#"{"access_token":"a","expires_at":-377705116800,"refresh_token":"r"}"#.to_vec(),
		);

		let outcome = harness
			.manager
			.password_access_token(TokenRequest::new("svc1"))
			.await
			.expect("Refresh should return an outcome.");

		assert_eq!(outcome.token().map(AccessToken::expose), Some("access-1"));
		assert_eq!(
			harness.endpoint.calls(),
			vec![EndpointCall::Refresh { target: "password:svc1".into(), refresh_token: "r".into() }]
		);
	}

	#[tokio::test]
	async fn every_cached_read_branch_logs_inside_the_flow_span() {
		let coverage = SpanCoverage::default();
		let _guard = tracing::subscriber::set_default(coverage.clone());
		let harness = testing::harness(ManagerOptions::default());
		let miss = harness
			.manager
			.password_access_token(TokenRequest::new("svc1"))
			.await
			.expect("Miss should be an outcome.");

		assert_eq!(miss, TokenOutcome::Failure(FailureKind::NoCachedGrant));

		harness
			.manager
			.password_access_token_with(
				PasswordCredentials::new("alice", "hunter2"),
				TokenRequest::new("svc1"),
			)
			.await
			.expect("Grant should succeed.");

		let before = coverage.inside.load(Ordering::SeqCst);
		let hit = harness
			.manager
			.password_access_token(TokenRequest::new("svc1"))
			.await
			.expect("Hit should be an outcome.");

		assert!(hit.token().is_some());
		assert!(coverage.inside.load(Ordering::SeqCst) > before);
		assert_eq!(coverage.outside.load(Ordering::SeqCst), 0);
	}
}
