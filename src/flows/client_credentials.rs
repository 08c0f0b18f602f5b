//! Client-credentials flow.
//!
//! Client tokens have no refresh-ahead window: a cached token is served until its expiry instant
//! and only then (or on forced renewal) does a coordinated grant run. Successful grants are
//! written through to the client cache; endpoint errors are logged and never cached.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientName},
	flows::{FlowKey, Freshness, TokenManager, TokenOutcome, TokenRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl TokenManager {
	/// Returns a client-credentials access token for the requested client.
	///
	/// Fails with [`Error::InvalidArgument`] when the client name is empty or malformed.
	pub async fn client_access_token(&self, request: TokenRequest) -> Result<TokenOutcome> {
		const KIND: FlowKind = FlowKind::ClientCredentials;

		let client = self.resolve_client(&request)?;
		let span = FlowSpan::new(KIND, "client_access_token");
		let outcome = span
			.instrument(async move {
				obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

				let force = request.force_renewal;
				let cached = self.read_client_cache(&client).await;
				let freshness = Freshness::evaluate(
					cached.as_ref().map(|token| token.expires_at),
					self.clock.now(),
					Duration::ZERO,
					force,
				);

				if let (Freshness::Fresh, Some(token)) = (freshness, cached) {
					return self.serve_cached(KIND, token);
				}

				tracing::debug!(
					client = %client,
					?freshness,
					force,
					"Requesting client access token."
				);

				let key = FlowKey::new(KIND, client.as_str());
				let manager = self.clone();

				self.coordinate(key, move || async move {
					manager.acquire_client_token(client, force).await
				})
				.await
			})
			.await;

		Ok(outcome)
	}

	/// Removes the cached client token so the next call acquires a new one.
	pub async fn delete_client_access_token(&self, request: TokenRequest) -> Result<()> {
		let client = self.resolve_client(&request)?;

		self.client_cache.delete(client.as_str()).await
	}

	async fn read_client_cache(&self, client: &ClientName) -> Option<AccessToken> {
		match self.client_cache.get(client.as_str()).await {
			Ok(token) => token,
			Err(e) => {
				tracing::warn!(
					client = %client,
					error = %e,
					"Failed to read the client token cache; treating it as a miss."
				);

				None
			},
		}
	}

	async fn acquire_client_token(&self, client: ClientName, force: bool) -> TokenOutcome {
		self.metrics.record_acquisition();

		if !force
			&& let Some(token) = self
				.read_client_cache(&client)
				.await
				.filter(|token| !token.is_expired_at(self.clock.now()))
		{
			return TokenOutcome::Token(token);
		}

		let response = self.endpoint.request_client_credentials_token(&client).await;

		if response.is_error() {
			tracing::error!(
				client = %client,
				error = response.error_message(),
				"Error requesting access token for client."
			);

			return self.endpoint_failure(FlowKind::ClientCredentials, response.error_message());
		}

		let token =
			AccessToken::from_grant(response.access_token, response.expires_in, self.clock.now());

		if let Err(e) = self.client_cache.set(client.as_str(), &token).await {
			tracing::error!(
				client = %client,
				error = %e,
				"Failed to cache the client access token."
			);
		}

		TokenOutcome::Token(token)
	}
}
