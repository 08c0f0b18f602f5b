//! Token manager: cache-aside, refresh-ahead acquisition for every supported flow.
//!
//! [`TokenManager`] owns the collaborators (endpoint, caches, user store, principal accessor,
//! clock) and one [`Coordinator`] shared by all of its clones. Each public operation evaluates
//! [`Freshness`] for the relevant entry, answers fresh entries directly, and routes everything
//! else through the coordinator keyed by [`FlowKey`], so concurrent callers for the same key
//! share a single endpoint round-trip.

pub mod common;

mod client_credentials;
mod metrics;
mod password;
mod user;

pub use common::*;
pub use self::metrics::AcquisitionMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientName, Principal, PrincipalAccessor},
	cache::{ClientTokenCache, PasswordTokenCache},
	clock::{Clock, SystemClock},
	coordinator::Coordinator,
	endpoint::TokenEndpoint,
	obs::{self, FlowKind, FlowOutcome},
	options::ManagerOptions,
	store::{MemoryUserTokenStore, TokenCacheStore, UserTokenStore},
};

/// Issues and refreshes access tokens on behalf of callers sharing a process.
///
/// Construct once and clone freely; clones share caches, coordinator, and metrics.
#[derive(Clone)]
pub struct TokenManager {
	endpoint: Arc<dyn TokenEndpoint>,
	client_cache: ClientTokenCache,
	password_cache: PasswordTokenCache,
	user_store: Arc<dyn UserTokenStore>,
	principal_accessor: Option<Arc<dyn PrincipalAccessor>>,
	clock: Arc<dyn Clock>,
	options: Arc<ManagerOptions>,
	metrics: Arc<AcquisitionMetrics>,
	coordinator: Coordinator<FlowKey, TokenOutcome>,
}
impl TokenManager {
	/// Creates a manager over `endpoint`, caching client and password grants in `cache_store`.
	///
	/// User sessions default to an in-memory store and no principal accessor; configure them with
	/// [`TokenManager::with_user_store`] and [`TokenManager::with_principal_accessor`].
	pub fn new(
		endpoint: Arc<dyn TokenEndpoint>,
		cache_store: Arc<dyn TokenCacheStore>,
		options: ManagerOptions,
	) -> Result<Self> {
		options.validate()?;

		Ok(Self {
			endpoint,
			client_cache: ClientTokenCache::new(
				cache_store.clone(),
				options.client_cache_key_prefix.clone(),
			),
			password_cache: PasswordTokenCache::new(
				cache_store,
				options.password_cache_key_prefix.clone(),
			),
			user_store: Arc::new(MemoryUserTokenStore::default()),
			principal_accessor: None,
			clock: Arc::new(SystemClock),
			options: Arc::new(options),
			metrics: Default::default(),
			coordinator: Coordinator::new(),
		})
	}

	/// Replaces the per-user token store.
	pub fn with_user_store(mut self, store: Arc<dyn UserTokenStore>) -> Self {
		self.user_store = store;

		self
	}

	/// Sets the accessor resolving the current principal for user flows.
	pub fn with_principal_accessor(mut self, accessor: impl 'static + PrincipalAccessor) -> Self {
		self.principal_accessor = Some(Arc::new(accessor));

		self
	}

	/// Replaces the clock used for expiry decisions.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Effective options.
	pub fn options(&self) -> &ManagerOptions {
		&self.options
	}

	/// Client-credentials cache used by this manager.
	pub fn client_cache(&self) -> &ClientTokenCache {
		&self.client_cache
	}

	/// Password-grant cache used by this manager.
	pub fn password_cache(&self) -> &PasswordTokenCache {
		&self.password_cache
	}

	/// Shared acquisition counters.
	pub fn metrics(&self) -> &AcquisitionMetrics {
		&self.metrics
	}

	/// Number of coordinated acquisitions currently running.
	pub fn in_flight(&self) -> usize {
		self.coordinator.in_flight()
	}

	fn resolve_client(&self, request: &TokenRequest) -> Result<ClientName> {
		match request.client_name.as_deref() {
			Some(name) => Ok(ClientName::new(name)?),
			None => self.options.default_client(),
		}
	}

	fn current_principal(&self) -> Option<Principal> {
		self.principal_accessor.as_ref().and_then(|accessor| accessor.current_principal())
	}

	fn serve_cached(&self, kind: FlowKind, token: AccessToken) -> TokenOutcome {
		self.metrics.record_cache_hit();
		obs::record_flow_outcome(kind, FlowOutcome::CacheHit);

		TokenOutcome::Token(token)
	}

	fn fail(&self, kind: FlowKind, failure: FailureKind) -> TokenOutcome {
		obs::record_flow_outcome(kind, FlowOutcome::Failure);

		TokenOutcome::Failure(failure)
	}

	/// Runs `producer` under the coordinator unless an acquisition for `key` is already in
	/// flight, in which case this call waits for that one instead.
	async fn coordinate<F, Fut>(&self, key: FlowKey, producer: F) -> TokenOutcome
	where
		F: FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = TokenOutcome>,
	{
		let kind = key.flow;
		let flight = self.coordinator.acquire(key, producer);

		if !flight.is_leader() {
			self.metrics.record_joined();
			tracing::debug!(flow = %kind, "Joining in-flight token request.");
		}

		let outcome = flight.await;

		match &outcome {
			TokenOutcome::Token(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
			TokenOutcome::Failure(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
		}

		outcome
	}

	/// Bookkeeping for a producer whose endpoint call failed.
	fn endpoint_failure(&self, flow: FlowKind, error: &str) -> TokenOutcome {
		self.metrics.record_failure();

		TokenOutcome::Failure(FailureKind::Endpoint { flow, error: error.to_owned() })
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("options", &self.options)
			.field("client_cache", &self.client_cache)
			.field("password_cache", &self.password_cache)
			.field("principal_accessor_set", &self.principal_accessor.is_some())
			.field("in_flight", &self.coordinator.in_flight())
			.finish()
	}
}
