// std
use std::{
	env, fs,
	path::PathBuf,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::{Duration as StdDuration, SystemTime, UNIX_EPOCH},
};
// crates.io
use time::{Duration, macros};
// self
use oauth2_token_manager::{
	auth::{
		AccessToken, ClientName, Principal, RefreshableToken, SubjectId, TokenResponse, TokenSecret,
	},
	clock::ManualClock,
	endpoint::{EndpointFuture, PasswordCredentials, RefreshTarget, TokenEndpoint},
	flows::{FailureKind, TokenManager, TokenOutcome, TokenRequest},
	options::ManagerOptions,
	store::{FileCacheStore, MemoryCacheStore, MemoryUserTokenStore},
};

/// Endpoint that answers every exchange with a numbered token after a short delay.
#[derive(Debug, Default)]
struct SlowEndpoint {
	calls: AtomicUsize,
}
impl SlowEndpoint {
	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	fn respond(&self, prefix: &'static str) -> EndpointFuture<'_> {
		let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

		Box::pin(async move {
			tokio::time::sleep(StdDuration::from_millis(50)).await;

			TokenResponse::success(format!("{prefix}-access-{n}"), 3600)
				.with_refresh_token(format!("{prefix}-refresh-{n}"))
		})
	}
}
impl TokenEndpoint for SlowEndpoint {
	fn request_client_credentials_token<'a>(
		&'a self,
		_client: &'a ClientName,
	) -> EndpointFuture<'a> {
		self.respond("client")
	}

	fn request_password_token<'a>(
		&'a self,
		_credentials: &'a PasswordCredentials,
		_client: &'a ClientName,
	) -> EndpointFuture<'a> {
		self.respond("password")
	}

	fn refresh_token<'a>(
		&'a self,
		_refresh_token: &'a TokenSecret,
		target: RefreshTarget<'a>,
	) -> EndpointFuture<'a> {
		match target {
			RefreshTarget::User => self.respond("user"),
			RefreshTarget::Password(_) => self.respond("password"),
		}
	}

	fn revoke_refresh_token<'a>(&'a self, _refresh_token: &'a TokenSecret) -> EndpointFuture<'a> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async { TokenResponse::default() })
	}
}

fn temp_cache_path(name: &str) -> PathBuf {
	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System clock should be after the Unix epoch.")
		.as_nanos();

	env::temp_dir().join(format!("oauth2-token-manager-it-{name}-{nanos}")).join("cache.json")
}

fn alice() -> Principal {
	Principal::new(SubjectId::new("alice").expect("Subject fixture should be valid."))
		.with_name("Alice")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn spawned_tasks_share_one_client_grant() {
	let endpoint = Arc::new(SlowEndpoint::default());
	let manager = TokenManager::new(
		endpoint.clone(),
		Arc::new(MemoryCacheStore::default()),
		ManagerOptions::default(),
	)
	.expect("Manager should build.");
	let handles = (0..16)
		.map(|_| {
			let manager = manager.clone();

			tokio::spawn(
				async move { manager.client_access_token(TokenRequest::new("billing")).await },
			)
		})
		.collect::<Vec<_>>();
	let mut tokens = Vec::new();

	for handle in handles {
		let outcome = handle
			.await
			.expect("Task should not panic.")
			.expect("Client flow should return an outcome.");

		tokens.push(outcome.into_token().expect("Every task should receive a token."));
	}

	assert_eq!(endpoint.calls(), 1);
	assert!(tokens.iter().all(|token| token.expose() == "client-access-1"));
	assert_eq!(manager.metrics().acquisitions(), 1);
	assert_eq!(manager.metrics().joined() + manager.metrics().cache_hits(), 15);
	assert_eq!(manager.in_flight(), 0);
}

#[tokio::test]
async fn password_grants_survive_a_restart_with_the_file_store() {
	let path = temp_cache_path("password");
	let endpoint = Arc::new(SlowEndpoint::default());
	let first = TokenManager::new(
		endpoint.clone(),
		Arc::new(FileCacheStore::open(&path).expect("File store should open.")),
		ManagerOptions::default(),
	)
	.expect("Manager should build.");
	let granted = first
		.password_access_token_with(
			PasswordCredentials::new("alice", "hunter2"),
			TokenRequest::new("portal"),
		)
		.await
		.expect("Password grant should return an outcome.");

	assert_eq!(granted.token().map(AccessToken::expose), Some("password-access-1"));

	let restarted = TokenManager::new(
		endpoint.clone(),
		Arc::new(FileCacheStore::open(&path).expect("File store should reopen.")),
		ManagerOptions::default(),
	)
	.expect("Manager should build.");
	let cached = restarted
		.password_access_token(TokenRequest::new("portal"))
		.await
		.expect("Cached password flow should return an outcome.");

	let (cached, granted) = (
		cached.into_token().expect("Cached grant should be served."),
		granted.into_token().expect("Grant should yield a token."),
	);

	assert_eq!(cached.expose(), granted.expose());
	assert_eq!(cached.expires_at.unix_timestamp(), granted.expires_at.unix_timestamp());
	assert_eq!(endpoint.calls(), 1);
	assert_eq!(restarted.metrics().cache_hits(), 1);

	let _ = fs::remove_dir_all(path.parent().expect("Temp path should have a parent."));
}

#[tokio::test]
async fn user_sessions_refresh_ahead_of_expiry() {
	let now = macros::datetime!(2025-06-01 12:00 UTC);
	let clock = ManualClock::new(now);
	let users = MemoryUserTokenStore::default();
	let endpoint = Arc::new(SlowEndpoint::default());
	let principal = alice();
	let current = principal.clone();

	users.insert(
		&principal,
		RefreshableToken::new(
			AccessToken::new("session-access", now + Duration::seconds(30)),
			"session-refresh",
		),
	);

	let manager = TokenManager::new(
		endpoint.clone(),
		Arc::new(MemoryCacheStore::default()),
		ManagerOptions::default(),
	)
	.expect("Manager should build.")
	.with_user_store(Arc::new(users.clone()))
	.with_clock(Arc::new(clock.clone()))
	.with_principal_accessor(move || Some(current.clone()));
	let (first, second) =
		futures::future::join(manager.user_access_token(false), manager.user_access_token(false))
			.await;
	let first = first.expect("User flow should return an outcome.");

	assert_eq!(first, second.expect("User flow should return an outcome."));
	assert_eq!(first.token().map(AccessToken::expose), Some("user-access-1"));
	assert_eq!(endpoint.calls(), 1);

	let stored = users.get_now(&principal).expect("Session should remain stored.");

	assert_eq!(stored.access.expires_at, now + Duration::hours(1));
	assert_eq!(stored.refresh_token.expose(), "user-refresh-1");

	clock.advance(Duration::minutes(30));

	let served = manager
		.user_access_token(false)
		.await
		.expect("User flow should return an outcome.");

	assert_eq!(served, first);
	assert_eq!(endpoint.calls(), 1);
}

#[tokio::test]
async fn failures_are_reported_as_outcomes() {
	let endpoint = Arc::new(SlowEndpoint::default());
	let manager = TokenManager::new(
		endpoint.clone(),
		Arc::new(MemoryCacheStore::default()),
		ManagerOptions::default(),
	)
	.expect("Manager should build.");

	assert_eq!(
		manager.user_access_token(false).await.expect("User flow should return an outcome."),
		TokenOutcome::Failure(FailureKind::Unauthenticated)
	);
	assert_eq!(
		manager
			.user_access_token_for(&alice(), false)
			.await
			.expect("User flow should return an outcome."),
		TokenOutcome::Failure(FailureKind::NoSession)
	);
	assert_eq!(
		manager
			.password_access_token(TokenRequest::new("portal"))
			.await
			.expect("Password flow should return an outcome."),
		TokenOutcome::Failure(FailureKind::NoCachedGrant)
	);
	assert_eq!(endpoint.calls(), 0);

	manager.revoke_refresh_token().await.expect("Revocation never fails the caller.");

	assert_eq!(endpoint.calls(), 0);
}

#[tokio::test]
async fn options_document_enables_bootstrap_and_widens_the_window() {
	let options = ManagerOptions::from_json_slice(
		br#"{ "refresh_before_expiration": 600, "bootstrap_password_grant_on_miss": true }"#,
	)
	.expect("Options document should parse.");
	let now = macros::datetime!(2025-06-01 12:00 UTC);
	let clock = ManualClock::new(now);
	let endpoint = Arc::new(SlowEndpoint::default());
	let manager = TokenManager::new(
		endpoint.clone(),
		Arc::new(MemoryCacheStore::default()),
		options,
	)
	.expect("Manager should build.")
	.with_clock(Arc::new(clock.clone()));
	let bootstrapped = manager
		.password_access_token(TokenRequest::default())
		.await
		.expect("Bootstrap grant should return an outcome.");

	assert_eq!(bootstrapped.token().map(AccessToken::expose), Some("password-access-1"));

	// 50 minutes in, ten minutes remain: inside the widened window.
	clock.advance(Duration::minutes(50));

	let refreshed = manager
		.password_access_token(TokenRequest::default())
		.await
		.expect("Refresh should return an outcome.");

	assert_eq!(refreshed.token().map(AccessToken::expose), Some("password-access-2"));
	assert_eq!(endpoint.calls(), 2);
}
