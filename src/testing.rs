//! Shared fixtures for unit tests.

// std
use std::{collections::VecDeque, time::Duration as StdDuration};
// crates.io
use time::macros;
// self
use crate::{
	_prelude::*,
	auth::{ClientName, Principal, SubjectId, TokenResponse, TokenSecret},
	clock::ManualClock,
	endpoint::{EndpointFuture, PasswordCredentials, RefreshTarget, TokenEndpoint},
	flows::TokenManager,
	options::ManagerOptions,
	store::{MemoryCacheStore, MemoryUserTokenStore, StoreError, StoreFuture, TokenCacheStore},
};

pub(crate) const T0: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum EndpointCall {
	ClientCredentials(String),
	Password { client: String, login: String },
	Refresh { target: String, refresh_token: String },
	Revoke(String),
}

/// Endpoint double replaying queued responses, falling back to numbered successes.
#[derive(Debug, Default)]
pub(crate) struct ScriptedEndpoint {
	script: Mutex<VecDeque<TokenResponse>>,
	calls: Mutex<Vec<EndpointCall>>,
	delay: Mutex<Option<StdDuration>>,
}
impl ScriptedEndpoint {
	pub(crate) fn push(&self, response: TokenResponse) {
		self.script.lock().push_back(response);
	}

	pub(crate) fn set_delay(&self, delay: StdDuration) {
		*self.delay.lock() = Some(delay);
	}

	pub(crate) fn calls(&self) -> Vec<EndpointCall> {
		self.calls.lock().clone()
	}

	pub(crate) fn call_count(&self) -> usize {
		self.calls.lock().len()
	}

	fn respond(&self, call: EndpointCall) -> EndpointFuture<'_> {
		let n = {
			let mut calls = self.calls.lock();

			calls.push(call);

			calls.len()
		};
		let response = self.script.lock().pop_front().unwrap_or_else(|| {
			TokenResponse::success(format!("access-{n}"), 3600)
				.with_refresh_token(format!("refresh-{n}"))
		});
		let delay = *self.delay.lock();

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			response
		})
	}
}
impl TokenEndpoint for ScriptedEndpoint {
	fn request_client_credentials_token<'a>(
		&'a self,
		client: &'a ClientName,
	) -> EndpointFuture<'a> {
		self.respond(EndpointCall::ClientCredentials(client.to_string()))
	}

	fn request_password_token<'a>(
		&'a self,
		credentials: &'a PasswordCredentials,
		client: &'a ClientName,
	) -> EndpointFuture<'a> {
		self.respond(EndpointCall::Password {
			client: client.to_string(),
			login: credentials.login.clone(),
		})
	}

	fn refresh_token<'a>(
		&'a self,
		refresh_token: &'a TokenSecret,
		target: RefreshTarget<'a>,
	) -> EndpointFuture<'a> {
		let target = match target {
			RefreshTarget::User => "user".to_owned(),
			RefreshTarget::Password(client) => format!("password:{client}"),
		};

		self.respond(EndpointCall::Refresh {
			target,
			refresh_token: refresh_token.expose().to_owned(),
		})
	}

	fn revoke_refresh_token<'a>(&'a self, refresh_token: &'a TokenSecret) -> EndpointFuture<'a> {
		self.respond(EndpointCall::Revoke(refresh_token.expose().to_owned()))
	}
}

/// Cache store whose every operation fails.
#[derive(Debug)]
pub(crate) struct FailingCacheStore;
impl TokenCacheStore for FailingCacheStore {
	fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<Vec<u8>>> {
		Box::pin(async { Err(StoreError::Backend { message: "cache offline".into() }) })
	}

	fn set<'a>(&'a self, _key: &'a str, _value: Vec<u8>) -> StoreFuture<'a, ()> {
		Box::pin(async { Err(StoreError::Backend { message: "cache offline".into() }) })
	}

	fn remove<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async { Err(StoreError::Backend { message: "cache offline".into() }) })
	}
}

pub(crate) struct Harness {
	pub(crate) manager: TokenManager,
	pub(crate) endpoint: Arc<ScriptedEndpoint>,
	pub(crate) cache: MemoryCacheStore,
	pub(crate) users: MemoryUserTokenStore,
	pub(crate) clock: ManualClock,
	current: Arc<Mutex<Option<Principal>>>,
}
impl Harness {
	pub(crate) fn sign_in(&self, subject: &str) -> Principal {
		let principal = principal(subject);

		*self.current.lock() = Some(principal.clone());

		principal
	}
}

pub(crate) fn principal(subject: &str) -> Principal {
	Principal::new(SubjectId::new(subject).expect("Subject fixture should be valid."))
}

pub(crate) fn harness(options: ManagerOptions) -> Harness {
	let cache = MemoryCacheStore::default();

	build(options, Arc::new(cache.clone()), cache)
}

pub(crate) fn harness_with_store(
	options: ManagerOptions,
	store: Arc<dyn TokenCacheStore>,
) -> Harness {
	build(options, store, MemoryCacheStore::default())
}

fn build(
	options: ManagerOptions,
	store: Arc<dyn TokenCacheStore>,
	cache: MemoryCacheStore,
) -> Harness {
	let endpoint = Arc::new(ScriptedEndpoint::default());
	let users = MemoryUserTokenStore::default();
	let clock = ManualClock::new(T0);
	let current = Arc::new(Mutex::new(None::<Principal>));
	let accessor = current.clone();
	let manager = TokenManager::new(endpoint.clone(), store, options)
		.expect("Manager fixture should build.")
		.with_user_store(Arc::new(users.clone()))
		.with_clock(Arc::new(clock.clone()))
		.with_principal_accessor(move || accessor.lock().clone());

	Harness { manager, endpoint, cache, users, clock, current }
}
