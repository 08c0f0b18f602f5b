//! Demonstrates the client-credentials flow against a mock token endpoint: the first call runs the
//! grant, the second is answered from the cache.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use oauth2_token_manager::{
	auth::ClientName,
	endpoint::{ClientConfiguration, EndpointConfiguration, OAuth2TokenEndpoint},
	flows::{TokenManager, TokenOutcome, TokenRequest},
	http::ReqwestHttpClient,
	options::ManagerOptions,
	reqwest::{Client, redirect::Policy},
	store::MemoryCacheStore,
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let config = EndpointConfiguration::default().with_client(
		ClientName::new("billing")?,
		ClientConfiguration::new(Url::parse(&server.url("/token"))?, "demo-client")
			.with_client_secret("super-secret")
			.with_scope(["invoices.read"]),
	);
	// The mock server presents a self-signed certificate.
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(Policy::none())
			.build()?,
	);
	let manager = TokenManager::new(
		Arc::new(OAuth2TokenEndpoint::with_http_client(config, http_client)),
		Arc::new(MemoryCacheStore::default()),
		ManagerOptions::default(),
	)?;

	for attempt in 1..=2 {
		match manager.client_access_token(TokenRequest::new("billing")).await? {
			TokenOutcome::Token(token) => println!(
				"Attempt {attempt}: access token {} valid until {}.",
				token.expose(),
				token.expires_at
			),
			TokenOutcome::Failure(failure) => println!("Attempt {attempt}: {failure}."),
		}
	}

	println!("Cache hits: {}.", manager.metrics().cache_hits());

	token_mock.assert_async().await;

	Ok(())
}
