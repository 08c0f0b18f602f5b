//! Crate-level error types for contract violations and configuration problems.
//!
//! Runtime acquisition failures (endpoint errors, missing sessions, unreadable stores) are not
//! errors here: they are reported as [`TokenOutcome::Failure`](crate::flows::TokenOutcome) so
//! callers can keep serving requests. Only faults a caller must fix surface as [`Error`].

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Empty or malformed identifier passed where a key is required.
	#[error("Invalid argument: {0}")]
	InvalidArgument(#[from] crate::auth::IdentifierError),
	/// Storage-layer failure outside of token acquisition (e.g. deleting an entry).
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Returns `true` for caller contract violations (invalid keys).
	pub fn is_invalid_argument(&self) -> bool {
		matches!(self, Self::InvalidArgument(_))
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// An endpoint URL cannot be used by the OAuth client.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Options or endpoint configuration document could not be parsed.
	#[error("Configuration document is invalid at `{path}`.")]
	InvalidDocument {
		/// JSON path of the offending value.
		path: String,
		/// Underlying JSON failure.
		#[source]
		source: serde_json::Error,
	},
	/// No token client is configured under the requested name.
	#[error("No token client is configured for `{client}`.")]
	UnknownClient {
		/// Requested client name.
		client: String,
	},
	/// User flows need a user client configuration.
	#[error("No user token client is configured.")]
	MissingUserClient,
	/// Refresh-ahead window is longer than any token lifetime the manager honors.
	#[error("Refresh window of {seconds}s exceeds the {max}s limit.")]
	RefreshWindowOutOfRange {
		/// Configured window in seconds.
		seconds: i64,
		/// Largest accepted window in seconds.
		max: i64,
	},
	/// Revocation was requested but the client has no revocation endpoint.
	#[error("No revocation endpoint is configured.")]
	MissingRevocationEndpoint,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Captures the JSON path of a deserialization failure.
	pub fn invalid_document(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = err.path().to_string();

		Self::InvalidDocument { path, source: err.into_inner() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Deserializes a JSON document, reporting the failing path on error.
pub(crate) fn from_json_slice<T>(
	bytes: &[u8],
) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
where
	T: serde::de::DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(&mut de)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{auth::ClientName, store::StoreError};

	#[test]
	fn identifier_errors_are_invalid_arguments() {
		let err: Error = ClientName::new("")
			.expect_err("Empty client names must be rejected.")
			.into();

		assert!(err.is_invalid_argument());
		assert_eq!(err.to_string(), "Invalid argument: Client identifier cannot be empty.");
	}

	#[test]
	fn store_error_keeps_source() {
		let store_error = StoreError::Backend { message: "redis unreachable".into() };
		let err: Error = store_error.clone().into();

		assert!(!err.is_invalid_argument());
		assert!(err.to_string().contains("redis unreachable"));

		let source = StdError::source(&err).expect("Store errors should be exposed as the source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn invalid_document_reports_path() {
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Doc {
			inner: Inner,
		}
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Inner {
			count: u32,
		}

		let err = from_json_slice::<Doc>(br#"{"inner":{"count":"many"}}"#)
			.expect_err("Strings are not counts.");

		match ConfigError::invalid_document(err) {
			ConfigError::InvalidDocument { path, .. } => assert_eq!(path, "inner.count"),
			other => panic!("Unexpected error: {other:?}"),
		}
	}
}
