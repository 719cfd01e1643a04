//! Broker-level error types shared across the handshake, cache, and authenticator.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Unexpected upstream response; safe to re-invoke the operation.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Capability document failed install verification.
	#[error(transparent)]
	Verification(#[from] VerificationError),
	/// Inbound request could not be authenticated.
	#[error(transparent)]
	Unverifiable(#[from] UnverifiableRequest),

	/// Authorization server returned a well-formed error response.
	#[error("Authorization server rejected the exchange: {reason}.")]
	Rejected {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
}
impl Error {
	/// HTTP status the embedding handler layer should answer with.
	///
	/// Authentication-shape failures are client errors; everything else (storage,
	/// remote exchanges, verification) surfaces as a server-side failure per the
	/// install/uninstall callback contract.
	pub fn http_status(&self) -> u16 {
		match self {
			Self::Unverifiable(_) => 400,
			_ => 500,
		}
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Tenant capability document declares an unusable token endpoint.
	#[error("Capability document token endpoint is invalid.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Tenant capability document declares no OAuth token endpoint at all.
	#[error("Capability document declares no oauth2Provider token endpoint.")]
	MissingTokenEndpoint,

	/// The add-on descriptor declares no API consumer scopes to fall back on.
	#[error("Descriptor declares no default API consumer scopes.")]
	MissingDefaultScopes,
	/// Install payload carries an unusable OAuth client identifier.
	#[error("Install payload client identifier is invalid.")]
	InvalidClientKey(#[from] crate::auth::ClientKeyError),
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Unexpected upstream responses (safe to re-invoke; the broker never retries itself).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider- or broker-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Capability endpoint answered with a non-success status.
	#[error("Capability endpoint returned status {status}.")]
	CapabilityEndpoint {
		/// HTTP status code reported by the host platform.
		status: u16,
	},
	/// Capability endpoint responded with a body that is not a capability document.
	#[error("Capability endpoint returned a malformed document.")]
	CapabilityParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the remote endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the remote endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Install-time verification failures.
///
/// A capability document whose declared identity disagrees with the URL it was
/// fetched from signals a redirect/substitution attack; the handshake aborts
/// before anything touches the credential store.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum VerificationError {
	/// The document's self link does not match the URL used to fetch it.
	#[error("The capabilities URL {fetched} does not match the document's self link {declared}.")]
	SelfLinkMismatch {
		/// URL the broker actually fetched.
		fetched: String,
		/// Self link declared inside the fetched document.
		declared: String,
	},
}

/// Authentication failures for inbound tenant requests.
///
/// Every variant maps to a `400` at the HTTP boundary; the request either proves
/// its tenant identity or it is rejected, with no retry inside the broker.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum UnverifiableRequest {
	/// No stored client record exists for the claimed issuer.
	#[error("Request cannot be verified without a stored secret for tenant {tenant}.")]
	UnknownTenant {
		/// Tenant key claimed by the request.
		tenant: String,
	},
	/// The signed token could not be decoded at all.
	#[error("Signed request is malformed: {detail}.")]
	MalformedToken {
		/// Decoder failure detail.
		detail: String,
	},
	/// Signature verification against the tenant secret failed.
	#[error("Signed request failed verification: {detail}.")]
	BadSignature {
		/// Verifier failure detail.
		detail: String,
	},
	/// The request carries neither a signed token nor a session identity.
	#[error("Request is not signed and carries no session identity.")]
	NoIdentity,
}
