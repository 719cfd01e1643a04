//! Inbound request authentication for tenant traffic.
//!
//! Two mutually exclusive paths, chosen by request shape. A signed request is
//! decoded twice on purpose: the first, unverified decode exists only because
//! the verifying secret is unknown until the issuer claim names the tenant.
//! Nothing from that peek is trusted for anything except the record lookup;
//! every authorization-relevant claim comes from the verified decode. The
//! session path trusts a plain identifier and must only be mounted behind a
//! channel that is already authenticated by other means.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
// self
use crate::{
	_prelude::*,
	auth::ClientKey,
	error::UnverifiableRequest,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{self, CredentialStore},
	tenant::{CLIENT_INFO_KEY, TenantClientRecord},
};

/// Body field carrying the tenant identifier on the trusted-session path.
pub const SESSION_CLIENT_ID_FIELD: &str = "oauth_client_id";

/// Framework-agnostic view of one inbound request.
///
/// The embedding handler extracts the `signed_request` query parameter and the
/// decoded JSON body; the broker never sees the HTTP request itself.
#[derive(Clone, Debug, Default)]
pub struct InboundRequest {
	/// Signed token from the `signed_request` query parameter, if present.
	pub signed_request: Option<String>,
	/// Decoded request body.
	pub body: serde_json::Value,
}
impl InboundRequest {
	/// Request carrying a signed token.
	pub fn signed(token: impl Into<String>) -> Self {
		Self { signed_request: Some(token.into()), body: serde_json::Value::Null }
	}

	/// Request carrying only a JSON body (trusted-session shape).
	pub fn session(body: serde_json::Value) -> Self {
		Self { signed_request: None, body }
	}
}

/// Identity and context attached to a request once authentication succeeds.
///
/// Owned by the request being handled and discarded with it.
#[derive(Clone, Debug)]
pub struct AuthenticatedContext {
	/// Resolved tenant client record.
	pub client: TenantClientRecord,
	/// Tenant-supplied context payload (verified claims or raw session body).
	pub context: serde_json::Value,
}

#[derive(Deserialize)]
struct SignedClaims {
	iss: String,
	#[serde(default)]
	context: serde_json::Value,
}

/// Gate for inbound tenant requests.
#[derive(Clone)]
pub struct RequestAuthenticator {
	store: Arc<dyn CredentialStore>,
}
impl RequestAuthenticator {
	/// Creates an authenticator over the credential store.
	pub fn new(store: Arc<dyn CredentialStore>) -> Self {
		Self { store }
	}

	/// Authenticates one inbound request.
	///
	/// Every exit is terminal: either the resolved context is returned for
	/// downstream handling, or an error maps to a response through
	/// [`Error::http_status`](crate::error::Error::http_status). Storage
	/// failures stay server errors and are never conflated with an unknown
	/// tenant.
	pub async fn authenticate(&self, request: &InboundRequest) -> Result<AuthenticatedContext> {
		const KIND: FlowKind = FlowKind::Authenticate;

		let span = FlowSpan::new(KIND, "authenticate");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if let Some(token) = &request.signed_request {
					return self.authenticate_signed(token).await;
				}
				if let Some(client_id) =
					request.body.get(SESSION_CLIENT_ID_FIELD).and_then(|value| value.as_str())
				{
					return self.authenticate_session(client_id, &request.body).await;
				}

				Err(UnverifiableRequest::NoIdentity.into())
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn authenticate_signed(&self, token: &str) -> Result<AuthenticatedContext> {
		let issuer = peek_issuer(token)?;
		let tenant = ClientKey::new(&issuer).map_err(|err| UnverifiableRequest::MalformedToken {
			detail: format!("issuer claim: {err}"),
		})?;
		let Some(client) =
			store::load::<TenantClientRecord>(self.store.as_ref(), CLIENT_INFO_KEY, &tenant)
				.await?
		else {
			return Err(UnverifiableRequest::UnknownTenant { tenant: issuer }.into());
		};
		let claims = verify_signed(token, client.oauth_secret.expose())?;

		if claims.iss != *client.client_key {
			return Err(UnverifiableRequest::BadSignature {
				detail: "issuer claim does not match the verified tenant".into(),
			}
			.into());
		}

		Ok(AuthenticatedContext { client, context: claims.context })
	}

	async fn authenticate_session(
		&self,
		client_id: &str,
		body: &serde_json::Value,
	) -> Result<AuthenticatedContext> {
		let tenant = ClientKey::new(client_id).map_err(|_| UnverifiableRequest::UnknownTenant {
			tenant: client_id.to_owned(),
		})?;
		let Some(client) =
			store::load::<TenantClientRecord>(self.store.as_ref(), CLIENT_INFO_KEY, &tenant)
				.await?
		else {
			return Err(
				UnverifiableRequest::UnknownTenant { tenant: client_id.to_owned() }.into()
			);
		};

		Ok(AuthenticatedContext { client, context: body.clone() })
	}
}
impl Debug for RequestAuthenticator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestAuthenticator").finish_non_exhaustive()
	}
}

/// Extracts the issuer claim without verifying the signature.
///
/// Used exclusively to pick the tenant whose secret verifies the token; the
/// decoded payload is dropped immediately afterwards.
fn peek_issuer(token: &str) -> Result<String, UnverifiableRequest> {
	let segments: Vec<&str> = token.split('.').collect();
	let [_, payload, _] = segments.as_slice() else {
		return Err(malformed("token does not have three segments"));
	};
	let bytes = URL_SAFE_NO_PAD
		.decode(*payload)
		.map_err(|err| malformed(format!("payload segment: {err}")))?;
	let claims: serde_json::Value = serde_json::from_slice(&bytes)
		.map_err(|err| malformed(format!("payload JSON: {err}")))?;

	claims
		.get("iss")
		.and_then(|value| value.as_str())
		.map(str::to_owned)
		.ok_or_else(|| malformed("missing iss claim"))
}

fn verify_signed(token: &str, secret: &str) -> Result<SignedClaims, UnverifiableRequest> {
	let mut validation = Validation::new(Algorithm::HS256);

	validation.validate_aud = false;

	jsonwebtoken::decode::<SignedClaims>(
		token,
		&DecodingKey::from_secret(secret.as_bytes()),
		&validation,
	)
	.map(|data| data.claims)
	.map_err(|err| UnverifiableRequest::BadSignature { detail: err.to_string() })
}

fn malformed(detail: impl Into<String>) -> UnverifiableRequest {
	UnverifiableRequest::MalformedToken { detail: detail.into() }
}
