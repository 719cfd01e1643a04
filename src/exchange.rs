//! Client-credentials exchanges against per-tenant token endpoints.
//!
//! Unlike a classic single-provider OAuth client, the token endpoint here is
//! discovered dynamically from each tenant's verified capability document and
//! is never hardcoded. Every exchange authenticates with the tenant's client
//! key/secret over HTTP Basic, posts `grant_type=client_credentials` plus the
//! space-joined scope list, and stamps the resulting token with a local
//! acquisition instant so expiry checks never trust remote clocks.

// crates.io
use oauth2::{
	Client, ClientId, ClientSecret, EndpointNotSet, ExtraTokenFields, HttpClientError,
	RequestTokenError, Scope, StandardRevocableToken, StandardTokenResponse, TokenResponse,
	TokenUrl,
	basic::{
		BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
		BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{CachedToken, ScopeSet, SecretString},
	error::{ConfigError, TransientError, TransportError},
	http::{HttpTransport, ResponseMetadata, ResponseMetadataSlot},
	tenant::TenantClientRecord,
};

/// Group metadata appended to token responses by the host platform's
/// authorization server. Both fields are optional on the wire.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GroupExtraFields {
	/// Organizational group identifier for the tenant.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub group_id: Option<u64>,
	/// Organizational group name for the tenant.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub group_name: Option<String>,
}
impl ExtraTokenFields for GroupExtraFields {}

/// Token response shape including the platform's group extra fields.
pub type GroupTokenResponse = StandardTokenResponse<GroupExtraFields, BasicTokenType>;

// Unconfigured client; `set_token_uri` moves the token endpoint typestate to
// `EndpointSet`, which is all `exchange_client_credentials` requires.
type ExchangeClient = Client<
	BasicErrorResponse,
	GroupTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
>;
type ExchangeRequestError = RequestTokenError<HttpClientError<ReqwestError>, BasicErrorResponse>;

/// Performs out-of-band credential exchanges with tenant authorization servers.
#[derive(Clone, Debug)]
pub struct TokenAcquirer {
	transport: HttpTransport,
}
impl TokenAcquirer {
	/// Creates an acquirer over the provided transport.
	pub fn new(transport: HttpTransport) -> Self {
		Self { transport }
	}

	/// Mints one scoped access token for the tenant.
	///
	/// No caching happens at this layer; callers own storage and reuse.
	pub async fn acquire(
		&self,
		tenant: &TenantClientRecord,
		scope: &ScopeSet,
	) -> Result<CachedToken> {
		let token_url = TokenUrl::new(tenant.token_endpoint()?.to_string())
			.map_err(|source| ConfigError::InvalidTokenEndpoint { source })?;
		let client = ExchangeClient::new(ClientId::new(tenant.client_key.to_string()))
			.set_client_secret(ClientSecret::new(tenant.oauth_secret.expose().to_owned()))
			.set_token_uri(token_url);
		let slot = ResponseMetadataSlot::default();
		let handle = self.transport.metered(slot.clone());
		let mut request = client.exchange_client_credentials();

		for scope in scope.iter() {
			request = request.add_scope(Scope::new(scope.to_owned()));
		}

		let response = request
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(slot.take(), err))?;

		into_cached_token(scope, response)
	}
}

fn into_cached_token(scope: &ScopeSet, response: GroupTokenResponse) -> Result<CachedToken> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	let extra = response.extra_fields();

	Ok(CachedToken {
		access_token: SecretString::new(response.access_token().secret().to_owned()),
		token_type: token_type_label(&response),
		expires_in: Duration::seconds(expires_in),
		created_at: OffsetDateTime::now_utc(),
		scope_key: scope.cache_key(),
		group_id: extra.group_id,
		group_name: extra.group_name.clone(),
	})
}

// `BasicTokenType` serializes to its RFC string form (`bearer`, `mac`, or the
// extension value), which is exactly the label stored alongside the token.
fn token_type_label(response: &GroupTokenResponse) -> String {
	serde_json::to_value(response.token_type())
		.ok()
		.and_then(|value| value.as_str().map(str::to_owned))
		.unwrap_or_else(|| "bearer".to_owned())
}

fn map_request_error(meta: Option<ResponseMetadata>, err: ExchangeRequestError) -> Error {
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => {
			let reason = match response.error_description() {
				Some(description) =>
					format!("{} ({description})", response.error().as_ref()),
				None => response.error().as_ref().to_owned(),
			};

			Error::Rejected { reason }
		},
		RequestTokenError::Request(error) => map_transport_error(status, error),
		RequestTokenError::Parse(source, _body) =>
			TransientError::TokenResponseParse { source, status }.into(),
		RequestTokenError::Other(message) =>
			TransientError::TokenEndpoint { message, status }.into(),
	}
}

fn map_transport_error(status: Option<u16>, err: HttpClientError<ReqwestError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => map_reqwest_error(status, *inner),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) =>
			TransientError::TokenEndpoint { message, status }.into(),
		_ => TransientError::TokenEndpoint {
			message: "HTTP client reported an unrecognized failure".into(),
			status,
		}
		.into(),
	}
}

fn map_reqwest_error(status: Option<u16>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::TokenEndpoint {
			message: "request timed out while calling the token endpoint".into(),
			status: status.or_else(|| err.status().map(|code| code.as_u16())),
		}
		.into();
	}

	TransportError::from(err).into()
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::AccessToken;
	// self
	use super::*;

	fn response(expires_in: Option<u64>) -> GroupTokenResponse {
		let mut response = GroupTokenResponse::new(
			AccessToken::new("minted-token".into()),
			BasicTokenType::Bearer,
			GroupExtraFields { group_id: Some(17), group_name: Some("Example Group".into()) },
		);

		if let Some(secs) = expires_in {
			response.set_expires_in(Some(&std::time::Duration::from_secs(secs)));
		}

		response
	}

	#[test]
	fn token_is_stamped_locally_and_carries_group_metadata() {
		let scope = ScopeSet::new(["view_group", "send_notification"])
			.expect("Scope fixture should be valid.");
		let before = OffsetDateTime::now_utc();
		let token = into_cached_token(&scope, response(Some(3600)))
			.expect("Well-formed response should convert.");

		assert_eq!(token.access_token.expose(), "minted-token");
		assert_eq!(token.token_type, "bearer");
		assert_eq!(token.expires_in, Duration::seconds(3600));
		assert_eq!(token.scope_key, "send_notification|view_group");
		assert_eq!(token.group_id, Some(17));
		assert_eq!(token.group_name.as_deref(), Some("Example Group"));
		assert!(token.created_at >= before, "created_at is stamped by the broker, not the server.");
	}

	#[test]
	fn missing_expiry_is_rejected() {
		let scope = ScopeSet::new(["view_group"]).expect("Scope fixture should be valid.");
		let err = into_cached_token(&scope, response(None))
			.expect_err("A response without expires_in must not convert.");

		assert!(matches!(err, Error::Config(ConfigError::MissingExpiresIn)));
	}

	#[test]
	fn extra_fields_tolerate_absent_group_metadata() {
		let fields: GroupExtraFields = serde_json::from_str("{}")
			.expect("Extra fields should deserialize from an empty object.");

		assert_eq!(fields.group_id, None);
		assert_eq!(fields.group_name, None);
	}
}
