//! Tenant trust records and fetched capability documents.

// self
use crate::{
	_prelude::*,
	auth::{ClientKey, SecretString},
	error::ConfigError,
};

/// Storage key the tenant client record is persisted under.
pub const CLIENT_INFO_KEY: &str = "clientInfo";

/// Capability document fetched from a tenant's host platform at install time.
///
/// The document declares where the tenant's endpoints live; the broker cares
/// about the self link (install verification) and the OAuth token endpoint
/// (client-credentials exchanges). Everything else round-trips untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapabilityDocument {
	/// Links block carrying the document's declared identity.
	pub links: DocumentLinks,
	/// Capabilities offered by the tenant's host platform.
	pub capabilities: TenantCapabilities,
	/// Host-declared fields the broker does not interpret.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}
impl CapabilityDocument {
	/// Parses a fetched response body, reporting the JSON path of any failure.
	pub fn from_slice(
		bytes: &[u8],
	) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut deserializer)
	}

	/// Token endpoint declared by the tenant's OAuth provider block.
	pub fn token_endpoint(&self) -> Result<&Url, ConfigError> {
		self.capabilities
			.oauth2_provider
			.as_ref()
			.map(|provider| &provider.token_url)
			.ok_or(ConfigError::MissingTokenEndpoint)
	}
}

/// Links block of a capability document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentLinks {
	/// URL the document claims to live at.
	#[serde(rename = "self")]
	pub self_link: Url,
}

/// Capability block of a tenant capability document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TenantCapabilities {
	/// OAuth endpoints offered by the tenant's authorization server.
	#[serde(rename = "oauth2Provider", skip_serializing_if = "Option::is_none")]
	pub oauth2_provider: Option<OAuth2Provider>,
	/// Host capabilities the broker does not interpret.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

/// OAuth provider endpoints declared in a capability document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OAuth2Provider {
	/// Token endpoint used for client-credentials exchanges.
	#[serde(rename = "tokenUrl")]
	pub token_url: Url,
	/// Authorization endpoint, unused by this broker but preserved.
	#[serde(rename = "authorizationUrl", skip_serializing_if = "Option::is_none")]
	pub authorization_url: Option<Url>,
}

/// One tenant's trust relationship with this add-on.
///
/// Created by the installation handshake after capability verification, read by
/// the token cache and the request authenticator, and removed when the tenant
/// uninstalls. The client key is immutable for the record's whole life.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantClientRecord {
	/// Unique tenant identifier assigned by the host platform.
	pub client_key: ClientKey,
	/// Shared secret used for token exchanges and signed-request verification.
	pub oauth_secret: SecretString,
	/// URL the tenant's capability document was fetched from.
	pub capabilities_url: Url,
	/// Verified capability document snapshot taken at install time.
	pub capabilities_doc: CapabilityDocument,
	/// Tenant group identifier learned from the first token exchange.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub group_id: Option<u64>,
	/// Tenant group name learned from the first token exchange.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub group_name: Option<String>,
}
impl TenantClientRecord {
	/// Assembles a record for a freshly verified installation.
	///
	/// Group metadata stays unset until the first token exchange reports it.
	pub fn new(
		client_key: ClientKey,
		oauth_secret: SecretString,
		capabilities_url: Url,
		capabilities_doc: CapabilityDocument,
	) -> Self {
		Self {
			client_key,
			oauth_secret,
			capabilities_url,
			capabilities_doc,
			group_id: None,
			group_name: None,
		}
	}

	/// Token endpoint this tenant's tokens are minted from.
	pub fn token_endpoint(&self) -> Result<&Url, ConfigError> {
		self.capabilities_doc.token_endpoint()
	}
}
impl Debug for TenantClientRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TenantClientRecord")
			.field("client_key", &self.client_key)
			.field("oauth_secret", &"<redacted>")
			.field("capabilities_url", &self.capabilities_url)
			.field("group_id", &self.group_id)
			.field("group_name", &self.group_name)
			.finish()
	}
}
