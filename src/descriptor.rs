//! The add-on's own capability descriptor.
//!
//! The descriptor is authored by the add-on vendor, served back to the host
//! platform verbatim, and consulted by the broker for two things: the default
//! scope-set requested when callers omit scopes, and the install callback URL
//! whose path the embedding router mounts the handshake under. Loading the
//! descriptor from disk or environment is the embedding service's concern.

// self
use crate::{_prelude::*, auth::ScopeSet, error::ConfigError};

/// Well-known route the host platform fetches descriptors from, relative to the
/// add-on's configured base path.
pub const DESCRIPTOR_PATH: &str = "/atlassian-connect.json";

/// Capability descriptor describing this add-on to the host platform.
///
/// Only the fields the broker consumes are modeled; everything else the vendor
/// declares (webhooks, dialogs, vendor metadata) round-trips through `extra` so
/// serving the descriptor never drops information.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddonDescriptor {
	/// Unique add-on key registered with the host platform.
	pub key: String,
	/// Human-readable add-on name.
	pub name: String,
	/// Descriptor self link.
	pub links: DescriptorLinks,
	/// Capabilities this add-on declares.
	pub capabilities: DeclaredCapabilities,
	/// Vendor-declared fields the broker does not interpret.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}
impl AddonDescriptor {
	/// Tenant-independent scope-set used when a token request omits scopes.
	pub fn default_scopes(&self) -> Result<ScopeSet, ConfigError> {
		let consumer =
			self.capabilities.api_consumer.as_ref().ok_or(ConfigError::MissingDefaultScopes)?;

		if consumer.scopes.is_empty() {
			return Err(ConfigError::MissingDefaultScopes);
		}

		Ok(ScopeSet::new(consumer.scopes.iter().cloned())?)
	}

	/// Path component of the declared install callback URL, if the add-on is
	/// installable. The embedding router mounts the install handler here and the
	/// uninstall handler at `<path>/:oauthId`.
	pub fn install_callback_path(&self) -> Option<&str> {
		self.capabilities.installable.as_ref().map(|installable| installable.callback_url.path())
	}
}

/// Links block of the add-on descriptor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DescriptorLinks {
	/// Canonical URL of this descriptor.
	#[serde(rename = "self")]
	pub self_link: Url,
}

/// Capability block of the add-on descriptor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeclaredCapabilities {
	/// API consumer declaration carrying the default scopes.
	#[serde(rename = "apiConsumer", skip_serializing_if = "Option::is_none")]
	pub api_consumer: Option<ApiConsumer>,
	/// Install handshake declaration.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub installable: Option<Installable>,
	/// Declared capabilities the broker does not interpret.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Scopes this add-on requests when acting as an API consumer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConsumer {
	/// Permission scopes requested for tenant access tokens.
	pub scopes: Vec<String>,
}

/// Install handshake declaration inside the descriptor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Installable {
	/// Absolute URL the host platform will POST install payloads to.
	#[serde(rename = "callbackUrl")]
	pub callback_url: Url,
	/// Installable flags the broker does not interpret.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn descriptor_json() -> serde_json::Value {
		serde_json::json!({
			"key": "com.example.notifier",
			"name": "Example Notifier",
			"description": "Posts example notifications.",
			"links": { "self": "https://addon.example.com/atlassian-connect.json" },
			"capabilities": {
				"apiConsumer": { "scopes": ["send_notification", "view_group"] },
				"installable": {
					"callbackUrl": "https://addon.example.com/installed",
					"allowGlobal": true
				},
				"webhook": [{ "event": "room_message" }]
			}
		})
	}

	#[test]
	fn descriptor_parses_and_round_trips_unknown_fields() {
		let descriptor: AddonDescriptor = serde_json::from_value(descriptor_json())
			.expect("Descriptor fixture should deserialize.");

		assert_eq!(descriptor.key, "com.example.notifier");
		assert!(descriptor.extra.contains_key("description"));
		assert!(descriptor.capabilities.extra.contains_key("webhook"));

		let serialized = serde_json::to_value(&descriptor)
			.expect("Descriptor should serialize back to JSON.");

		assert_eq!(serialized["description"], "Posts example notifications.");
		assert_eq!(serialized["capabilities"]["webhook"][0]["event"], "room_message");
	}

	#[test]
	fn default_scopes_come_from_the_api_consumer_block() {
		let descriptor: AddonDescriptor = serde_json::from_value(descriptor_json())
			.expect("Descriptor fixture should deserialize.");
		let scopes = descriptor.default_scopes().expect("Default scopes should resolve.");

		assert_eq!(scopes.cache_key(), "send_notification|view_group");
	}

	#[test]
	fn missing_api_consumer_is_a_config_error() {
		let mut value = descriptor_json();

		value["capabilities"]
			.as_object_mut()
			.expect("Capabilities fixture should be an object.")
			.remove("apiConsumer");

		let descriptor: AddonDescriptor =
			serde_json::from_value(value).expect("Descriptor fixture should deserialize.");

		assert!(matches!(
			descriptor.default_scopes(),
			Err(ConfigError::MissingDefaultScopes)
		));
	}

	#[test]
	fn install_callback_path_is_the_url_path() {
		let descriptor: AddonDescriptor = serde_json::from_value(descriptor_json())
			.expect("Descriptor fixture should deserialize.");

		assert_eq!(descriptor.install_callback_path(), Some("/installed"));
	}
}
