//! Installation and uninstallation handshake with the host platform.
//!
//! Install is the one moment a tenant's credentials enter the system, so the
//! handshake is strict: the capability document must prove its identity (its
//! declared self link must equal the URL it was fetched from), the supplied
//! secret must survive a real token exchange, and only then does the assembled
//! record reach the credential store. Any earlier failure leaves no partial
//! record behind.

// self
use crate::{
	_prelude::*,
	auth::{ClientKey, SecretString},
	cache::TokenCache,
	error::{TransientError, VerificationError},
	events::{LifecycleEvent, LifecycleSink},
	http::HttpTransport,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{self, CredentialStore},
	tenant::{CLIENT_INFO_KEY, CapabilityDocument, TenantClientRecord},
};

/// Install callback body POSTed by the host platform.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallPayload {
	/// OAuth client identifier assigned to the new tenant.
	pub oauth_id: String,
	/// Shared secret paired with the client identifier.
	pub oauth_secret: String,
	/// URL of the tenant's capability document.
	pub capabilities_url: Url,
}
impl InstallPayload {
	/// Payload copy safe to hand to event subscribers (secret omitted).
	fn public_payload(&self) -> serde_json::Value {
		serde_json::json!({
			"oauthId": self.oauth_id,
			"capabilitiesUrl": self.capabilities_url,
		})
	}
}
impl Debug for InstallPayload {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InstallPayload")
			.field("oauth_id", &self.oauth_id)
			.field("oauth_secret", &"<redacted>")
			.field("capabilities_url", &self.capabilities_url)
			.finish()
	}
}

/// Drives the install/uninstall trust handshake for tenants.
pub struct InstallationHandshake {
	store: Arc<dyn CredentialStore>,
	cache: TokenCache,
	transport: HttpTransport,
	events: Arc<dyn LifecycleSink>,
}
impl InstallationHandshake {
	/// Creates a handshake wired to its collaborators.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		cache: TokenCache,
		transport: HttpTransport,
		events: Arc<dyn LifecycleSink>,
	) -> Self {
		Self { store, cache, transport, events }
	}

	/// Handles one install callback from the host platform.
	///
	/// On success the tenant record (including group metadata from the first
	/// token exchange) is persisted and `installed`, `plugin_enabled`, and
	/// `host_settings_saved` fire in that order, the last only after the store
	/// acknowledged the write. The embedding handler answers `204` on `Ok` and
	/// `500` with the error message otherwise.
	pub async fn handle_install(&self, payload: InstallPayload) -> Result<()> {
		const KIND: FlowKind = FlowKind::Install;

		let span = FlowSpan::new(KIND, "handle_install");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let document = self.verify_installation(&payload.capabilities_url).await?;
				let client_key =
					ClientKey::new(&payload.oauth_id).map_err(crate::error::ConfigError::from)?;
				let mut record = TenantClientRecord::new(
					client_key.clone(),
					SecretString::new(payload.oauth_secret.clone()),
					payload.capabilities_url.clone(),
					document,
				);

				// First exchange proves the secret works end-to-end and reports
				// the tenant's group metadata.
				let first_token = self.cache.get_token(&record, None).await?;

				record.group_id = first_token.group_id;
				record.group_name = first_token.group_name.clone();

				self.events.emit(LifecycleEvent::Installed {
					tenant: client_key.clone(),
					client: Box::new(record.clone()),
					payload: payload.public_payload(),
				});
				self.events.emit(LifecycleEvent::PluginEnabled {
					tenant: client_key.clone(),
					client: Box::new(record.clone()),
				});

				store::save(self.store.as_ref(), CLIENT_INFO_KEY, &record, &client_key).await?;

				let settings = serde_json::to_value(&record).map_err(|err| {
					crate::store::StoreError::Serialization { message: err.to_string() }
				})?;

				self.events
					.emit(LifecycleEvent::HostSettingsSaved { tenant: client_key, settings });

				Ok(())
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Handles one uninstall callback for the tenant.
	///
	/// Emits `uninstalled` first so subscribers observe the tenant while its
	/// context still exists, then purges every stored key synchronously; the
	/// authenticator can never resolve a tenant whose uninstall has completed.
	pub async fn handle_uninstall(&self, tenant: &ClientKey) -> Result<()> {
		const KIND: FlowKind = FlowKind::Uninstall;

		let span = FlowSpan::new(KIND, "handle_uninstall");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.events.emit(LifecycleEvent::Uninstalled { tenant: tenant.clone() });
				self.store.purge(tenant).await?;

				Ok(())
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Fetches the tenant capability document and verifies its identity.
	async fn verify_installation(&self, url: &Url) -> Result<CapabilityDocument> {
		let fetched = self.transport.fetch(url).await?;

		if !fetched.is_success() {
			return Err(TransientError::CapabilityEndpoint { status: fetched.status }.into());
		}

		let document = CapabilityDocument::from_slice(&fetched.body)
			.map_err(|source| TransientError::CapabilityParse { source })?;

		if document.links.self_link != *url {
			return Err(VerificationError::SelfLinkMismatch {
				fetched: url.to_string(),
				declared: document.links.self_link.to_string(),
			}
			.into());
		}

		Ok(document)
	}
}
impl Debug for InstallationHandshake {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InstallationHandshake").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn install_payload_parses_the_callback_body() {
		let payload: InstallPayload = serde_json::from_value(serde_json::json!({
			"oauthId": "tenant-1",
			"oauthSecret": "shared-secret",
			"capabilitiesUrl": "https://tenant.example.com/v2/capabilities"
		}))
		.expect("Install payload fixture should deserialize.");

		assert_eq!(payload.oauth_id, "tenant-1");
		assert_eq!(payload.capabilities_url.path(), "/v2/capabilities");
	}

	#[test]
	fn payload_debug_and_events_omit_the_secret() {
		let payload: InstallPayload = serde_json::from_value(serde_json::json!({
			"oauthId": "tenant-1",
			"oauthSecret": "shared-secret",
			"capabilitiesUrl": "https://tenant.example.com/v2/capabilities"
		}))
		.expect("Install payload fixture should deserialize.");

		assert!(!format!("{payload:?}").contains("shared-secret"));

		let public = payload.public_payload();

		assert_eq!(public["oauthId"], "tenant-1");
		assert!(public.get("oauthSecret").is_none());
	}
}
