//! Credential storage contract and typed persistence helpers.
//!
//! The broker only relies on the narrow per-tenant key-value contract below;
//! durable backends (Redis, SQL, platform settings services) live outside this
//! crate. [`MemoryStore`] ships for tests and demos.

pub mod memory;

pub use memory::MemoryStore;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, auth::ClientKey};

/// Persistence contract future for credential stores.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Per-tenant key-value contract implemented by credential backends.
///
/// Values are opaque JSON: the broker stores access tokens under scope cache
/// keys and the tenant client record under [`CLIENT_INFO_KEY`](crate::tenant::CLIENT_INFO_KEY).
/// Writes replace whole values; there is no merge.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the value stored under `key` for the tenant.
	fn set<'a>(
		&'a self,
		key: &'a str,
		value: serde_json::Value,
		tenant: &'a ClientKey,
	) -> StoreFuture<'a, ()>;

	/// Fetches the value stored under `key` for the tenant, if present.
	fn get<'a>(
		&'a self,
		key: &'a str,
		tenant: &'a ClientKey,
	) -> StoreFuture<'a, Option<serde_json::Value>>;

	/// Removes every value stored for the tenant.
	fn purge<'a>(&'a self, tenant: &'a ClientKey) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`CredentialStore`] implementations and the typed
/// helpers layered on top of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Stored value could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Loads and decodes the typed value stored under `key` for the tenant.
///
/// A present-but-corrupt value surfaces as a serialization error naming the
/// failing JSON path instead of masquerading as an absent record.
pub async fn load<T>(
	store: &dyn CredentialStore,
	key: &str,
	tenant: &ClientKey,
) -> Result<Option<T>, StoreError>
where
	T: DeserializeOwned,
{
	let Some(value) = store.get(key, tenant).await? else {
		return Ok(None);
	};
	let decoded = serde_path_to_error::deserialize(value).map_err(|err| {
		StoreError::Serialization { message: format!("stored value under `{key}`: {err}") }
	})?;

	Ok(Some(decoded))
}

/// Encodes and persists a typed value under `key` for the tenant.
pub async fn save<T>(
	store: &dyn CredentialStore,
	key: &str,
	value: &T,
	tenant: &ClientKey,
) -> Result<(), StoreError>
where
	T: Serialize,
{
	let encoded = serde_json::to_value(value)
		.map_err(|err| StoreError::Serialization { message: err.to_string() })?;

	store.set(key, encoded, tenant).await
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::Error;

	#[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
	struct Sample {
		label: String,
	}

	#[tokio::test]
	async fn typed_helpers_round_trip() {
		let store = MemoryStore::default();
		let tenant = ClientKey::new("tenant-1").expect("Tenant fixture should be valid.");
		let sample = Sample { label: "stored".into() };

		save(&store, "sample", &sample, &tenant).await.expect("Typed save should succeed.");

		let loaded: Option<Sample> =
			load(&store, "sample", &tenant).await.expect("Typed load should succeed.");

		assert_eq!(loaded, Some(sample));
	}

	#[tokio::test]
	async fn corrupt_values_surface_as_serialization_errors() {
		let store = MemoryStore::default();
		let tenant = ClientKey::new("tenant-1").expect("Tenant fixture should be valid.");

		store
			.set("sample", serde_json::json!({ "label": 42 }), &tenant)
			.await
			.expect("Raw set should succeed.");

		let err = load::<Sample>(&store, "sample", &tenant)
			.await
			.expect_err("Corrupt stored value must not decode.");

		assert!(matches!(err, StoreError::Serialization { .. }));
		assert!(err.to_string().contains("label"));
	}

	#[test]
	fn store_error_converts_into_broker_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let broker_error: Error = store_error.clone().into();

		assert!(matches!(broker_error, Error::Storage(_)));
		assert!(broker_error.to_string().contains("database unreachable"));
	}
}
