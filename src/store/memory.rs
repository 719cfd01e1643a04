//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::ClientKey,
	store::{CredentialStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<(ClientKey, String), serde_json::Value>>>;

/// Thread-safe storage backend that keeps credentials in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	fn set_now(
		map: StoreMap,
		key: String,
		value: serde_json::Value,
		tenant: ClientKey,
	) -> Result<(), StoreError> {
		map.write().insert((tenant, key), value);

		Ok(())
	}

	fn get_now(map: StoreMap, key: String, tenant: ClientKey) -> Option<serde_json::Value> {
		map.read().get(&(tenant, key)).cloned()
	}

	fn purge_now(map: StoreMap, tenant: ClientKey) {
		map.write().retain(|(owner, _), _| *owner != tenant);
	}
}
impl CredentialStore for MemoryStore {
	fn set<'a>(
		&'a self,
		key: &'a str,
		value: serde_json::Value,
		tenant: &'a ClientKey,
	) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();
		let tenant = tenant.clone();

		Box::pin(async move { Self::set_now(map, key, value, tenant) })
	}

	fn get<'a>(
		&'a self,
		key: &'a str,
		tenant: &'a ClientKey,
	) -> StoreFuture<'a, Option<serde_json::Value>> {
		let map = self.0.clone();
		let key = key.to_owned();
		let tenant = tenant.clone();

		Box::pin(async move { Ok(Self::get_now(map, key, tenant)) })
	}

	fn purge<'a>(&'a self, tenant: &'a ClientKey) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let tenant = tenant.clone();

		Box::pin(async move {
			Self::purge_now(map, tenant);

			Ok(())
		})
	}
}
