//! Expiry-aware token cache with per-(tenant, scope-set) singleflight guards.
//!
//! [`TokenCache::get_token`] returns the stored token for a tenant/scope pair
//! while it is still valid, and otherwise acquires a replacement, writes it
//! through to the credential store, and returns it. A per-key singleflight
//! guard ensures concurrent callers observing the same miss piggy-back on one
//! in-flight exchange instead of stampeding the tenant's token endpoint.

// self
use crate::{
	_prelude::*,
	auth::{CachedToken, ClientKey, ScopeSet},
	descriptor::AddonDescriptor,
	exchange::TokenAcquirer,
	http::HttpTransport,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{self, CredentialStore},
	tenant::TenantClientRecord,
};

#[derive(Clone, PartialEq, Eq, Hash)]
struct FlightKey {
	tenant: ClientKey,
	scope: ScopeSet,
}

/// Scoped access-token cache over a [`CredentialStore`] and a [`TokenAcquirer`].
#[derive(Clone)]
pub struct TokenCache {
	store: Arc<dyn CredentialStore>,
	descriptor: Arc<AddonDescriptor>,
	acquirer: TokenAcquirer,
	flight_guards: Arc<Mutex<HashMap<FlightKey, Arc<AsyncMutex<()>>>>>,
}
impl TokenCache {
	/// Creates a cache wired to the provided store, descriptor, and transport.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		descriptor: Arc<AddonDescriptor>,
		transport: HttpTransport,
	) -> Self {
		Self {
			store,
			descriptor,
			acquirer: TokenAcquirer::new(transport),
			flight_guards: Default::default(),
		}
	}

	/// Returns a valid token for the tenant and scope-set.
	///
	/// `scopes` defaults to the add-on descriptor's API consumer scopes when
	/// omitted. The returned token is unexpired at the moment of return; an
	/// expired or absent entry triggers one acquisition whose result replaces
	/// the stored value before this method returns. Failures from the exchange
	/// or the store propagate as typed errors with no stale-token fallback.
	pub async fn get_token(
		&self,
		tenant: &TenantClientRecord,
		scopes: Option<ScopeSet>,
	) -> Result<CachedToken> {
		const KIND: FlowKind = FlowKind::TokenExchange;

		let span = FlowSpan::new(KIND, "get_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let scope = match scopes {
					Some(scope) => scope,
					None => self.descriptor.default_scopes()?,
				};
				let cache_key = scope.cache_key();
				let guard = self.flight_guard(&tenant.client_key, &scope);
				let _singleflight = guard.lock().await;
				let now = OffsetDateTime::now_utc();

				if let Some(current) = store::load::<CachedToken>(
					self.store.as_ref(),
					&cache_key,
					&tenant.client_key,
				)
				.await?
				.filter(|token| !token.is_expired_at(now))
				{
					return Ok(current);
				}

				let minted = self.acquirer.acquire(tenant, &scope).await?;

				store::save(self.store.as_ref(), &cache_key, &minted, &tenant.client_key).await?;

				Ok(minted)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Returns (and creates on demand) the singleflight guard for a cache key.
	fn flight_guard(&self, tenant: &ClientKey, scope: &ScopeSet) -> Arc<AsyncMutex<()>> {
		let key = FlightKey { tenant: tenant.clone(), scope: scope.clone() };
		let mut guards = self.flight_guards.lock();

		guards.entry(key).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache").field("descriptor", &self.descriptor.key).finish()
	}
}
