//! Cached access-token model and expiry helpers.

// self
use crate::{_prelude::*, auth::SecretString};

/// One scoped access token minted from a tenant's authorization server.
///
/// Records are immutable; an expired token is superseded by a freshly acquired
/// replacement rather than updated in place. `created_at` is stamped locally at
/// acquisition time and anchors every expiry check; the broker never trusts a
/// timestamp from the token response itself.
#[derive(Clone, Serialize, Deserialize)]
pub struct CachedToken {
	/// Opaque bearer value; callers must avoid logging it.
	pub access_token: SecretString,
	/// Token type reported by the authorization server (normally `bearer`).
	pub token_type: String,
	/// Lifetime reported by the authorization server.
	#[serde(with = "expires_in_seconds")]
	pub expires_in: Duration,
	/// Local acquisition instant, stored as epoch seconds.
	#[serde(with = "time::serde::timestamp")]
	pub created_at: OffsetDateTime,
	/// Cache key component derived from the canonical requested scopes.
	pub scope_key: String,
	/// Tenant group identifier, when the authorization server reports one.
	pub group_id: Option<u64>,
	/// Tenant group name, when the authorization server reports one.
	pub group_name: Option<String>,
}
impl CachedToken {
	/// Instant the token stops being valid.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.created_at + self.expires_in
	}

	/// Returns `true` if the token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at()
	}

	/// Returns `true` if the token is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}
impl Debug for CachedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedToken")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("created_at", &self.created_at)
			.field("scope_key", &self.scope_key)
			.field("group_id", &self.group_id)
			.field("group_name", &self.group_name)
			.finish()
	}
}

/// Serializes `expires_in` as the plain second count reported by the server.
mod expires_in_seconds {
	// crates.io
	use serde::{Deserialize, Deserializer, Serializer};
	use time::Duration;

	pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(duration.whole_seconds())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		Ok(Duration::seconds(i64::deserialize(deserializer)?))
	}
}
