//! Scope-set modeling and cache-key derivation.

// std
use std::{cmp::Ordering, collections::BTreeSet, sync::OnceLock};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Delimiter joining scopes inside cache keys.
///
/// Distinct from the space used on the wire so a stored key can never collide
/// with a single scope string that happens to contain the wire delimiter.
const CACHE_KEY_DELIMITER: char = '|';

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Canonicalized set of permission scopes requested for an access token.
///
/// Scopes are deduplicated and sorted on construction so two callers asking for
/// the same logical permissions always derive the same [`cache_key`](Self::cache_key),
/// no matter the order they passed the strings in. [`fingerprint`](Self::fingerprint)
/// lazily caches a base64 (no padding) SHA-256 digest of the canonical form; the
/// [`Hash`] implementation reuses that cache so hashing stays cheap and stable.
#[derive(Default)]
pub struct ScopeSet {
	scopes: Arc<[String]>,
	fingerprint_cache: OnceLock<String>,
}
impl ScopeSet {
	/// Creates a canonicalized scope set from any iterator of scope strings.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self { scopes: canonicalize(scopes)?, fingerprint_cache: OnceLock::new() })
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Returns true if the canonical set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.scopes.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Iterator over canonical scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.scopes.iter().map(|s| s.as_str())
	}

	/// Space-delimited form used in token endpoint requests.
	pub fn space_delimited(&self) -> String {
		self.scopes.join(" ")
	}

	/// Stable per-scope-set component of the credential store key.
	pub fn cache_key(&self) -> String {
		let mut buf = String::new();

		for (idx, scope) in self.iter().enumerate() {
			if idx > 0 {
				buf.push(CACHE_KEY_DELIMITER);
			}

			buf.push_str(scope);
		}

		buf
	}

	/// Log-safe fingerprint derived from the canonical scope list.
	///
	/// A base64 (no padding) encoding of the SHA-256 digest of the
	/// space-delimited canonical string, cached after the first calculation.
	pub fn fingerprint(&self) -> String {
		self.fingerprint_cache.get_or_init(|| compute_fingerprint(&self.scopes)).clone()
	}

	/// Returns the underlying slice of scope strings.
	pub fn as_slice(&self) -> &[String] {
		&self.scopes
	}
}
impl Clone for ScopeSet {
	fn clone(&self) -> Self {
		Self { scopes: self.scopes.clone(), fingerprint_cache: OnceLock::new() }
	}
}
impl PartialEq for ScopeSet {
	fn eq(&self, other: &Self) -> bool {
		self.scopes == other.scopes
	}
}
impl Eq for ScopeSet {}
impl PartialOrd for ScopeSet {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for ScopeSet {
	fn cmp(&self, other: &Self) -> Ordering {
		self.scopes.cmp(&other.scopes)
	}
}
impl Hash for ScopeSet {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.fingerprint_cache.get_or_init(|| compute_fingerprint(&self.scopes)).hash(state);
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.scopes).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.space_delimited())
	}
}
impl TryFrom<Vec<String>> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		if s.chars().all(char::is_whitespace) {
			return Err(ScopeValidationError::Empty);
		}

		Self::new(s.split_whitespace())
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.scopes.len()))?;

		for scope in self.scopes.iter() {
			seq.serialize_element(scope)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		ScopeSet::new(values).map_err(DeError::custom)
	}
}

fn canonicalize<I, S>(scopes: I) -> Result<Arc<[String]>, ScopeValidationError>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let mut set = BTreeSet::new();

	for scope in scopes {
		let owned: String = scope.into();

		if owned.is_empty() {
			return Err(ScopeValidationError::Empty);
		}
		if owned.chars().any(char::is_whitespace) {
			return Err(ScopeValidationError::ContainsWhitespace { scope: owned });
		}

		set.insert(owned);
	}

	Ok(Arc::from(set.into_iter().collect::<Vec<_>>()))
}

fn compute_fingerprint(scopes: &[String]) -> String {
	let mut hasher = Sha256::new();

	hasher.update(scopes.join(" ").as_bytes());

	STANDARD_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn reordered_scopes_share_one_cache_key() {
		let lhs = ScopeSet::new(["send_notification", "view_group", "view_group"])
			.expect("Left-hand scope set should be valid.");
		let rhs = ScopeSet::new(["view_group", "send_notification"])
			.expect("Right-hand scope set should be valid.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.cache_key(), "send_notification|view_group");
		assert_eq!(lhs.cache_key(), rhs.cache_key());
		assert_eq!(lhs.fingerprint(), rhs.fingerprint());
	}

	#[test]
	fn wire_form_is_space_delimited() {
		let scopes = ScopeSet::new(["view_group", "send_notification"])
			.expect("Scope fixture should be valid.");

		assert_eq!(scopes.space_delimited(), "send_notification view_group");
	}

	#[test]
	fn invalid_scopes_error() {
		assert!(ScopeSet::new([""]).is_err());
		assert!(ScopeSet::new(["contains space"]).is_err());
		assert!(ScopeSet::new([" padded "]).is_err());
	}

	#[test]
	fn from_str_handles_empty_and_whitespace_input() {
		assert!(ScopeSet::from_str("").expect("Empty string is an empty scope set.").is_empty());
		assert!(ScopeSet::from_str("   ").is_err(), "Whitespace-only input must be rejected.");

		let scopes =
			ScopeSet::from_str("view_group send_notification").expect("Scope string should parse.");

		assert!(scopes.contains("view_group"));
		assert_eq!(scopes.len(), 2);
	}

	#[test]
	fn fingerprint_is_cached_and_stable() {
		let scopes = ScopeSet::new(["admin_room"]).expect("Scope fixture should be valid.");
		let fp1 = scopes.fingerprint();
		let fp2 = scopes.fingerprint();

		assert_eq!(fp1, fp2, "Fingerprint should be cached and stable.");
	}
}
