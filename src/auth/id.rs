//! Strongly typed tenant identifier enforced across the broker domain.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const CLIENT_KEY_MAX_LEN: usize = 128;

/// Error returned when client key validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum ClientKeyError {
	/// The key was empty.
	#[error("Client key cannot be empty.")]
	Empty,
	/// The key contains whitespace characters.
	#[error("Client key contains whitespace.")]
	ContainsWhitespace,
	/// The key exceeded the allowed character count.
	#[error("Client key exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Unique identifier for an installed tenant.
///
/// The host platform assigns one OAuth client id per installation; the broker
/// treats it as the immutable primary key for every stored credential.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientKey(String);
impl ClientKey {
	/// Creates a new client key after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, ClientKeyError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for ClientKey {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for ClientKey {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for ClientKey {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<ClientKey> for String {
	fn from(value: ClientKey) -> Self {
		value.0
	}
}
impl TryFrom<String> for ClientKey {
	type Error = ClientKeyError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl FromStr for ClientKey {
	type Err = ClientKeyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for ClientKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ClientKey({})", self.0)
	}
}
impl Display for ClientKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn validate_view(view: &str) -> Result<(), ClientKeyError> {
	if view.is_empty() {
		return Err(ClientKeyError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(ClientKeyError::ContainsWhitespace);
	}
	if view.len() > CLIENT_KEY_MAX_LEN {
		return Err(ClientKeyError::TooLong { max: CLIENT_KEY_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn client_keys_validate_shape() {
		assert!(ClientKey::new("").is_err());
		assert!(ClientKey::new("key with space").is_err());
		assert!(ClientKey::new(" padded").is_err());

		let key = ClientKey::new("6e67ae6f-7368-4b31-9c3a-d27e8eb4d17b")
			.expect("UUID-shaped client key should be accepted.");

		assert_eq!(key.as_ref(), "6e67ae6f-7368-4b31-9c3a-d27e8eb4d17b");
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let key: ClientKey = serde_json::from_str("\"tenant-42\"")
			.expect("Client key should deserialize successfully.");

		assert_eq!(key.as_ref(), "tenant-42");
		assert!(serde_json::from_str::<ClientKey>("\"with space\"").is_err());
	}

	#[test]
	fn length_limit_is_enforced() {
		let exact = "a".repeat(CLIENT_KEY_MAX_LEN);

		ClientKey::new(&exact).expect("Exact length should succeed.");

		assert!(ClientKey::new("a".repeat(CLIENT_KEY_MAX_LEN + 1)).is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<ClientKey, u8> = HashMap::from_iter([(
			ClientKey::new("tenant-123").expect("Client key used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("tenant-123"), Some(&7));
	}
}
