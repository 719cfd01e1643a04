//! Rust’s turnkey multi-tenant add-on auth broker—install handshakes, expiry-aware token
//! caches, and signed-request verification in one crate built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod authenticate;
pub mod cache;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod exchange;
pub mod handshake;
pub mod http;
pub mod obs;
pub mod store;
pub mod tenant;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use jsonwebtoken::{EncodingKey, Header};
	// self
	use crate::{
		authenticate::RequestAuthenticator,
		cache::TokenCache,
		descriptor::AddonDescriptor,
		events::RecordingSink,
		handshake::InstallationHandshake,
		http::HttpTransport,
		store::MemoryStore,
	};

	/// Broker components wired against an in-memory store and a recording
	/// event sink, sharing one transport.
	pub struct TestBroker {
		/// Shared in-memory credential store.
		pub store: Arc<MemoryStore>,
		/// Ordered recording of every emitted lifecycle event.
		pub events: Arc<RecordingSink>,
		/// Token cache under test.
		pub cache: TokenCache,
		/// Installation handshake under test.
		pub handshake: InstallationHandshake,
		/// Request authenticator under test.
		pub authenticator: RequestAuthenticator,
	}

	/// Builds a transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_http_transport() -> HttpTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		HttpTransport::with_client(client)
	}

	/// Builds a minimal installable descriptor declaring the provided scopes.
	pub fn test_descriptor(scopes: &[&str]) -> AddonDescriptor {
		serde_json::from_value(serde_json::json!({
			"key": "com.example.notifier",
			"name": "Example Notifier",
			"links": { "self": "https://addon.example.com/atlassian-connect.json" },
			"capabilities": {
				"apiConsumer": { "scopes": scopes },
				"installable": { "callbackUrl": "https://addon.example.com/installed" }
			}
		}))
		.expect("Test descriptor should deserialize.")
	}

	/// Wires every broker component against a fresh [`MemoryStore`] and the
	/// httpmock-friendly transport.
	pub fn build_test_broker(descriptor: AddonDescriptor) -> TestBroker {
		let store = Arc::new(MemoryStore::default());
		let events = Arc::new(RecordingSink::new());
		let transport = test_http_transport();
		let descriptor = Arc::new(descriptor);
		let cache = TokenCache::new(store.clone(), descriptor, transport.clone());
		let handshake =
			InstallationHandshake::new(store.clone(), cache.clone(), transport, events.clone());
		let authenticator = RequestAuthenticator::new(store.clone());

		TestBroker { store, events, cache, handshake, authenticator }
	}

	/// Signs an HS256 token shaped like a host-platform signed request.
	pub fn sign_test_token(issuer: &str, secret: &str, context: serde_json::Value) -> String {
		let claims = serde_json::json!({
			"iss": issuer,
			"exp": (OffsetDateTime::now_utc() + Duration::minutes(5)).unix_timestamp(),
			"context": context,
		});

		jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
			.expect("Failed to sign test token.")
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
#[cfg(test)] use {addon_broker as _, httpmock as _};
