//! HTTP transport shared by the token acquirer and the handshake fetcher.
//!
//! One [`HttpTransport`] serves both kinds of remote call this crate makes:
//! token-endpoint exchanges routed through the `oauth2` crate (via
//! [`HttpTransport::metered`], which records response status for error mapping)
//! and plain capability-document fetches (via [`HttpTransport::fetch`]). The
//! default policy bounds every request with a timeout and refuses redirects, so
//! a slow or misbehaving host platform surfaces as a typed error instead of a
//! hung request or a silently relocated endpoint.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::ConfigError};

/// Upper bound applied to every outbound request by the default policy.
pub const REQUEST_TIMEOUT: Duration = Duration::seconds(30);

/// Result of a plain document fetch.
#[derive(Clone, Debug)]
pub struct FetchedDocument {
	/// HTTP status answered by the remote endpoint.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl FetchedDocument {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between the transport and
/// error-mapping layers. The acquirer creates a fresh slot per exchange and
/// reads it back immediately after the `oauth2` request resolves.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Reqwest-backed transport wrapper shared across broker components.
///
/// The `Default` instance wraps a plain [`ReqwestClient`]; prefer
/// [`HttpTransport::new`] in production so the broker policy applies.
#[derive(Clone, Default)]
pub struct HttpTransport(ReqwestClient);
impl HttpTransport {
	/// Builds a transport with the broker's default policy: a bounded request
	/// timeout and no redirect following. Token endpoints must answer directly
	/// per OAuth 2.0 guidance, and a redirecting capabilities URL would defeat
	/// the install self-link check.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT.whole_seconds() as u64))
			.redirect(Policy::none())
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing [`ReqwestClient`]. Callers supplying their own client
	/// should configure a timeout and disable redirect following themselves.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	pub(crate) fn metered(&self, slot: ResponseMetadataSlot) -> MeteredHandle {
		MeteredHandle::new(self.0.clone(), slot)
	}

	/// Performs a plain GET and returns status + body.
	pub async fn fetch(&self, url: &Url) -> Result<FetchedDocument, crate::error::TransportError> {
		let response = self.0.get(url.clone()).send().await?;
		let status = response.status().as_u16();
		let body = response.bytes().await?.to_vec();

		Ok(FetchedDocument { status, body })
	}
}
impl AsRef<ReqwestClient> for HttpTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for HttpTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl Debug for HttpTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("HttpTransport(..)")
	}
}

struct MeteredHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// [`AsyncHttpClient`] adapter that captures the response status before handing
/// the body back to the `oauth2` crate.
#[derive(Clone)]
pub struct MeteredHandle(Arc<MeteredHttpClient>);
impl MeteredHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self(Arc::new(MeteredHttpClient { client, slot }))
	}
}
impl<'c> AsyncHttpClient<'c> for MeteredHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let inner = Arc::clone(&self.0);

		Box::pin(async move {
			inner.slot.take();

			let response = inner
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			inner.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut converted = HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn metadata_slot_is_consumed_on_take() {
		let slot = ResponseMetadataSlot::default();

		slot.store(ResponseMetadata { status: Some(401) });

		assert_eq!(slot.take().and_then(|meta| meta.status), Some(401));
		assert!(slot.take().is_none(), "Metadata must not leak into the next request.");
	}

	#[test]
	fn fetched_document_success_covers_2xx_only() {
		assert!(FetchedDocument { status: 200, body: vec![] }.is_success());
		assert!(FetchedDocument { status: 204, body: vec![] }.is_success());
		assert!(!FetchedDocument { status: 302, body: vec![] }.is_success());
		assert!(!FetchedDocument { status: 500, body: vec![] }.is_success());
	}

	#[test]
	fn default_policy_transport_builds() {
		HttpTransport::new().expect("Default-policy transport should build.");
	}
}
