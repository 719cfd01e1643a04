// self
use addon_broker::{
	_preludet::*,
	auth::{ClientKey, SecretString},
	authenticate::InboundRequest,
	error::UnverifiableRequest,
	store,
	tenant::{CLIENT_INFO_KEY, CapabilityDocument, TenantClientRecord},
};

const TENANT_SECRET: &str = "tenant-signing-secret";

async fn seed_tenant(broker: &TestBroker, key: &str) -> ClientKey {
	let document = CapabilityDocument::from_slice(
		serde_json::json!({
			"links": { "self": "https://tenant.example.com/v2/capabilities" },
			"capabilities": {
				"oauth2Provider": { "tokenUrl": "https://tenant.example.com/v2/oauth/token" }
			}
		})
		.to_string()
		.as_bytes(),
	)
	.expect("Capability document fixture should parse.");
	let tenant = ClientKey::new(key).expect("Tenant fixture should be valid.");
	let record = TenantClientRecord::new(
		tenant.clone(),
		SecretString::new(TENANT_SECRET),
		Url::parse("https://tenant.example.com/v2/capabilities")
			.expect("Capabilities URL fixture should parse."),
		document,
	);

	store::save(broker.store.as_ref(), CLIENT_INFO_KEY, &record, &tenant)
		.await
		.expect("Seeding the tenant record should succeed.");

	tenant
}

#[tokio::test]
async fn signed_request_from_known_tenant_attaches_context() {
	let broker = build_test_broker(test_descriptor(&["send_notification"]));

	seed_tenant(&broker, "tenant-signed").await;

	let token = sign_test_token(
		"tenant-signed",
		TENANT_SECRET,
		serde_json::json!({ "room_id": 4321, "user_id": 7 }),
	);
	let context = broker
		.authenticator
		.authenticate(&InboundRequest::signed(token))
		.await
		.expect("A correctly signed request should authenticate.");

	assert_eq!(context.client.client_key.as_ref(), "tenant-signed");
	assert_eq!(context.context["room_id"], 4321);
	assert_eq!(context.context["user_id"], 7);
}

#[tokio::test]
async fn signed_request_with_wrong_secret_is_rejected() {
	let broker = build_test_broker(test_descriptor(&["send_notification"]));

	seed_tenant(&broker, "tenant-resigned").await;

	let token = sign_test_token(
		"tenant-resigned",
		"some-other-secret",
		serde_json::json!({ "room_id": 4321 }),
	);
	let err = broker
		.authenticator
		.authenticate(&InboundRequest::signed(token))
		.await
		.expect_err("A token signed with the wrong secret must be rejected.");

	assert!(matches!(
		err,
		Error::Unverifiable(UnverifiableRequest::BadSignature { .. }),
	));
	assert_eq!(err.http_status(), 400);
}

#[tokio::test]
async fn signed_request_from_unknown_tenant_fails_without_verification() {
	let broker = build_test_broker(test_descriptor(&["send_notification"]));
	// No record is seeded; were verification attempted anyway, this token's
	// garbage signature would surface as BadSignature instead.
	let token = sign_test_token(
		"tenant-nobody",
		"a-secret-nobody-stored",
		serde_json::json!({}),
	);
	let err = broker
		.authenticator
		.authenticate(&InboundRequest::signed(token))
		.await
		.expect_err("An unknown issuer must be rejected.");

	assert!(matches!(
		err,
		Error::Unverifiable(UnverifiableRequest::UnknownTenant { ref tenant }) if tenant == "tenant-nobody",
	));
	assert_eq!(err.http_status(), 400);
}

#[tokio::test]
async fn session_request_attaches_the_raw_body_as_context() {
	let broker = build_test_broker(test_descriptor(&["send_notification"]));

	seed_tenant(&broker, "tenant-session").await;

	let body = serde_json::json!({
		"oauth_client_id": "tenant-session",
		"item": { "message": "hello" }
	});
	let context = broker
		.authenticator
		.authenticate(&InboundRequest::session(body.clone()))
		.await
		.expect("A seeded session identity should authenticate.");

	assert_eq!(context.client.client_key.as_ref(), "tenant-session");
	assert_eq!(context.context, body);
}

#[tokio::test]
async fn session_request_for_unknown_tenant_is_rejected() {
	let broker = build_test_broker(test_descriptor(&["send_notification"]));
	let err = broker
		.authenticator
		.authenticate(&InboundRequest::session(serde_json::json!({
			"oauth_client_id": "tenant-unseeded"
		})))
		.await
		.expect_err("An unknown session identity must be rejected.");

	assert!(matches!(
		err,
		Error::Unverifiable(UnverifiableRequest::UnknownTenant { .. }),
	));
}

#[tokio::test]
async fn request_with_no_identity_is_rejected() {
	let broker = build_test_broker(test_descriptor(&["send_notification"]));

	for request in [
		InboundRequest::default(),
		InboundRequest::session(serde_json::json!({ "item": { "message": "hello" } })),
	] {
		let err = broker
			.authenticator
			.authenticate(&request)
			.await
			.expect_err("A request with no identity must be rejected.");

		assert!(matches!(
			err,
			Error::Unverifiable(UnverifiableRequest::NoIdentity),
		));
		assert_eq!(err.http_status(), 400);
	}
}

#[tokio::test]
async fn uninstalled_tenant_no_longer_authenticates() {
	let broker = build_test_broker(test_descriptor(&["send_notification"]));
	let tenant = seed_tenant(&broker, "tenant-removed").await;

	broker.handshake.handle_uninstall(&tenant).await.expect("Uninstall should succeed.");

	let token = sign_test_token("tenant-removed", TENANT_SECRET, serde_json::json!({}));
	let err = broker
		.authenticator
		.authenticate(&InboundRequest::signed(token))
		.await
		.expect_err("A logically uninstalled tenant must not authenticate.");

	assert!(matches!(
		err,
		Error::Unverifiable(UnverifiableRequest::UnknownTenant { .. }),
	));
}
