#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use console_session::{
	_preludet::*,
	access::{AccessOutcome, AccessSnapshot},
	auth::{
		AuthUser, BillingStatus, Credentials, RoleId, SessionTokens, TenantCode, TenantContext,
		TokenSecret, UserId,
	},
	backend::BackendDescriptor,
	store::{CredentialStore, StoreScope},
};

const ACCESS_BODY: &str = r#"{"permissions":["contacts.read","chat.read"],"roles":["sales"]}"#;
const MENU_BODY: &str = r#"[{"code":"crm","name":"CRM","items":[{"code":"contacts","name":"Contacts","url":"/contacts"},{"code":"deals","name":"Deals","url":"/deals","isActive":false}]}]"#;

fn tokens(access: &str, refresh: &str) -> SessionTokens {
	SessionTokens {
		access: TokenSecret::new(access),
		refresh: TokenSecret::new(refresh),
		expires_at: OffsetDateTime::now_utc() + Duration::minutes(30),
	}
}

fn tenant_credentials() -> Credentials {
	Credentials::tenant(tokens("valid-access", "valid-refresh"), TenantContext {
		code: TenantCode::new("acme").expect("Tenant code fixture should be valid."),
		schema: "tenant_acme".into(),
	})
}

fn tenant_user(id: &str, roles: &[&str], role_id: Option<u64>, billing: BillingStatus) -> AuthUser {
	AuthUser {
		id: UserId::new(id).expect("User identifier fixture should be valid."),
		display_name: "Tenant User".into(),
		roles: roles.iter().map(|role| role.to_string()).collect(),
		role_id: role_id.map(RoleId),
		tenant_code: Some(TenantCode::new("acme").expect("Tenant code fixture should be valid.")),
		billing,
	}
}

fn build_descriptor(server: &MockServer) -> BackendDescriptor {
	BackendDescriptor::builder(
		Url::parse(&server.base_url()).expect("Mock server URL should parse."),
	)
	.build()
	.expect("Backend descriptor should build successfully.")
}

async fn seed_session(store: &dyn CredentialStore, user: AuthUser) {
	store
		.save(StoreScope::Tenant, tenant_credentials())
		.await
		.expect("Seeding tenant credentials should succeed.");
	store
		.save_user(StoreScope::Tenant, user)
		.await
		.expect("Seeding the tenant user should succeed.");
}

fn granted(outcome: AccessOutcome) -> AccessSnapshot {
	match outcome {
		AccessOutcome::Granted(snapshot) => snapshot,
		other => panic!("Expected a granted access outcome, got {other:?}."),
	}
}

#[tokio::test]
async fn member_access_is_role_scoped_and_cached() {
	let server = MockServer::start_async().await;
	let (manager, store, _) = build_test_manager(build_descriptor(&server));

	seed_session(store.as_ref(), tenant_user("user-1", &["sales"], Some(7), BillingStatus::Active))
		.await;

	let access_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/auth/access");
			then.status(200).header("content-type", "application/json").body(ACCESS_BODY);
		})
		.await;
	let menu_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/roles/7/menus");
			then.status(200).header("content-type", "application/json").body(MENU_BODY);
		})
		.await;
	let snapshot = granted(manager.access(false).await.expect("Access resolution should succeed."));

	assert_eq!(snapshot.menu.len(), 1);
	assert_eq!(snapshot.menu[0].code, "crm");
	assert_eq!(snapshot.menu[0].items.len(), 2);
	assert!(snapshot.menu[0].items[0].active);
	assert!(!snapshot.menu[0].items[1].active);
	assert_eq!(snapshot.permissions, vec!["contacts.read", "chat.read"]);
	assert_eq!(snapshot.roles, vec!["sales"]);

	// Second resolution is served from the cache without touching the backend.
	let cached = granted(manager.access(false).await.expect("Cached access should succeed."));

	assert_eq!(cached, snapshot);

	access_mock.assert_calls_async(1).await;
	menu_mock.assert_calls_async(1).await;

	// force_refresh bypasses the cache but still resolves successfully.
	granted(manager.access(true).await.expect("Forced access refresh should succeed."));

	access_mock.assert_calls_async(2).await;
	menu_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn admin_access_uses_the_full_menu_tree() {
	let server = MockServer::start_async().await;
	let (manager, store, _) = build_test_manager(build_descriptor(&server));

	seed_session(store.as_ref(), tenant_user("admin-1", &["admin"], None, BillingStatus::Active))
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/auth/access");
			then.status(200).header("content-type", "application/json").body(ACCESS_BODY);
		})
		.await;

	let tree_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/menus");
			then.status(200).header("content-type", "application/json").body(MENU_BODY);
		})
		.await;
	let snapshot = granted(manager.access(false).await.expect("Admin access should succeed."));

	assert_eq!(snapshot.menu[0].code, "crm");

	tree_mock.assert_async().await;
}

#[tokio::test]
async fn legacy_members_join_granted_codes_against_the_catalog() {
	let server = MockServer::start_async().await;
	let (manager, store, _) = build_test_manager(build_descriptor(&server));

	seed_session(store.as_ref(), tenant_user("user-old", &["sales"], None, BillingStatus::Active))
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/auth/access");
			then.status(200).header("content-type", "application/json").body(ACCESS_BODY);
		})
		.await;

	let granted_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/users/user-old/role-menus");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"itemCodes":["contacts","inbox"]}"#);
		})
		.await;
	let catalog_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/menu-items");
			then.status(200).header("content-type", "application/json").body(
				r#"[
					{"groupCode":"crm","groupName":"CRM","code":"contacts","name":"Contacts","url":"/contacts"},
					{"groupCode":"crm","groupName":"CRM","code":"deals","name":"Deals","url":"/deals"},
					{"groupCode":"chat","groupName":"Chat","code":"inbox","name":"Inbox","url":"/inbox"}
				]"#,
			);
		})
		.await;
	let snapshot = granted(manager.access(false).await.expect("Legacy access should succeed."));

	assert_eq!(snapshot.menu.len(), 2);
	assert_eq!(snapshot.menu[0].code, "crm");
	assert_eq!(snapshot.menu[0].items.len(), 1);
	assert_eq!(snapshot.menu[0].items[0].code, "contacts");
	assert_eq!(snapshot.menu[1].code, "chat");
	assert_eq!(snapshot.menu[1].items[0].code, "inbox");

	granted_mock.assert_async().await;
	catalog_mock.assert_async().await;
}

#[tokio::test]
async fn stale_cache_entries_are_refetched_after_the_ttl() {
	let server = MockServer::start_async().await;
	let descriptor = BackendDescriptor::builder(
		Url::parse(&server.base_url()).expect("Mock server URL should parse."),
	)
	.access_ttl(Duration::milliseconds(50))
	.build()
	.expect("Backend descriptor should build successfully.");
	let (manager, store, _) = build_test_manager(descriptor);

	seed_session(store.as_ref(), tenant_user("user-1", &["sales"], Some(7), BillingStatus::Active))
		.await;

	let access_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/auth/access");
			then.status(200).header("content-type", "application/json").body(ACCESS_BODY);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/roles/7/menus");
			then.status(200).header("content-type", "application/json").body(MENU_BODY);
		})
		.await;

	granted(manager.access(false).await.expect("First access should succeed."));
	tokio::time::sleep(std::time::Duration::from_millis(80)).await;
	granted(manager.access(false).await.expect("Post-TTL access should succeed."));

	access_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn unauthorized_access_resolves_to_unauthenticated() {
	let server = MockServer::start_async().await;
	let (manager, store, _) = build_test_manager(build_descriptor(&server));

	seed_session(store.as_ref(), tenant_user("user-1", &["sales"], Some(7), BillingStatus::Active))
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/auth/access");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"message":"Token expired","status":401}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/members/auth/refresh");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"message":"Invalid refresh token","status":401}"#);
		})
		.await;

	let outcome = manager.access(false).await.expect("Access resolution should not error.");

	assert_eq!(outcome, AccessOutcome::Unauthenticated);
	assert!(
		store
			.load(StoreScope::Tenant)
			.await
			.expect("Credential load should succeed.")
			.is_none(),
		"credentials should be cleared once the refresh chain is exhausted",
	);
}

#[tokio::test]
async fn forbidden_access_resolves_to_denied() {
	let server = MockServer::start_async().await;
	let descriptor = BackendDescriptor::builder(
		Url::parse(&server.base_url()).expect("Mock server URL should parse."),
	)
	.forbidden_triggers_refresh(false)
	.build()
	.expect("Backend descriptor should build successfully.");
	let (manager, store, _) = build_test_manager(descriptor);

	seed_session(store.as_ref(), tenant_user("user-1", &["sales"], Some(7), BillingStatus::Active))
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/auth/access");
			then.status(403)
				.header("content-type", "application/json")
				.body(r#"{"message":"Forbidden","status":403}"#);
		})
		.await;

	let outcome = manager.access(false).await.expect("Access resolution should not error.");

	assert_eq!(outcome, AccessOutcome::Denied);
}

#[tokio::test]
async fn billing_failures_degrade_to_the_minimal_menu() {
	let server = MockServer::start_async().await;
	let (manager, store, _) = build_test_manager(build_descriptor(&server));

	seed_session(store.as_ref(), tenant_user("user-1", &["sales"], Some(7), BillingStatus::Overdue))
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/auth/access");
			then.status(402)
				.header("content-type", "application/json")
				.body(r#"{"message":"Subscription expired","status":402}"#);
		})
		.await;

	let health_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/health");
			then.status(200).header("content-type", "application/json").body(r#"{"status":"ok"}"#);
		})
		.await;
	let outcome = manager.access(false).await.expect("Degraded access should not error.");
	let AccessOutcome::SubscriptionLimited(snapshot) = outcome else {
		panic!("Expected the subscription-limited outcome, got {outcome:?}.");
	};
	let codes: Vec<_> = snapshot.menu[0].items.iter().map(|item| item.code.as_str()).collect();

	assert_eq!(snapshot.menu[0].code, "account");
	assert_eq!(codes, vec!["profile", "change-password", "subscription"]);

	health_mock.assert_async().await;

	// Credentials survive: the session itself is still valid.
	assert!(
		store.load(StoreScope::Tenant).await.expect("Credential load should succeed.").is_some()
	);
}

#[tokio::test]
async fn unreachable_backends_revoke_the_session() {
	let server = MockServer::start_async().await;
	let (manager, store, _) = build_test_manager(build_descriptor(&server));

	seed_session(store.as_ref(), tenant_user("user-1", &["sales"], Some(7), BillingStatus::Active))
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/auth/access");
			then.status(500)
				.header("content-type", "application/json")
				.body(r#"{"message":"Internal error","status":500}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/health");
			then.status(503).body("unavailable");
		})
		.await;

	let outcome = manager.access(false).await.expect("Access resolution should not error.");

	assert_eq!(outcome, AccessOutcome::SessionRevoked);
	assert!(
		store.load(StoreScope::Tenant).await.expect("Credential load should succeed.").is_none()
	);
}

#[tokio::test]
async fn concurrent_access_callers_share_one_outstanding_fetch() {
	let server = MockServer::start_async().await;
	let (manager, store, _) = build_test_manager(build_descriptor(&server));

	seed_session(store.as_ref(), tenant_user("user-1", &["sales"], Some(7), BillingStatus::Active))
		.await;

	// The delay keeps the first fetch outstanding while the other callers queue
	// on the guard; they must adopt its cached result after acquisition.
	let access_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/auth/access");
			then.status(200)
				.header("content-type", "application/json")
				.body(ACCESS_BODY)
				.delay(std::time::Duration::from_millis(150));
		})
		.await;
	let menu_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/roles/7/menus");
			then.status(200).header("content-type", "application/json").body(MENU_BODY);
		})
		.await;
	let (first, second, third) = tokio::join!(
		manager.access(false),
		manager.access(false),
		manager.access(false),
	);

	for outcome in [first, second, third] {
		let snapshot = granted(outcome.expect("Concurrent access resolution should succeed."));

		assert_eq!(snapshot.menu[0].code, "crm");
	}

	access_mock.assert_calls_async(1).await;
	menu_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn fetch_superseded_by_a_user_switch_is_discarded_and_re_resolved() {
	let server = MockServer::start_async().await;
	let (manager, store, _) = build_test_manager(build_descriptor(&server));

	seed_session(store.as_ref(), tenant_user("user-1", &["sales"], Some(7), BillingStatus::Active))
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/auth/access");
			then.status(200)
				.header("content-type", "application/json")
				.body(ACCESS_BODY)
				.delay(std::time::Duration::from_millis(150));
		})
		.await;

	let old_role_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/roles/7/menus");
			then.status(200).header("content-type", "application/json").body(MENU_BODY);
		})
		.await;
	let new_role_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/roles/8/menus");
			then.status(200).header("content-type", "application/json").body(
				r#"[{"code":"billing","name":"Billing","items":[{"code":"invoices","name":"Invoices","url":"/invoices"}]}]"#,
			);
		})
		.await;
	// The switch lands while the first fetch is still outstanding; its stale
	// result must be discarded and resolution redone for the new owner.
	let (outcome, _) = tokio::join!(manager.access(false), async {
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;

		store
			.save_user(
				StoreScope::Tenant,
				tenant_user("user-2", &["sales"], Some(8), BillingStatus::Active),
			)
			.await
			.expect("Switching the stored user should succeed.");
	});
	let snapshot = granted(outcome.expect("Access resolution should succeed after the switch."));

	assert_eq!(snapshot.menu[0].code, "billing");
	assert_eq!(snapshot.menu[0].items[0].code, "invoices");

	old_role_mock.assert_calls_async(1).await;
	new_role_mock.assert_calls_async(1).await;

	// The cache belongs to the new owner now; no further backend traffic.
	let cached = granted(manager.access(false).await.expect("Cached access should succeed."));

	assert_eq!(cached, snapshot);

	new_role_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn missing_user_short_circuits_to_unauthenticated() {
	let server = MockServer::start_async().await;
	let (manager, _, _) = build_test_manager(build_descriptor(&server));
	let outcome = manager.access(false).await.expect("Access resolution should not error.");

	assert_eq!(outcome, AccessOutcome::Unauthenticated);
}
