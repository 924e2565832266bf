// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Context loading: missing contexts, store failures and cache sharing.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
	body::Body,
	http::{HeaderName, Method, Request, StatusCode},
	routing::get,
	Extension, Router,
};
use tradeflow_server_auth::{
	AuditOutcome, AuthContext, Identity, Resource, Role, RoleMutation, RoleStore, UserId,
};
use tradeflow_server_db::testing::create_migrated_test_pool;

use super::support::{request, send, CountingStore, TestApp};

#[tokio::test]
async fn gate_without_loaded_context_fails_closed() {
	let app = TestApp::new().await;
	let user = UserId::generate();

	// No load layer: only the identity is attached.
	let router = Router::new()
		.route("/api/jobs", get(|| async { "ok" }))
		.route_layer(app.state.gates().require_resource_permission(Resource::Jobs))
		.layer(Extension(AuthContext::Authenticated(Identity::new(user))));

	let (status, body) = send(router, request(Method::GET, "/api/jobs", None, None)).await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body["errorCode"], "CONTEXT_NOT_LOADED");

	app.expect_audit_events(1).await;
	let event = &app.audit.events()[0];
	assert_eq!(event.outcome, AuditOutcome::Denied);
	assert_eq!(event.actor_user_id, Some(user));
	assert_eq!(event.resource.as_deref(), Some("context_check"));
}

#[tokio::test]
async fn gate_without_any_context_requires_auth() {
	let app = TestApp::new().await;
	let router = Router::new()
		.route("/api/settings", get(|| async { "ok" }))
		.route_layer(app.state.gates().require_role(vec![Role::Owner]));

	let (status, body) = send(router, request(Method::GET, "/api/settings", None, None)).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["errorCode"], "AUTH_REQUIRED");
	app.expect_audit_events(0).await;
}

#[tokio::test]
async fn store_failure_is_unauthenticated_and_not_cached() {
	let pool = create_migrated_test_pool().await;
	let store = Arc::new(CountingStore::default());
	let app = TestApp::with_store(pool, store.clone());
	let user = UserId::generate();
	store
		.write_role(&user, Role::Viewer, RoleMutation::Assign)
		.await
		.unwrap();

	store.unavailable.store(true, Ordering::SeqCst);
	let (status, body) = send(
		app.router(),
		request(Method::GET, "/api/me/permissions", Some(user), None),
	)
	.await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["errorCode"], "AUTH_REQUIRED");

	store.unavailable.store(false, Ordering::SeqCst);
	let (status, body) = send(
		app.router(),
		request(Method::GET, "/api/me/permissions", Some(user), None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["primary_role"], "viewer");
	assert_eq!(store.reads(), 2);

	app.expect_audit_events(0).await;
}

#[tokio::test]
async fn concurrent_requests_share_one_store_read() {
	let pool = create_migrated_test_pool().await;
	let store = Arc::new(CountingStore::default());
	let app = TestApp::with_store(pool, store.clone());
	let user = UserId::generate();
	store
		.write_role(&user, Role::Technician, RoleMutation::Assign)
		.await
		.unwrap();

	let router = app.router();
	let requests = (0..8).map(|_| {
		send(
			router.clone(),
			request(Method::GET, "/api/me/permissions", Some(user), None),
		)
	});
	let results = futures::future::join_all(requests).await;

	for (status, body) in results {
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["primary_role"], "technician");
	}
	assert_eq!(store.reads(), 1);
	assert_eq!(app.state.role_loader.cached_user_count(), 1);
}

#[tokio::test]
async fn identity_header_is_used_when_configured() {
	let mut app = TestApp::new().await;
	let user = app.user_with(&[Role::Manager]).await;

	let header_request = || {
		Request::builder()
			.method(Method::GET)
			.uri("/api/me/permissions")
			.header("x-user-id", user.to_string())
			.body(Body::empty())
			.unwrap()
	};

	let (status, _) = send(app.router(), header_request()).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);

	app.state.identity_header = Some(HeaderName::from_static("x-user-id"));
	let (status, body) = send(app.router(), header_request()).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["user_id"], user.to_string());
	assert_eq!(body["primary_role"], "manager");

	let malformed = Request::builder()
		.method(Method::GET)
		.uri("/api/me/permissions")
		.header("x-user-id", "not-a-uuid")
		.body(Body::empty())
		.unwrap();
	let (status, _) = send(app.router(), malformed).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
}
