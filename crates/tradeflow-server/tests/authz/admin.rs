// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization tests for admin routes.
//!
//! Role administration requires owner or admin; audit log review requires
//! `read` on `audit_logs`.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;
use tradeflow_server_audit::{AuditFilterConfig, AuditSink, SqliteAuditSink};
use tradeflow_server_auth::{AuditEvent, AuditEventType, AuditOutcome, Role, UserId};

use super::support::{request, run_authz_cases, send, AuthzCase, TestApp};

#[tokio::test]
async fn anonymous_role_assignment_is_rejected_without_audit() {
	let app = TestApp::new().await;
	let target = UserId::generate();

	let (status, body) = send(
		app.router(),
		request(
			Method::POST,
			&format!("/api/admin/users/{target}/roles"),
			None,
			Some(json!({ "role": "admin" })),
		),
	)
	.await;

	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["errorCode"], "AUTH_REQUIRED");
	app.expect_audit_events(0).await;
}

#[tokio::test]
async fn manager_cannot_assign_roles() {
	let app = TestApp::new().await;
	let manager = app.user_with(&[Role::Manager]).await;
	let target = UserId::generate();

	let (status, body) = send(
		app.router(),
		request(
			Method::POST,
			&format!("/api/admin/users/{target}/roles"),
			Some(manager),
			Some(json!({ "role": "viewer" })),
		),
	)
	.await;

	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body["errorCode"], "INSUFFICIENT_ROLE");

	app.expect_audit_events(1).await;
	let event = &app.audit.events()[0];
	assert_eq!(event.outcome, AuditOutcome::Denied);
	assert_eq!(event.resource.as_deref(), Some("role_check"));
	assert_eq!(event.actor_user_id, Some(manager));
	assert_eq!(event.roles, vec![Role::Manager]);
}

#[tokio::test]
async fn assignment_is_visible_on_next_request() {
	let app = TestApp::new().await;
	let owner = app.user_with(&[Role::Owner]).await;
	let target = app.user_with(&[]).await;
	let router = app.router();

	// Prime the cache with the empty role set.
	let (status, body) = send(
		router.clone(),
		request(Method::GET, "/api/me/permissions", Some(target), None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["primary_role"], "no_access");

	let (status, body) = send(
		router.clone(),
		request(
			Method::POST,
			&format!("/api/admin/users/{target}/roles"),
			Some(owner),
			Some(json!({ "role": "estimator" })),
		),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["mutation"], "assign");
	assert_eq!(body["cache_invalidated"], true);

	let (_, body) = send(
		router.clone(),
		request(Method::GET, "/api/me/permissions", Some(target), None),
	)
	.await;
	assert_eq!(body["roles"], json!(["estimator"]));
	assert_eq!(body["primary_role"], "estimator");

	let (status, _) = send(
		router.clone(),
		request(
			Method::DELETE,
			&format!("/api/admin/users/{target}/roles/estimator"),
			Some(owner),
			None,
		),
	)
	.await;
	assert_eq!(status, StatusCode::OK);

	let (_, body) = send(
		router,
		request(Method::GET, "/api/me/permissions", Some(target), None),
	)
	.await;
	assert_eq!(body["roles"], json!([]));

	app.expect_audit_events(2).await;
	let mut kinds: Vec<_> = app.audit.events().iter().map(|e| e.event_type).collect();
	kinds.sort_by_key(|k| k.as_str());
	assert_eq!(kinds, vec![AuditEventType::RoleAssigned, AuditEventType::RoleRemoved]);
}

#[tokio::test]
async fn only_owner_grants_owner() {
	let app = TestApp::new().await;
	let admin = app.user_with(&[Role::Admin]).await;
	let owner = app.user_with(&[Role::Owner]).await;
	let target = app.user_with(&[Role::Manager]).await;

	let (status, body) = send(
		app.router(),
		request(
			Method::POST,
			&format!("/api/admin/users/{target}/roles"),
			Some(admin),
			Some(json!({ "role": "owner" })),
		),
	)
	.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body["errorCode"], "INSUFFICIENT_ROLE");
	app.expect_audit_events(1).await;
	assert_eq!(app.audit.events()[0].event_type, AuditEventType::AccessDenied);

	let (status, _) = send(
		app.router(),
		request(
			Method::POST,
			&format!("/api/admin/users/{target}/roles"),
			Some(owner),
			Some(json!({ "role": "owner" })),
		),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn invalid_role_requests_are_rejected() {
	let app = TestApp::new().await;
	let admin = app.user_with(&[Role::Admin]).await;
	let target = UserId::generate();

	let cases = vec![
		AuthzCase {
			name: "sentinel_role_cannot_be_assigned",
			method: Method::POST,
			path: format!("/api/admin/users/{target}/roles"),
			user: Some(admin),
			body: Some(json!({ "role": "no_access" })),
			expected_status: StatusCode::BAD_REQUEST,
		},
		AuthzCase {
			name: "unknown_role_in_body",
			method: Method::POST,
			path: format!("/api/admin/users/{target}/roles"),
			user: Some(admin),
			body: Some(json!({ "role": "superuser" })),
			expected_status: StatusCode::BAD_REQUEST,
		},
		AuthzCase {
			name: "unknown_role_in_path",
			method: Method::DELETE,
			path: format!("/api/admin/users/{target}/roles/superuser"),
			user: Some(admin),
			body: None,
			expected_status: StatusCode::BAD_REQUEST,
		},
		AuthzCase {
			name: "malformed_user_id",
			method: Method::DELETE,
			path: "/api/admin/users/not-a-uuid/roles/viewer".to_string(),
			user: Some(admin),
			body: None,
			expected_status: StatusCode::BAD_REQUEST,
		},
	];

	run_authz_cases(&app.router(), &cases).await;
}

#[tokio::test]
async fn audit_logs_require_read_permission() {
	let app = TestApp::new().await;
	let admin = app.user_with(&[Role::Admin]).await;
	let manager = app.user_with(&[Role::Manager]).await;

	let sink = SqliteAuditSink::new(app.pool.clone(), AuditFilterConfig::default());
	let denied = AuditEvent::builder(AuditEventType::AccessDenied, AuditOutcome::Denied)
		.actor(manager)
		.resource("jobs")
		.build();
	let login = AuditEvent::builder(AuditEventType::Login, AuditOutcome::Success)
		.actor(admin)
		.build();
	sink.publish(Arc::new(denied.clone())).await.unwrap();
	sink.publish(Arc::new(login)).await.unwrap();

	let (status, body) = send(
		app.router(),
		request(Method::GET, "/api/admin/audit-logs", Some(manager), None),
	)
	.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body["errorCode"], "INSUFFICIENT_PERMISSION");
	assert_eq!(body["resource"], "audit_logs");
	assert_eq!(body["action"], "read");

	let (status, body) = send(
		app.router(),
		request(Method::GET, "/api/admin/audit-logs", Some(admin), None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["total"], 2);
	assert_eq!(body["limit"], 50);

	let (status, body) = send(
		app.router(),
		request(
			Method::GET,
			"/api/admin/audit-logs?outcome=denied&limit=10",
			Some(admin),
			None,
		),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["total"], 1);
	assert_eq!(body["events"][0]["id"], denied.id.to_string());
	assert_eq!(body["limit"], 10);
}
