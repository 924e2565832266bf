// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::http::{Method, StatusCode};
use serde_json::json;
use tradeflow_server_auth::Role;

use super::support::{request, send, TestApp};

#[tokio::test]
async fn permissions_union_across_roles() {
	let app = TestApp::new().await;
	let user = app.user_with(&[Role::Technician, Role::Estimator]).await;

	let (status, body) = send(
		app.router(),
		request(Method::GET, "/api/me/permissions", Some(user), None),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["primary_role"], "estimator");
	assert_eq!(body["permissions"]["jobs"], json!(["read", "update", "list"]));
	assert_eq!(body["permissions"]["leads"], json!(["create", "read", "update", "list"]));
	assert!(body["permissions"].get("settings").is_none());
	assert!(body["permissions"].get("audit_logs").is_none());
}

#[tokio::test]
async fn user_without_roles_has_no_permissions() {
	let app = TestApp::new().await;
	let user = app.user_with(&[]).await;

	let (status, body) = send(
		app.router(),
		request(Method::GET, "/api/me/permissions", Some(user), None),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["roles"], json!([]));
	assert_eq!(body["primary_role"], "no_access");
	assert_eq!(body["permissions"], json!({}));
}

#[tokio::test]
async fn me_requires_identity() {
	let app = TestApp::new().await;
	let (status, body) = send(
		app.router(),
		request(Method::GET, "/api/me/permissions", None, None),
	)
	.await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["errorCode"], "AUTH_REQUIRED");
}

#[tokio::test]
async fn health_reports_database_and_cache() {
	let app = TestApp::new().await;
	let user = app.user_with(&[Role::Viewer]).await;
	send(
		app.router(),
		request(Method::GET, "/api/me/permissions", Some(user), None),
	)
	.await;

	let (status, body) = send(app.router(), request(Method::GET, "/health", None, None)).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["status"], "healthy");
	assert_eq!(body["database"], "healthy");
	assert_eq!(body["audit_enabled"], true);
	assert_eq!(body["cached_users"], 1);
	assert_eq!(body["role_cache_ttl_secs"], 300);
}

#[tokio::test]
async fn health_reports_closed_database() {
	let app = TestApp::new().await;
	app.pool.close().await;

	let (status, body) = send(app.router(), request(Method::GET, "/health", None, None)).await;
	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(body["status"], "unhealthy");
}
