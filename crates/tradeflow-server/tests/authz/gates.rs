// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route gates: verb-derived permissions, role sets and the role hierarchy.

use axum::http::{Method, StatusCode};
use tradeflow_server_auth::{AuditEventType, AuditOutcome, Role};

use super::support::{request, run_authz_cases, send, AuthzCase, TestApp};

#[tokio::test]
async fn technician_cannot_delete_job() {
	let app = TestApp::new().await;
	let tech = app.user_with(&[Role::Technician]).await;

	let (status, body) = send(
		app.resource_router(),
		request(Method::DELETE, "/api/jobs/42", Some(tech), None),
	)
	.await;

	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body["success"], false);
	assert_eq!(body["errorCode"], "INSUFFICIENT_PERMISSION");
	assert_eq!(body["resource"], "jobs");
	assert_eq!(body["action"], "delete");

	app.expect_audit_events(1).await;
	let event = &app.audit.events()[0];
	assert_eq!(event.event_type, AuditEventType::AccessDenied);
	assert_eq!(event.outcome, AuditOutcome::Denied);
	assert_eq!(event.actor_user_id, Some(tech));
	assert_eq!(event.resource.as_deref(), Some("jobs"));
	assert_eq!(event.resource_id.as_deref(), Some("42"));
	assert_eq!(event.action.as_deref(), Some("delete"));
	assert_eq!(event.roles, vec![Role::Technician]);
	assert_eq!(event.request_method.as_deref(), Some("DELETE"));
	assert_eq!(event.request_path.as_deref(), Some("/api/jobs/42"));
}

#[tokio::test]
async fn verbs_map_to_actions_for_jobs() {
	let app = TestApp::new().await;
	let tech = app.user_with(&[Role::Technician]).await;
	let manager = app.user_with(&[Role::Manager]).await;
	let owner = app.user_with(&[Role::Owner]).await;

	let cases = vec![
		AuthzCase {
			name: "technician_lists_jobs",
			method: Method::GET,
			path: "/api/jobs".to_string(),
			user: Some(tech),
			body: None,
			expected_status: StatusCode::OK,
		},
		AuthzCase {
			name: "technician_reads_job",
			method: Method::GET,
			path: "/api/jobs/1".to_string(),
			user: Some(tech),
			body: None,
			expected_status: StatusCode::OK,
		},
		AuthzCase {
			name: "technician_updates_job",
			method: Method::PATCH,
			path: "/api/jobs/1".to_string(),
			user: Some(tech),
			body: None,
			expected_status: StatusCode::OK,
		},
		AuthzCase {
			name: "technician_cannot_create_job",
			method: Method::POST,
			path: "/api/jobs".to_string(),
			user: Some(tech),
			body: None,
			expected_status: StatusCode::FORBIDDEN,
		},
		AuthzCase {
			name: "manager_creates_job",
			method: Method::POST,
			path: "/api/jobs".to_string(),
			user: Some(manager),
			body: None,
			expected_status: StatusCode::OK,
		},
		AuthzCase {
			name: "manager_cannot_delete_job",
			method: Method::DELETE,
			path: "/api/jobs/1".to_string(),
			user: Some(manager),
			body: None,
			expected_status: StatusCode::FORBIDDEN,
		},
		AuthzCase {
			name: "owner_deletes_job",
			method: Method::DELETE,
			path: "/api/jobs/1".to_string(),
			user: Some(owner),
			body: None,
			expected_status: StatusCode::OK,
		},
		AuthzCase {
			name: "anonymous_cannot_list_jobs",
			method: Method::GET,
			path: "/api/jobs".to_string(),
			user: None,
			body: None,
			expected_status: StatusCode::UNAUTHORIZED,
		},
	];

	run_authz_cases(&app.resource_router(), &cases).await;

	// Two authenticated denials; the anonymous one is not audited.
	app.expect_audit_events(2).await;
}

#[tokio::test]
async fn grants_are_not_audited() {
	let app = TestApp::new().await;
	let owner = app.user_with(&[Role::Owner]).await;

	let (status, _) = send(
		app.resource_router(),
		request(Method::DELETE, "/api/jobs/9", Some(owner), None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	app.expect_audit_events(0).await;
}

#[tokio::test]
async fn any_of_held_roles_grants() {
	let app = TestApp::new().await;
	// Viewer alone cannot update jobs; the technician role can.
	let user = app.user_with(&[Role::Viewer, Role::Technician]).await;

	let (status, _) = send(
		app.resource_router(),
		request(Method::PUT, "/api/jobs/3", Some(user), None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn minimum_role_uses_primary_role() {
	let app = TestApp::new().await;
	let estimator = app.user_with(&[Role::Estimator]).await;
	let admin = app.user_with(&[Role::Admin, Role::Viewer]).await;

	let (status, body) = send(
		app.resource_router(),
		request(Method::GET, "/api/reports", Some(estimator), None),
	)
	.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body["errorCode"], "INSUFFICIENT_ROLE");
	assert!(body.get("resource").is_none());

	let (status, _) = send(
		app.resource_router(),
		request(Method::GET, "/api/reports", Some(admin), None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);

	app.expect_audit_events(1).await;
	assert_eq!(
		app.audit.events()[0].resource.as_deref(),
		Some("role_hierarchy_check")
	);
}

#[tokio::test]
async fn user_without_roles_is_denied_everywhere() {
	let app = TestApp::new().await;
	let nobody = app.user_with(&[]).await;

	let cases = vec![
		AuthzCase {
			name: "no_roles_list_jobs",
			method: Method::GET,
			path: "/api/jobs".to_string(),
			user: Some(nobody),
			body: None,
			expected_status: StatusCode::FORBIDDEN,
		},
		AuthzCase {
			name: "no_roles_reports",
			method: Method::GET,
			path: "/api/reports".to_string(),
			user: Some(nobody),
			body: None,
			expected_status: StatusCode::FORBIDDEN,
		},
		AuthzCase {
			name: "no_roles_settings",
			method: Method::GET,
			path: "/api/settings".to_string(),
			user: Some(nobody),
			body: None,
			expected_status: StatusCode::FORBIDDEN,
		},
	];

	run_authz_cases(&app.resource_router(), &cases).await;
	app.expect_audit_events(3).await;
}

#[tokio::test]
async fn minimum_role_admits_equal_and_higher_ranks() {
	let app = TestApp::new().await;
	let estimator = app.user_with(&[Role::Estimator]).await;
	let owner = app.user_with(&[Role::Owner]).await;
	let technician = app.user_with(&[Role::Technician]).await;

	let cases = vec![
		AuthzCase {
			name: "estimator_meets_minimum",
			method: Method::GET,
			path: "/api/estimates".to_string(),
			user: Some(estimator),
			body: None,
			expected_status: StatusCode::OK,
		},
		AuthzCase {
			name: "owner_exceeds_minimum",
			method: Method::GET,
			path: "/api/estimates".to_string(),
			user: Some(owner),
			body: None,
			expected_status: StatusCode::OK,
		},
		AuthzCase {
			name: "technician_below_minimum",
			method: Method::GET,
			path: "/api/estimates".to_string(),
			user: Some(technician),
			body: None,
			expected_status: StatusCode::FORBIDDEN,
		},
	];

	run_authz_cases(&app.resource_router(), &cases).await;
	app.expect_audit_events(1).await;
}
