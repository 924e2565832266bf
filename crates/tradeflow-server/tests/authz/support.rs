// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
	body::Body,
	http::{Method, Request, StatusCode},
	middleware::from_fn_with_state,
	routing::get,
	Router,
};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;
use tradeflow_server::{create_router, load_user_context_layer, AppState};
use tradeflow_server_audit::{
	AuditFilterConfig, AuditLogger, AuditService, MemoryAuditSink, QueueOverflowPolicy,
};
use tradeflow_server_auth::{
	Identity, MemoryRoleStore, PermissionsMatrix, Resource, Role, RoleLoader, RoleMutation,
	RoleStore, RoleStoreError, UserId, UserRoleAssignment, DEFAULT_ROLE_CACHE_TTL,
};
use tradeflow_server_db::testing::create_migrated_test_pool;
use tradeflow_server_db::{AuditRepository, RoleRepository};

pub const WAIT: Duration = Duration::from_secs(5);

/// Role store that counts reads and can be switched off.
#[derive(Default)]
pub struct CountingStore {
	inner: MemoryRoleStore,
	pub reads: AtomicUsize,
	pub unavailable: std::sync::atomic::AtomicBool,
}

impl CountingStore {
	pub fn reads(&self) -> usize {
		self.reads.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl RoleStore for CountingStore {
	async fn read_roles(&self, user_id: &UserId) -> Result<Vec<UserRoleAssignment>, RoleStoreError> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		if self.unavailable.load(Ordering::SeqCst) {
			return Err(RoleStoreError::Unavailable("store offline".to_string()));
		}
		self.inner.read_roles(user_id).await
	}

	async fn write_role(
		&self,
		user_id: &UserId,
		role: Role,
		mutation: RoleMutation,
	) -> Result<(), RoleStoreError> {
		self.inner.write_role(user_id, role, mutation).await
	}
}

pub struct TestApp {
	pub state: AppState,
	pub pool: SqlitePool,
	pub audit: Arc<MemoryAuditSink>,
}

impl TestApp {
	/// App backed by the SQLite role repository.
	pub async fn new() -> Self {
		let pool = create_migrated_test_pool().await;
		let store = Arc::new(RoleRepository::new(pool.clone()));
		Self::with_store(pool, store)
	}

	pub fn with_store(pool: SqlitePool, store: Arc<dyn RoleStore>) -> Self {
		let audit = Arc::new(MemoryAuditSink::new());
		let service = AuditService::new(
			AuditFilterConfig::default(),
			1000,
			QueueOverflowPolicy::DropNewest,
			vec![audit.clone()],
		);
		let state = AppState {
			audit_repo: Arc::new(AuditRepository::new(pool.clone())),
			pool: pool.clone(),
			role_loader: Arc::new(RoleLoader::new(store, DEFAULT_ROLE_CACHE_TTL)),
			matrix: Arc::new(PermissionsMatrix::standard().clone()),
			audit: AuditLogger::new(service),
			identity_header: None,
		};
		Self { state, pool, audit }
	}

	pub fn router(&self) -> Router {
		create_router(self.state.clone())
	}

	/// A router with resource routes guarded by the generic gates.
	pub fn resource_router(&self) -> Router {
		let gates = self.state.gates();
		let jobs = Router::new()
			.route("/api/jobs", get(ok).post(ok))
			.route("/api/jobs/{id}", get(ok).put(ok).patch(ok).delete(ok))
			.route_layer(gates.require_resource_permission(Resource::Jobs));
		let reports = Router::new()
			.route("/api/reports", get(ok))
			.route_layer(gates.manager_or_above());
		let settings = Router::new()
			.route("/api/settings", get(ok))
			.route_layer(gates.require_role(vec![Role::Owner]));
		let estimates = Router::new()
			.route("/api/estimates", get(ok))
			.route_layer(gates.require_minimum_role(Role::Estimator));

		jobs.merge(reports)
			.merge(settings)
			.merge(estimates)
			.layer(from_fn_with_state(self.state.clone(), load_user_context_layer))
			.with_state(self.state.clone())
	}

	/// Persists roles for a fresh user directly in the database.
	pub async fn user_with(&self, roles: &[Role]) -> UserId {
		let user = UserId::generate();
		let repo = RoleRepository::new(self.pool.clone());
		for role in roles {
			repo.assign_role(&user, *role).await.unwrap();
		}
		user
	}

	/// Waits for `count` audit events, then checks no more arrive.
	pub async fn expect_audit_events(&self, count: usize) {
		if count > 0 {
			assert!(
				self.audit.wait_for_count(count, WAIT).await,
				"expected {count} audit events, got {}",
				self.audit.len()
			);
		}
		tokio::time::sleep(Duration::from_millis(50)).await;
		assert_eq!(self.audit.len(), count, "unexpected extra audit events");
	}
}

async fn ok() -> &'static str {
	"ok"
}

pub fn request(method: Method, path: &str, user: Option<UserId>, body: Option<Value>) -> Request<Body> {
	let mut builder = Request::builder().method(method).uri(path);
	if let Some(user) = user {
		builder = builder.extension(Identity::new(user));
	}
	match body {
		Some(body) => builder
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.unwrap(),
		None => builder.body(Body::empty()).unwrap(),
	}
}

pub async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
	let resp = router.oneshot(req).await.unwrap();
	let status = resp.status();
	let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
		.await
		.unwrap();
	let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
	(status, body)
}

pub struct AuthzCase {
	pub name: &'static str,
	pub method: Method,
	pub path: String,
	pub user: Option<UserId>,
	pub body: Option<Value>,
	pub expected_status: StatusCode,
}

pub async fn run_authz_cases(router: &Router, cases: &[AuthzCase]) {
	for case in cases {
		let req = request(case.method.clone(), &case.path, case.user, case.body.clone());
		let (status, body) = send(router.clone(), req).await;
		assert_eq!(
			status, case.expected_status,
			"case '{}' failed: expected {}, got {} ({body})",
			case.name, case.expected_status, status
		);
	}
}
