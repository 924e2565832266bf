// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router assembly.

use std::sync::Arc;

use axum::{
	http::HeaderName,
	middleware::from_fn_with_state,
	routing::{delete, get, post},
	Router,
};
use sqlx::SqlitePool;
use tradeflow_server_audit::{
	AuditFilterConfig, AuditLogger, AuditSink, SqliteAuditSink, TracingAuditSink,
};
use tradeflow_server_auth::{Action, PermissionsMatrix, Resource, RoleLoader};
use tradeflow_server_config::ServerConfig;
use tradeflow_server_db::{AuditRepository, AuditStore, RoleRepository};

use crate::authz_middleware::{load_user_context_layer, Gates};
use crate::error::ServerError;
use crate::routes;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub role_loader: Arc<RoleLoader>,
	pub matrix: Arc<PermissionsMatrix>,
	pub audit: AuditLogger,
	pub audit_repo: Arc<dyn AuditStore>,
	/// Trusted header carrying the caller's user id, if configured.
	pub identity_header: Option<HeaderName>,
}

impl AppState {
	pub fn gates(&self) -> Gates {
		Gates::new(Arc::clone(&self.matrix), self.audit.clone())
	}
}

/// Wires repositories, the role cache and the audit pipeline over `pool`.
///
/// Must be called inside a Tokio runtime: the audit pipeline spawns its
/// background task here.
pub fn create_app_state(pool: SqlitePool, config: &ServerConfig) -> Result<AppState, ServerError> {
	let role_store = Arc::new(RoleRepository::new(pool.clone()));
	let role_loader = Arc::new(RoleLoader::new(role_store, config.authz.role_cache_ttl()));

	let sinks: Vec<Arc<dyn AuditSink>> = vec![
		Arc::new(SqliteAuditSink::new(pool.clone(), AuditFilterConfig::default())),
		Arc::new(TracingAuditSink::new(AuditFilterConfig::default())),
	];
	let audit = AuditLogger::from_config(&config.audit, sinks)
		.map_err(|e| ServerError::Internal(format!("audit pipeline: {e}")))?;

	let identity_header = config
		.authz
		.identity_header
		.as_deref()
		.map(HeaderName::try_from)
		.transpose()
		.map_err(|e| ServerError::Internal(format!("invalid identity header: {e}")))?;

	tracing::info!(
		role_cache_ttl_secs = config.authz.role_cache_ttl_secs,
		audit_enabled = audit.is_enabled(),
		identity_header = ?identity_header,
		"application state created"
	);

	Ok(AppState {
		audit_repo: Arc::new(AuditRepository::new(pool.clone())),
		pool,
		role_loader,
		matrix: Arc::new(PermissionsMatrix::standard().clone()),
		audit,
		identity_header,
	})
}

fn admin_routes(gates: &Gates) -> Router<AppState> {
	let role_admin = Router::new()
		.route("/users/{user_id}/roles", post(routes::admin::assign_role))
		.route(
			"/users/{user_id}/roles/{role}",
			delete(routes::admin::remove_role),
		)
		.route_layer(gates.owner_or_admin());

	let audit_logs = Router::new()
		.route("/audit-logs", get(routes::admin::list_audit_logs))
		.route_layer(gates.require_permission(Resource::AuditLogs, Action::Read));

	role_admin.merge(audit_logs)
}

/// Create the API router with all routes.
pub fn create_router(state: AppState) -> Router {
	let gates = state.gates();

	// Public routes - no authorization
	let public = Router::new().route("/health", get(routes::health::health_check));

	let protected = Router::new()
		.route(
			"/api/me/permissions",
			get(routes::me::get_my_permissions),
		)
		.nest("/api/admin", admin_routes(&gates))
		.layer(from_fn_with_state(state.clone(), load_user_context_layer));

	Router::new()
		.merge(public)
		.merge(protected)
		.with_state(state)
}
