// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role administration and audit log review.
//!
//! Role changes persist first and invalidate the cached role set second, so
//! the target user's next request sees the change.

use axum::{
	extract::{Path, Query, State},
	Extension, Json,
};
use serde::{Deserialize, Serialize};
use tradeflow_server_auth::{
	AuditEvent, AuthContext, Denial, Role, RoleChange, UserContext, UserId,
	ROLE_CHECK_RESOURCE,
};
use tradeflow_server_db::audit::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use tradeflow_server_db::AuditLogQuery;

use crate::api::AppState;
use crate::error::ServerError;
use crate::routes::{require_user, RequestMeta};

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
	/// Role name, parsed by the handler so unknown names answer 400.
	pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RoleChangeResponse {
	pub user_id: UserId,
	pub role: Role,
	pub mutation: String,
	/// False when the cached role set could not be dropped; the change then
	/// becomes visible once the cache entry expires.
	pub cache_invalidated: bool,
}

impl From<RoleChange> for RoleChangeResponse {
	fn from(change: RoleChange) -> Self {
		Self {
			user_id: change.user_id,
			role: change.role,
			mutation: change.mutation.to_string(),
			cache_invalidated: change.cache_invalidated,
		}
	}
}

#[derive(Debug, Serialize)]
pub struct AuditLogsResponse {
	pub events: Vec<AuditEvent>,
	pub total: i64,
	pub limit: i64,
	pub offset: i64,
}

fn parse_user_id(raw: &str) -> Result<UserId, ServerError> {
	raw.parse()
		.map_err(|_| ServerError::BadRequest(format!("invalid user id '{raw}'")))
}

fn parse_role(raw: &str) -> Result<Role, ServerError> {
	raw.parse().map_err(|e| ServerError::BadRequest(format!("{e}")))
}

/// Only an owner may grant or revoke the owner role.
fn check_owner_escalation(
	state: &AppState,
	actor: &UserContext,
	role: Role,
	meta: &RequestMeta,
) -> Result<(), ServerError> {
	if role == Role::Owner && actor.primary_role != Role::Owner {
		state.audit.log_permission_denied(
			actor,
			ROLE_CHECK_RESOURCE,
			None,
			&meta.0,
			"only an owner may grant or revoke the owner role",
		);
		return Err(Denial::insufficient_role().into());
	}
	Ok(())
}

/// POST /api/admin/users/{user_id}/roles
#[tracing::instrument(skip_all, fields(target_user_id = %user_id, role = %body.role))]
pub async fn assign_role(
	State(state): State<AppState>,
	Extension(ctx): Extension<AuthContext>,
	Path(user_id): Path<String>,
	meta: RequestMeta,
	Json(body): Json<AssignRoleRequest>,
) -> Result<Json<RoleChangeResponse>, ServerError> {
	let actor = require_user(&ctx)?;
	let target = parse_user_id(&user_id)?;
	let role = parse_role(&body.role)?;
	check_owner_escalation(&state, actor, role, &meta)?;

	let change = state.role_loader.assign_role(&target, role).await?;
	state.audit.log_role_change(actor, &change, &meta.0);
	tracing::info!(actor = %actor.user_id, role = %change.role, "role assigned");

	Ok(Json(change.into()))
}

/// DELETE /api/admin/users/{user_id}/roles/{role}
#[tracing::instrument(skip_all, fields(target_user_id = %user_id, role = %role))]
pub async fn remove_role(
	State(state): State<AppState>,
	Extension(ctx): Extension<AuthContext>,
	Path((user_id, role)): Path<(String, String)>,
	meta: RequestMeta,
) -> Result<Json<RoleChangeResponse>, ServerError> {
	let actor = require_user(&ctx)?;
	let target = parse_user_id(&user_id)?;
	let role = parse_role(&role)?;
	check_owner_escalation(&state, actor, role, &meta)?;

	let change = state.role_loader.remove_role(&target, role).await?;
	state.audit.log_role_change(actor, &change, &meta.0);
	tracing::info!(actor = %actor.user_id, role = %change.role, "role removed");

	Ok(Json(change.into()))
}

/// GET /api/admin/audit-logs
pub async fn list_audit_logs(
	State(state): State<AppState>,
	Query(query): Query<AuditLogQuery>,
) -> Result<Json<AuditLogsResponse>, ServerError> {
	let (events, total) = state.audit_repo.query_logs(&query).await?;

	Ok(Json(AuditLogsResponse {
		events,
		total,
		limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
		offset: query.offset.unwrap_or(0).max(0),
	}))
}
