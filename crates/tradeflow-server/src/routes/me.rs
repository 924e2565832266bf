// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use tradeflow_server_auth::{Action, AuthContext, Resource, Role, UserId};

use crate::api::AppState;
use crate::error::ServerError;
use crate::routes::require_user;

#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
	pub user_id: UserId,
	pub roles: Vec<Role>,
	pub primary_role: Role,
	/// Resources with at least one permitted action.
	pub permissions: BTreeMap<Resource, Vec<Action>>,
}

/// GET /api/me/permissions
pub async fn get_my_permissions(
	State(state): State<AppState>,
	Extension(ctx): Extension<AuthContext>,
) -> Result<Json<PermissionsResponse>, ServerError> {
	let user = require_user(&ctx)?;

	let permissions: BTreeMap<Resource, Vec<Action>> = Resource::all()
		.iter()
		.filter_map(|resource| {
			let actions = state
				.matrix
				.permitted_actions_for_roles(&user.roles, *resource);
			(!actions.is_empty()).then(|| (*resource, actions.into_iter().collect::<Vec<_>>()))
		})
		.collect();

	Ok(Json(PermissionsResponse {
		user_id: user.user_id,
		roles: user.roles.clone(),
		primary_role: user.primary_role,
		permissions,
	}))
}
