// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use tradeflow_server_auth::{
	Role, RoleMutation, RoleStore, RoleStoreError, UserId, UserRoleAssignment,
};

use crate::error::Result;

/// SQLite-backed role assignments.
///
/// `(user_id, role)` is the primary key, so assigning a held role and removing
/// an absent one are both no-ops.
#[derive(Clone)]
pub struct RoleRepository {
	pool: SqlitePool,
}

impl RoleRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Rows whose role name or assignment time does not parse are skipped with
	/// a warning.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn get_roles(&self, user_id: &UserId) -> Result<Vec<UserRoleAssignment>> {
		let rows = sqlx::query(
			r#"
			SELECT role, assigned_at
			FROM user_roles
			WHERE user_id = ?
			ORDER BY assigned_at
			"#,
		)
		.bind(user_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let assignments = rows
			.into_iter()
			.filter_map(|row| {
				let role_str: String = row.get("role");
				let role = match role_str.parse::<Role>() {
					Ok(role) => role,
					Err(e) => {
						tracing::warn!(role = %role_str, error = %e, "skipping unknown stored role");
						return None;
					}
				};

				let assigned_str: String = row.get("assigned_at");
				let assigned_at = match DateTime::parse_from_rfc3339(&assigned_str) {
					Ok(dt) => dt.with_timezone(&Utc),
					Err(e) => {
						tracing::warn!(
							role = %role,
							assigned_at = %assigned_str,
							error = %e,
							"skipping role with unreadable assignment time"
						);
						return None;
					}
				};

				Some(UserRoleAssignment {
					user_id: *user_id,
					role,
					assigned_at,
				})
			})
			.collect();

		Ok(assignments)
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id, role = %role))]
	pub async fn assign_role(&self, user_id: &UserId, role: Role) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO user_roles (user_id, role, assigned_at)
			VALUES (?, ?, ?)
			ON CONFLICT (user_id, role) DO NOTHING
			"#,
		)
		.bind(user_id.to_string())
		.bind(role.as_str())
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!("role assignment persisted");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id, role = %role))]
	pub async fn remove_role(&self, user_id: &UserId, role: Role) -> Result<()> {
		let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role = ?")
			.bind(user_id.to_string())
			.bind(role.as_str())
			.execute(&self.pool)
			.await?;

		tracing::debug!(rows = result.rows_affected(), "role removal persisted");
		Ok(())
	}
}

#[async_trait]
impl RoleStore for RoleRepository {
	async fn read_roles(&self, user_id: &UserId) -> std::result::Result<Vec<UserRoleAssignment>, RoleStoreError> {
		Ok(self.get_roles(user_id).await?)
	}

	async fn write_role(
		&self,
		user_id: &UserId,
		role: Role,
		mutation: RoleMutation,
	) -> std::result::Result<(), RoleStoreError> {
		match mutation {
			RoleMutation::Assign => self.assign_role(user_id, role).await?,
			RoleMutation::Remove => self.remove_role(user_id, role).await?,
		}
		Ok(())
	}
}
