// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tradeflow_server_auth::AuditEvent;
use tradeflow_server_db::{format_timestamp, is_transient_error};

use crate::error::AuditSinkError;
use crate::filter::AuditFilterConfig;
use crate::sink::AuditSink;

/// Appends events to the `audit_logs` table. Never updates or deletes.
pub struct SqliteAuditSink {
	pool: SqlitePool,
	filter: AuditFilterConfig,
	name: String,
}

impl SqliteAuditSink {
	pub fn new(pool: SqlitePool, filter: AuditFilterConfig) -> Self {
		Self {
			pool,
			filter,
			name: "sqlite".to_string(),
		}
	}
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
	fn name(&self) -> &str {
		&self.name
	}

	fn filter(&self) -> &AuditFilterConfig {
		&self.filter
	}

	async fn publish(&self, event: Arc<AuditEvent>) -> Result<(), AuditSinkError> {
		let details_json = serde_json::to_string(&event.details)
			.map_err(|e| AuditSinkError::Permanent(format!("failed to serialize details: {e}")))?;
		let roles_json = serde_json::to_string(&event.roles)
			.map_err(|e| AuditSinkError::Permanent(format!("failed to serialize roles: {e}")))?;

		let now = chrono::Utc::now();

		sqlx::query(
			r#"
			INSERT INTO audit_logs (
				id, timestamp, event_type, severity, outcome, actor_user_id, resource,
				resource_id, action, roles, ip_address, request_method, request_path,
				details, created_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(event.id.to_string())
		.bind(format_timestamp(&event.timestamp))
		.bind(event.event_type.to_string())
		.bind(event.severity.to_string())
		.bind(event.outcome.to_string())
		.bind(event.actor_user_id.as_ref().map(|u| u.to_string()))
		.bind(&event.resource)
		.bind(&event.resource_id)
		.bind(&event.action)
		.bind(&roles_json)
		.bind(&event.ip_address)
		.bind(&event.request_method)
		.bind(&event.request_path)
		.bind(&details_json)
		.bind(format_timestamp(&now))
		.execute(&self.pool)
		.await
		.map_err(|e| {
			if is_transient_error(&e) {
				AuditSinkError::Transient(format!("database error: {e}"))
			} else {
				AuditSinkError::Permanent(format!("database error: {e}"))
			}
		})?;

		Ok(())
	}

	async fn health_check(&self) -> Result<(), AuditSinkError> {
		sqlx::query("SELECT 1")
			.execute(&self.pool)
			.await
			.map_err(|e| AuditSinkError::Transient(format!("health check failed: {e}")))?;
		Ok(())
	}
}
