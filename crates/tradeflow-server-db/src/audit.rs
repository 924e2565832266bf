// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read side of the append-only `audit_logs` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row};
use tradeflow_server_auth::{AuditEvent, AuditEventType, AuditOutcome, AuditSeverity, Role, UserId};
use uuid::Uuid;

use crate::error::Result;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Filter for compliance queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditLogQuery {
	pub event_type: Option<AuditEventType>,
	pub actor_user_id: Option<UserId>,
	pub outcome: Option<AuditOutcome>,
	pub resource: Option<String>,
	pub from: Option<DateTime<Utc>>,
	pub to: Option<DateTime<Utc>>,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

#[async_trait]
pub trait AuditStore: Send + Sync {
	async fn query_logs(&self, query: &AuditLogQuery) -> Result<(Vec<AuditEvent>, i64)>;
}

#[derive(Clone)]
pub struct AuditRepository {
	pool: SqlitePool,
}

/// Timestamp encoding shared with the SQLite audit sink. Fixed width so that
/// lexicographic order equals chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

impl AuditRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Returns one page of events, newest first, and the total match count.
	#[tracing::instrument(skip(self))]
	pub async fn query_logs(&self, query: &AuditLogQuery) -> Result<(Vec<AuditEvent>, i64)> {
		let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
		let offset = query.offset.unwrap_or(0).max(0);

		let mut conditions = vec!["1=1".to_string()];
		let mut binds: Vec<String> = Vec::new();
		if let Some(v) = query.event_type {
			conditions.push("event_type = ?".to_string());
			binds.push(v.to_string());
		}
		if let Some(v) = query.actor_user_id {
			conditions.push("actor_user_id = ?".to_string());
			binds.push(v.to_string());
		}
		if let Some(v) = query.outcome {
			conditions.push("outcome = ?".to_string());
			binds.push(v.to_string());
		}
		if let Some(v) = &query.resource {
			conditions.push("resource = ?".to_string());
			binds.push(v.clone());
		}
		if let Some(v) = &query.from {
			conditions.push("timestamp >= ?".to_string());
			binds.push(format_timestamp(v));
		}
		if let Some(v) = &query.to {
			conditions.push("timestamp <= ?".to_string());
			binds.push(format_timestamp(v));
		}

		let where_clause = conditions.join(" AND ");

		let count_sql = format!("SELECT COUNT(*) as cnt FROM audit_logs WHERE {where_clause}");
		let mut count_query = sqlx::query(&count_sql);
		for v in &binds {
			count_query = count_query.bind(v);
		}
		let total: i64 = count_query.fetch_one(&self.pool).await?.get("cnt");

		let data_sql = format!(
			"SELECT id, timestamp, event_type, severity, outcome, actor_user_id, resource, \
			 resource_id, action, roles, ip_address, request_method, request_path, details \
			 FROM audit_logs WHERE {where_clause} \
			 ORDER BY timestamp DESC, rowid DESC LIMIT ? OFFSET ?"
		);
		let mut data_query = sqlx::query(&data_sql);
		for v in &binds {
			data_query = data_query.bind(v);
		}
		data_query = data_query.bind(limit).bind(offset);

		let rows = data_query.fetch_all(&self.pool).await?;
		let events: Vec<AuditEvent> = rows
			.into_iter()
			.filter_map(|row| {
				let id_str: String = row.get("id");
				let id = Uuid::parse_str(&id_str).ok()?;

				let ts_str: String = row.get("timestamp");
				let timestamp = DateTime::parse_from_rfc3339(&ts_str)
					.map(|dt| dt.with_timezone(&Utc))
					.ok()?;

				let event_type_str: String = row.get("event_type");
				let event_type: AuditEventType = event_type_str.parse().ok()?;

				let severity_str: String = row.get("severity");
				let severity = severity_str
					.parse::<AuditSeverity>()
					.unwrap_or_else(|_| event_type.default_severity());

				let outcome_str: String = row.get("outcome");
				let outcome: AuditOutcome = outcome_str.parse().ok()?;

				let actor_user_id: Option<String> = row.get("actor_user_id");
				let roles_str: String = row.get("roles");
				let details_str: Option<String> = row.get("details");

				Some(AuditEvent {
					id,
					timestamp,
					event_type,
					severity,
					outcome,
					actor_user_id: actor_user_id
						.and_then(|s| Uuid::parse_str(&s).ok())
						.map(UserId::new),
					resource: row.get("resource"),
					resource_id: row.get("resource_id"),
					action: row.get("action"),
					roles: serde_json::from_str::<Vec<Role>>(&roles_str).unwrap_or_default(),
					ip_address: row.get("ip_address"),
					request_method: row.get("request_method"),
					request_path: row.get("request_path"),
					details: details_str
						.and_then(|s| serde_json::from_str(&s).ok())
						.unwrap_or(serde_json::Value::Null),
				})
			})
			.collect();

		Ok((events, total))
	}
}

#[async_trait]
impl AuditStore for AuditRepository {
	async fn query_logs(&self, query: &AuditLogQuery) -> Result<(Vec<AuditEvent>, i64)> {
		self.query_logs(query).await
	}
}
