// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health HTTP handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
	Healthy,
	Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: HealthStatus,
	pub database: HealthStatus,
	pub audit_enabled: bool,
	pub cached_users: usize,
	pub role_cache_ttl_secs: u64,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
		Ok(_) => HealthStatus::Healthy,
		Err(e) => {
			tracing::warn!(error = %e, "database health check failed");
			HealthStatus::Unhealthy
		}
	};

	let response = HealthResponse {
		status: database,
		database,
		audit_enabled: state.audit.is_enabled(),
		cached_users: state.role_loader.cached_user_count(),
		role_cache_ttl_secs: state.role_loader.ttl().as_secs(),
	};

	let status = match response.status {
		HealthStatus::Healthy => StatusCode::OK,
		HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
	};
	(status, Json(response))
}
