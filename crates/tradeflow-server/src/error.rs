// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;
use tradeflow_server_auth::{Denial, RoleLoadError};
use tradeflow_server_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("Database error: {0}")]
	Db(#[from] DbError),

	#[error("Invalid request: {0}")]
	BadRequest(String),

	/// The role store could not be reached or returned bad data.
	#[error("Role store error: {0}")]
	RoleStore(String),

	#[error("Internal error: {0}")]
	Internal(String),

	/// An authorization decision made inside a handler.
	#[error("Access denied: {}", .0.error_code)]
	Denied(Denial),
}

impl From<RoleLoadError> for ServerError {
	fn from(e: RoleLoadError) -> Self {
		match e {
			RoleLoadError::NotAssignable(role) => {
				ServerError::BadRequest(format!("role '{role}' cannot be assigned"))
			}
			other => ServerError::RoleStore(other.to_string()),
		}
	}
}

impl From<Denial> for ServerError {
	fn from(denial: Denial) -> Self {
		ServerError::Denied(denial)
	}
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ErrorResponse {
	fn new(error: &str, message: impl Into<String>) -> Self {
		Self {
			error: error.to_string(),
			message: message.into(),
		}
	}
}

/// Renders a [`Denial`] with its own status and JSON shape.
pub fn denial_response(denial: Denial) -> Response {
	(denial.status(), Json(denial)).into_response()
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, body) = match self {
			ServerError::Denied(denial) => return denial_response(denial),
			ServerError::Db(e) => {
				tracing::error!(error = %e, "database error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse::new("database_error", "A database error occurred"),
				)
			}
			ServerError::BadRequest(msg) => (
				StatusCode::BAD_REQUEST,
				ErrorResponse::new("bad_request", msg),
			),
			ServerError::RoleStore(msg) => {
				tracing::warn!(error = %msg, "role store unavailable");
				(
					StatusCode::SERVICE_UNAVAILABLE,
					ErrorResponse::new("role_store_unavailable", "Role store is unavailable"),
				)
			}
			ServerError::Internal(msg) => {
				tracing::error!(error = %msg, "internal error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse::new("internal_error", "An internal error occurred"),
				)
			}
		};
		(status, Json(body)).into_response()
	}
}
