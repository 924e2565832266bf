// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tradeflow_server_auth::RoleStoreError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Migration error: {0}")]
	Migration(#[from] sqlx::migrate::MigrateError),

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for RoleStoreError {
	fn from(e: DbError) -> Self {
		match e {
			DbError::Sqlx(_) | DbError::Migration(_) => RoleStoreError::Unavailable(e.to_string()),
			DbError::Internal(_) | DbError::Serialization(_) => RoleStoreError::Corrupt(e.to_string()),
		}
	}
}

/// Returns true for errors worth retrying: I/O, pool exhaustion and lock contention.
pub fn is_transient_error(e: &sqlx::Error) -> bool {
	match e {
		sqlx::Error::Io(_) => true,
		sqlx::Error::PoolTimedOut => true,
		sqlx::Error::PoolClosed => true,
		sqlx::Error::Database(db_err) => {
			let msg = db_err.message().to_lowercase();
			msg.contains("busy") || msg.contains("locked") || msg.contains("timeout")
		}
		_ => false,
	}
}
