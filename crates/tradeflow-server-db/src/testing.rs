// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Helpers for tests that need a migrated database.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::pool::run_migrations;

/// In-memory pool pinned to one connection so every query sees the same database.
pub async fn create_test_pool() -> SqlitePool {
	SqlitePoolOptions::new()
		.max_connections(1)
		.idle_timeout(None)
		.max_lifetime(None)
		.connect(":memory:")
		.await
		.unwrap()
}

/// [`create_test_pool`] with all migrations applied.
pub async fn create_migrated_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	run_migrations(&pool).await.unwrap();
	pool
}
