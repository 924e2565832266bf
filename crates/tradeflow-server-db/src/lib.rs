// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for Tradeflow server.
//!
//! - [`RoleRepository`]: persistent role assignments, implementing the auth
//!   crate's `RoleStore`
//! - [`AuditRepository`]: compliance queries over the append-only audit log
//! - [`create_pool`] / [`run_migrations`]: SQLite pool setup

pub mod audit;
pub mod error;
pub mod pool;
pub mod role;
pub mod testing;

pub use audit::{format_timestamp, AuditLogQuery, AuditRepository, AuditStore};
pub use error::{is_transient_error, DbError, Result};
pub use pool::{create_pool, run_migrations};
pub use role::RoleRepository;
