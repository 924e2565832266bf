// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit logging for Tradeflow.
//!
//! Events are queued by [`AuditLogger`] and fanned out to [`AuditSink`]s by
//! a background [`AuditService`]. Nothing here blocks or fails a request.

pub mod client_ip;
pub mod error;
pub mod filter;
pub mod logger;
pub mod pipeline;
pub mod sink;

pub use client_ip::get_client_ip;
pub use error::{AuditError, AuditResult, AuditSinkError};
pub use filter::AuditFilterConfig;
pub use logger::{AuditLogger, DataChange};
pub use pipeline::AuditService;
pub use sink::memory::MemoryAuditSink;
pub use sink::AuditSink;

pub use tradeflow_server_config::{AuditConfig, QueueOverflowPolicy};

#[cfg(feature = "sink-sqlite")]
pub use sink::sqlite::SqliteAuditSink;

#[cfg(feature = "sink-tracing")]
pub use sink::tracing::TracingAuditSink;
