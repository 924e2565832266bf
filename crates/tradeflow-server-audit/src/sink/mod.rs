// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use tradeflow_server_auth::AuditEvent;

use crate::error::AuditSinkError;
use crate::filter::AuditFilterConfig;

pub mod memory;

#[cfg(feature = "sink-sqlite")]
pub mod sqlite;

#[cfg(feature = "sink-tracing")]
pub mod tracing;

/// A destination for audit events.
///
/// Sinks only ever append. Each publish runs in its own task, so a slow sink
/// does not hold up the others.
#[async_trait]
pub trait AuditSink: Send + Sync {
	fn name(&self) -> &str;

	fn filter(&self) -> &AuditFilterConfig;

	async fn publish(&self, event: Arc<AuditEvent>) -> Result<(), AuditSinkError>;

	async fn health_check(&self) -> Result<(), AuditSinkError> {
		Ok(())
	}
}
