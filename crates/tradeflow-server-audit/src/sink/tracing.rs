// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use tradeflow_server_auth::{AuditEvent, AuditSeverity};

use crate::error::AuditSinkError;
use crate::filter::AuditFilterConfig;
use crate::sink::AuditSink;

/// Emits each event as a structured `tracing` event on the `audit` target.
pub struct TracingAuditSink {
	filter: AuditFilterConfig,
	name: String,
}

impl TracingAuditSink {
	pub fn new(filter: AuditFilterConfig) -> Self {
		Self {
			filter,
			name: "tracing".to_string(),
		}
	}
}

#[async_trait]
impl AuditSink for TracingAuditSink {
	fn name(&self) -> &str {
		&self.name
	}

	fn filter(&self) -> &AuditFilterConfig {
		&self.filter
	}

	async fn publish(&self, event: Arc<AuditEvent>) -> Result<(), AuditSinkError> {
		let actor = event
			.actor_user_id
			.map(|u| u.to_string())
			.unwrap_or_default();
		let roles = event
			.roles
			.iter()
			.map(|r| r.as_str())
			.collect::<Vec<_>>()
			.join(",");

		macro_rules! emit {
			($level:ident) => {
				::tracing::$level!(
					target: "audit",
					event_id = %event.id,
					event_type = %event.event_type,
					outcome = %event.outcome,
					actor = %actor,
					resource = event.resource.as_deref().unwrap_or(""),
					resource_id = event.resource_id.as_deref().unwrap_or(""),
					action = event.action.as_deref().unwrap_or(""),
					roles = %roles,
					ip_address = event.ip_address.as_deref().unwrap_or(""),
					method = event.request_method.as_deref().unwrap_or(""),
					path = event.request_path.as_deref().unwrap_or(""),
					"audit event"
				)
			};
		}

		match event.severity {
			AuditSeverity::Debug => emit!(debug),
			AuditSeverity::Info | AuditSeverity::Notice => emit!(info),
			AuditSeverity::Warning => emit!(warn),
			AuditSeverity::Error | AuditSeverity::Critical => emit!(error),
		}

		Ok(())
	}
}
