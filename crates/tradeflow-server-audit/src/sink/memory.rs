// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tradeflow_server_auth::AuditEvent;

use crate::error::AuditSinkError;
use crate::filter::AuditFilterConfig;
use crate::sink::AuditSink;

/// Keeps published events in memory. Used by tests and embedders that want
/// to inspect the audit trail directly.
#[derive(Default)]
pub struct MemoryAuditSink {
	filter: AuditFilterConfig,
	events: Mutex<Vec<Arc<AuditEvent>>>,
	published: Notify,
}

impl MemoryAuditSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_filter(filter: AuditFilterConfig) -> Self {
		Self {
			filter,
			..Default::default()
		}
	}

	fn lock(&self) -> MutexGuard<'_, Vec<Arc<AuditEvent>>> {
		self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Snapshot of everything published so far, in arrival order.
	pub fn events(&self) -> Vec<Arc<AuditEvent>> {
		self.lock().clone()
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Waits until at least `count` events have arrived. Returns false on timeout.
	pub async fn wait_for_count(&self, count: usize, timeout: Duration) -> bool {
		let deadline = tokio::time::Instant::now() + timeout;
		loop {
			let notified = self.published.notified();
			if self.len() >= count {
				return true;
			}
			if tokio::time::timeout_at(deadline, notified).await.is_err() {
				return self.len() >= count;
			}
		}
	}
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
	fn name(&self) -> &str {
		"memory"
	}

	fn filter(&self) -> &AuditFilterConfig {
		&self.filter
	}

	async fn publish(&self, event: Arc<AuditEvent>) -> Result<(), AuditSinkError> {
		self.lock().push(event);
		self.published.notify_waiters();
		Ok(())
	}
}
