// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit logging configuration section.

use serde::{Deserialize, Serialize};

const DEFAULT_QUEUE_CAPACITY: usize = 10000;

fn default_queue_capacity() -> usize {
	DEFAULT_QUEUE_CAPACITY
}

/// What the audit queue does when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueOverflowPolicy {
	/// Reject the new event; the caller logs the rejection.
	#[default]
	DropNewest,
	/// Hand the event to a spawned sender that waits for capacity.
	Block,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditConfigLayer {
	pub enabled: Option<bool>,
	pub queue_capacity: Option<usize>,
	pub queue_overflow_policy: Option<QueueOverflowPolicy>,
	pub min_severity: Option<String>,
}

impl AuditConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.queue_capacity.is_some() {
			self.queue_capacity = other.queue_capacity;
		}
		if other.queue_overflow_policy.is_some() {
			self.queue_overflow_policy = other.queue_overflow_policy;
		}
		if other.min_severity.is_some() {
			self.min_severity = other.min_severity;
		}
	}

	pub fn finalize(self) -> AuditConfig {
		AuditConfig {
			enabled: self.enabled.unwrap_or(true),
			queue_capacity: self.queue_capacity.unwrap_or_else(default_queue_capacity),
			queue_overflow_policy: self.queue_overflow_policy.unwrap_or_default(),
			min_severity: self
				.min_severity
				.map(|s| s.to_ascii_lowercase())
				.unwrap_or_else(|| "info".to_string()),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditConfig {
	pub enabled: bool,
	pub queue_capacity: usize,
	pub queue_overflow_policy: QueueOverflowPolicy,
	/// Lowest severity forwarded to sinks (`debug` .. `critical`).
	pub min_severity: String,
}

impl Default for AuditConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			queue_capacity: default_queue_capacity(),
			queue_overflow_policy: QueueOverflowPolicy::default(),
			min_severity: "info".to_string(),
		}
	}
}
