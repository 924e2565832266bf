// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event filtering applied globally and per sink.

use tradeflow_server_auth::{AuditEvent, AuditEventType, AuditSeverity};
use tradeflow_server_config::AuditConfig;

use crate::error::AuditError;

#[derive(Debug, Clone, PartialEq)]
pub struct AuditFilterConfig {
	pub min_severity: AuditSeverity,
	/// When set, only these event types pass.
	pub include_events: Option<Vec<AuditEventType>>,
	pub exclude_events: Option<Vec<AuditEventType>>,
}

impl Default for AuditFilterConfig {
	fn default() -> Self {
		Self {
			min_severity: AuditSeverity::Debug,
			include_events: None,
			exclude_events: None,
		}
	}
}

impl AuditFilterConfig {
	/// Global filter derived from the `[audit]` config section.
	pub fn from_config(config: &AuditConfig) -> Result<Self, AuditError> {
		let min_severity = config
			.min_severity
			.parse::<AuditSeverity>()
			.map_err(AuditError::ConfigError)?;
		Ok(Self {
			min_severity,
			..Default::default()
		})
	}

	pub fn allows(&self, event: &AuditEvent) -> bool {
		if event.severity < self.min_severity {
			return false;
		}
		if let Some(include) = &self.include_events {
			if !include.contains(&event.event_type) {
				return false;
			}
		}
		if let Some(exclude) = &self.exclude_events {
			if exclude.contains(&event.event_type) {
				return false;
			}
		}
		true
	}
}
