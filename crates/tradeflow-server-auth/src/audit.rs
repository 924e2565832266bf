// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit event record.
//!
//! - [`AuditEventType`]: what happened
//! - [`AuditSeverity`]: RFC 5424-compatible severity levels
//! - [`AuditOutcome`]: granted, denied, success or failure
//! - [`AuditEvent`]: the immutable record handed to the audit pipeline
//! - [`AuditEventBuilder`]: fluent construction
//!
//! Events are created once and never mutated after [`AuditEventBuilder::build`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::types::{Role, UserId};

/// Types of events recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
	// Access control
	AccessDenied,
	AccessGranted,

	// Authentication
	Login,
	LoginFailed,
	Logout,

	// Data changes
	DataCreated,
	DataUpdated,
	DataDeleted,

	// Role administration
	RoleAssigned,
	RoleRemoved,
}

impl AuditEventType {
	pub fn all() -> &'static [AuditEventType] {
		&[
			AuditEventType::AccessDenied,
			AuditEventType::AccessGranted,
			AuditEventType::Login,
			AuditEventType::LoginFailed,
			AuditEventType::Logout,
			AuditEventType::DataCreated,
			AuditEventType::DataUpdated,
			AuditEventType::DataDeleted,
			AuditEventType::RoleAssigned,
			AuditEventType::RoleRemoved,
		]
	}

	/// Returns the default severity for this event type.
	///
	/// - `Info`: normal operations (login, grants, creates and updates)
	/// - `Notice`: administrative actions (deletions, role changes)
	/// - `Warning`: security-relevant failures (denials, failed logins)
	pub fn default_severity(&self) -> AuditSeverity {
		match self {
			AuditEventType::AccessGranted
			| AuditEventType::Login
			| AuditEventType::Logout
			| AuditEventType::DataCreated
			| AuditEventType::DataUpdated => AuditSeverity::Info,

			AuditEventType::DataDeleted
			| AuditEventType::RoleAssigned
			| AuditEventType::RoleRemoved => AuditSeverity::Notice,

			AuditEventType::AccessDenied | AuditEventType::LoginFailed => AuditSeverity::Warning,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AuditEventType::AccessDenied => "access_denied",
			AuditEventType::AccessGranted => "access_granted",
			AuditEventType::Login => "login",
			AuditEventType::LoginFailed => "login_failed",
			AuditEventType::Logout => "logout",
			AuditEventType::DataCreated => "data_created",
			AuditEventType::DataUpdated => "data_updated",
			AuditEventType::DataDeleted => "data_deleted",
			AuditEventType::RoleAssigned => "role_assigned",
			AuditEventType::RoleRemoved => "role_removed",
		}
	}
}

impl fmt::Display for AuditEventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AuditEventType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		AuditEventType::all()
			.iter()
			.copied()
			.find(|t| t.as_str() == s)
			.ok_or_else(|| format!("unknown audit event type '{s}'"))
	}
}

/// RFC 5424 severity levels. A lower syslog code is a more severe event, so
/// `Ord` is reversed: `Critical > Error > Warning > Notice > Info > Debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
	Debug = 7,
	#[default]
	Info = 6,
	Notice = 5,
	Warning = 4,
	Error = 3,
	Critical = 2,
}

impl AuditSeverity {
	pub fn as_syslog_code(&self) -> u8 {
		*self as u8
	}

	pub fn all() -> &'static [AuditSeverity] {
		&[
			AuditSeverity::Debug,
			AuditSeverity::Info,
			AuditSeverity::Notice,
			AuditSeverity::Warning,
			AuditSeverity::Error,
			AuditSeverity::Critical,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AuditSeverity::Debug => "debug",
			AuditSeverity::Info => "info",
			AuditSeverity::Notice => "notice",
			AuditSeverity::Warning => "warning",
			AuditSeverity::Error => "error",
			AuditSeverity::Critical => "critical",
		}
	}
}

impl PartialOrd for AuditSeverity {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for AuditSeverity {
	fn cmp(&self, other: &Self) -> Ordering {
		(*other as u8).cmp(&(*self as u8))
	}
}

impl fmt::Display for AuditSeverity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AuditSeverity {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		AuditSeverity::all()
			.iter()
			.copied()
			.find(|sev| sev.as_str() == s)
			.ok_or_else(|| format!("unknown audit severity '{s}'"))
	}
}

/// Result recorded for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
	Granted,
	Denied,
	Success,
	Failure,
}

impl AuditOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			AuditOutcome::Granted => "granted",
			AuditOutcome::Denied => "denied",
			AuditOutcome::Success => "success",
			AuditOutcome::Failure => "failure",
		}
	}
}

impl fmt::Display for AuditOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AuditOutcome {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"granted" => Ok(AuditOutcome::Granted),
			"denied" => Ok(AuditOutcome::Denied),
			"success" => Ok(AuditOutcome::Success),
			"failure" => Ok(AuditOutcome::Failure),
			other => Err(format!("unknown audit outcome '{other}'")),
		}
	}
}

/// An append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
	pub id: Uuid,
	pub timestamp: DateTime<Utc>,
	pub event_type: AuditEventType,
	pub severity: AuditSeverity,
	pub outcome: AuditOutcome,

	/// Subject of the decision, when one is known.
	pub actor_user_id: Option<UserId>,

	/// Resource name, or a pseudo-resource such as `role_check` for role gates.
	pub resource: Option<String>,
	pub resource_id: Option<String>,
	pub action: Option<String>,

	/// Roles held by the actor when the event was recorded.
	pub roles: Vec<Role>,

	pub ip_address: Option<String>,
	pub request_method: Option<String>,
	pub request_path: Option<String>,

	pub details: serde_json::Value,
}

impl AuditEvent {
	pub fn builder(event_type: AuditEventType, outcome: AuditOutcome) -> AuditEventBuilder {
		AuditEventBuilder::new(event_type, outcome)
	}
}

/// Builder for [`AuditEvent`].
#[derive(Debug, Clone)]
pub struct AuditEventBuilder {
	event_type: AuditEventType,
	outcome: AuditOutcome,
	severity: Option<AuditSeverity>,
	actor_user_id: Option<UserId>,
	resource: Option<String>,
	resource_id: Option<String>,
	action: Option<String>,
	roles: Vec<Role>,
	ip_address: Option<String>,
	request_method: Option<String>,
	request_path: Option<String>,
	details: serde_json::Value,
}

impl AuditEventBuilder {
	pub fn new(event_type: AuditEventType, outcome: AuditOutcome) -> Self {
		Self {
			event_type,
			outcome,
			severity: None,
			actor_user_id: None,
			resource: None,
			resource_id: None,
			action: None,
			roles: Vec::new(),
			ip_address: None,
			request_method: None,
			request_path: None,
			details: serde_json::Value::Null,
		}
	}

	/// Set the severity level. Defaults to the event type's default severity.
	pub fn severity(mut self, severity: AuditSeverity) -> Self {
		self.severity = Some(severity);
		self
	}

	pub fn actor(mut self, user_id: UserId) -> Self {
		self.actor_user_id = Some(user_id);
		self
	}

	pub fn resource(mut self, resource: impl Into<String>) -> Self {
		self.resource = Some(resource.into());
		self
	}

	pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
		self.resource_id = Some(resource_id.into());
		self
	}

	pub fn action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	pub fn roles(mut self, roles: impl Into<Vec<Role>>) -> Self {
		self.roles = roles.into();
		self
	}

	pub fn ip_address(mut self, ip: Option<impl Into<String>>) -> Self {
		self.ip_address = ip.map(Into::into);
		self
	}

	/// Set the HTTP method and path of the originating request.
	pub fn request(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
		self.request_method = Some(method.into());
		self.request_path = Some(path.into());
		self
	}

	pub fn details(mut self, details: serde_json::Value) -> Self {
		self.details = details;
		self
	}

	pub fn build(self) -> AuditEvent {
		AuditEvent {
			id: Uuid::new_v4(),
			timestamp: Utc::now(),
			event_type: self.event_type,
			severity: self
				.severity
				.unwrap_or_else(|| self.event_type.default_severity()),
			outcome: self.outcome,
			actor_user_id: self.actor_user_id,
			resource: self.resource,
			resource_id: self.resource_id,
			action: self.action,
			roles: self.roles,
			ip_address: self.ip_address,
			request_method: self.request_method,
			request_path: self.request_path,
			details: self.details,
		}
	}
}
