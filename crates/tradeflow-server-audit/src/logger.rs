// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Typed entry points for recording audit events.
//!
//! Every method is fire-and-forget: it queues the event and returns. A
//! rejected event is reported through `tracing` as an audit write failure and
//! never surfaces to the caller.

use std::sync::Arc;

use serde_json::json;
use tradeflow_server_auth::{
	Action, AuditEvent, AuditEventType, AuditOutcome, RequestInfo, RoleChange, RoleMutation,
	UserContext, UserId,
};
use tradeflow_server_config::AuditConfig;

use crate::error::AuditResult;
use crate::pipeline::AuditService;
use crate::sink::AuditSink;

/// Kind of data mutation recorded by [`AuditLogger::log_data_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataChange {
	Created,
	Updated,
	Deleted,
}

impl DataChange {
	fn event_type(self) -> AuditEventType {
		match self {
			DataChange::Created => AuditEventType::DataCreated,
			DataChange::Updated => AuditEventType::DataUpdated,
			DataChange::Deleted => AuditEventType::DataDeleted,
		}
	}

	fn action(self) -> Action {
		match self {
			DataChange::Created => Action::Create,
			DataChange::Updated => Action::Update,
			DataChange::Deleted => Action::Delete,
		}
	}
}

#[derive(Clone, Default)]
pub struct AuditLogger {
	service: Option<Arc<AuditService>>,
}

impl std::fmt::Debug for AuditLogger {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AuditLogger")
			.field("enabled", &self.is_enabled())
			.finish()
	}
}

impl AuditLogger {
	pub fn new(service: AuditService) -> Self {
		Self {
			service: Some(Arc::new(service)),
		}
	}

	/// A logger that discards everything.
	pub fn disabled() -> Self {
		Self { service: None }
	}

	/// Builds the service from config, or a disabled logger when `enabled = false`.
	pub fn from_config(config: &AuditConfig, sinks: Vec<Arc<dyn AuditSink>>) -> AuditResult<Self> {
		if !config.enabled {
			tracing::info!("audit logging disabled by configuration");
			return Ok(Self::disabled());
		}
		Ok(Self::new(AuditService::from_config(config, sinks)?))
	}

	pub fn is_enabled(&self) -> bool {
		self.service.is_some()
	}

	pub fn log_audit_event(&self, event: AuditEvent) {
		let Some(service) = &self.service else {
			tracing::trace!(event_type = %event.event_type, "audit disabled, dropping event");
			return;
		};

		let event_id = event.id;
		let event_type = event.event_type;
		if let Err(e) = service.log(event) {
			tracing::warn!(
				error_kind = "AuditWriteFailure",
				event_id = %event_id,
				event_type = %event_type,
				error = %e,
				"audit event was not recorded"
			);
		}
	}

	/// Record a denial decided outside the authorization layers.
	pub fn log_permission_denied(
		&self,
		ctx: &UserContext,
		resource: &str,
		action: Option<Action>,
		request: &RequestInfo,
		reason: &str,
	) {
		let mut builder = AuditEvent::builder(AuditEventType::AccessDenied, AuditOutcome::Denied)
			.actor(ctx.user_id)
			.resource(resource)
			.roles(ctx.roles.clone())
			.ip_address(request.client_ip.clone())
			.request(request.method.as_str(), request.path.clone())
			.details(json!({ "reason": reason }));
		if let Some(action) = action {
			builder = builder.action(action.as_str());
		}
		if let Some(id) = &request.target_id {
			builder = builder.resource_id(id.clone());
		}
		self.log_audit_event(builder.build());
	}

	pub fn log_login(&self, user_id: UserId, success: bool, request: &RequestInfo) {
		let (event_type, outcome) = if success {
			(AuditEventType::Login, AuditOutcome::Success)
		} else {
			(AuditEventType::LoginFailed, AuditOutcome::Failure)
		};
		self.log_audit_event(
			AuditEvent::builder(event_type, outcome)
				.actor(user_id)
				.ip_address(request.client_ip.clone())
				.request(request.method.as_str(), request.path.clone())
				.build(),
		);
	}

	pub fn log_logout(&self, user_id: UserId, request: &RequestInfo) {
		self.log_audit_event(
			AuditEvent::builder(AuditEventType::Logout, AuditOutcome::Success)
				.actor(user_id)
				.ip_address(request.client_ip.clone())
				.request(request.method.as_str(), request.path.clone())
				.build(),
		);
	}

	pub fn log_data_change(
		&self,
		ctx: &UserContext,
		change: DataChange,
		resource: &str,
		resource_id: &str,
		request: &RequestInfo,
		details: serde_json::Value,
	) {
		self.log_audit_event(
			AuditEvent::builder(change.event_type(), AuditOutcome::Success)
				.actor(ctx.user_id)
				.resource(resource)
				.resource_id(resource_id)
				.action(change.action().as_str())
				.roles(ctx.roles.clone())
				.ip_address(request.client_ip.clone())
				.request(request.method.as_str(), request.path.clone())
				.details(details)
				.build(),
		);
	}

	/// Record a completed role assignment or removal performed by `actor`.
	pub fn log_role_change(&self, actor: &UserContext, change: &RoleChange, request: &RequestInfo) {
		let event_type = match change.mutation {
			RoleMutation::Assign => AuditEventType::RoleAssigned,
			RoleMutation::Remove => AuditEventType::RoleRemoved,
		};
		self.log_audit_event(
			AuditEvent::builder(event_type, AuditOutcome::Success)
				.actor(actor.user_id)
				.resource("users")
				.resource_id(change.user_id.to_string())
				.action(change.mutation.to_string())
				.roles(actor.roles.clone())
				.ip_address(request.client_ip.clone())
				.request(request.method.as_str(), request.path.clone())
				.details(json!({
					"role": change.role.as_str(),
					"cache_invalidated": change.cache_invalidated,
				}))
				.build(),
		);
	}
}
