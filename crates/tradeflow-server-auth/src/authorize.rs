// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport-independent authorization stages.
//!
//! [`evaluate`] maps an [`AuthContext`] and a [`Requirement`] to a [`Decision`]:
//! either a grant, or a [`Denial`] plus the audit event to record for it.
//! It performs no I/O; transports decide how to deliver the denial and where to
//! send the event.
//!
//! | Context            | Outcome                                  | Audited |
//! |--------------------|------------------------------------------|---------|
//! | no identity        | 401 `AUTH_REQUIRED`                      | no      |
//! | roles not loaded   | 403 `CONTEXT_NOT_LOADED`                 | yes     |
//! | role not held      | 403 `INSUFFICIENT_ROLE`                  | yes     |
//! | action not granted | 403 `INSUFFICIENT_PERMISSION`            | yes     |

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::audit::{AuditEvent, AuditEventType, AuditOutcome};
use crate::context::{AuthContext, Identity, UserContext};
use crate::permissions::PermissionsMatrix;
use crate::types::{Action, Resource, Role};

/// Pseudo-resource recorded for role-membership denials.
pub const ROLE_CHECK_RESOURCE: &str = "role_check";
/// Pseudo-resource recorded for minimum-role denials.
pub const ROLE_HIERARCHY_CHECK_RESOURCE: &str = "role_hierarchy_check";
/// Pseudo-resource recorded when roles were never attached to the request.
pub const CONTEXT_CHECK_RESOURCE: &str = "context_check";

/// Maps an HTTP verb to the action it performs on a resource.
///
/// Verbs without a mapping return `None` and are denied by
/// [`Requirement::ResourcePermission`].
pub fn action_for_method(method: &Method, has_target_id: bool) -> Option<Action> {
	match *method {
		Method::GET if has_target_id => Some(Action::Read),
		Method::GET => Some(Action::List),
		Method::POST => Some(Action::Create),
		Method::PUT | Method::PATCH => Some(Action::Update),
		Method::DELETE => Some(Action::Delete),
		_ => None,
	}
}

/// Request attributes the stages need, independent of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
	pub method: Method,
	pub path: String,
	/// Identifier of the targeted record, if the request addresses one.
	pub target_id: Option<String>,
	pub client_ip: Option<String>,
}

impl RequestInfo {
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			target_id: None,
			client_ip: None,
		}
	}

	pub fn with_target_id(mut self, id: impl Into<String>) -> Self {
		self.target_id = Some(id.into());
		self
	}

	pub fn with_client_ip(mut self, ip: Option<String>) -> Self {
		self.client_ip = ip;
		self
	}

	pub fn has_target_id(&self) -> bool {
		self.target_id.is_some()
	}
}

/// A single authorization gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
	/// The user holds at least one of the listed roles.
	AnyRole(Vec<Role>),
	/// At least one held role grants the action on the resource.
	Permission(Resource, Action),
	/// The primary role ranks at or above the given role.
	MinimumRole(Role),
	/// Like `Permission`, with the action derived from the request verb.
	ResourcePermission(Resource),
}

impl Requirement {
	pub fn owner_or_admin() -> Self {
		Requirement::AnyRole(vec![Role::Owner, Role::Admin])
	}

	pub fn manager_or_above() -> Self {
		Requirement::MinimumRole(Role::Manager)
	}
}

/// Machine-readable denial reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	AuthRequired,
	ContextNotLoaded,
	InsufficientRole,
	InsufficientPermission,
}

impl ErrorCode {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorCode::AuthRequired => "AUTH_REQUIRED",
			ErrorCode::ContextNotLoaded => "CONTEXT_NOT_LOADED",
			ErrorCode::InsufficientRole => "INSUFFICIENT_ROLE",
			ErrorCode::InsufficientPermission => "INSUFFICIENT_PERMISSION",
		}
	}
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Structured denial returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Denial {
	/// Always `false`.
	pub success: bool,
	pub error_code: ErrorCode,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resource: Option<Resource>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub action: Option<Action>,
	pub message: String,
}

impl Denial {
	fn new(error_code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			success: false,
			error_code,
			resource: None,
			action: None,
			message: message.into(),
		}
	}

	pub fn auth_required() -> Self {
		Self::new(ErrorCode::AuthRequired, "Authentication required")
	}

	pub fn context_not_loaded() -> Self {
		Self::new(ErrorCode::ContextNotLoaded, "User context has not been loaded")
	}

	pub fn insufficient_role() -> Self {
		Self::new(ErrorCode::InsufficientRole, "Insufficient role for this operation")
	}

	pub fn insufficient_permission(resource: Resource, action: Option<Action>) -> Self {
		let message = match action {
			Some(action) => format!("Permission denied: cannot {action} {resource}"),
			None => format!("Permission denied: unsupported operation on {resource}"),
		};
		Self {
			resource: Some(resource),
			action,
			..Self::new(ErrorCode::InsufficientPermission, message)
		}
	}

	/// 401 for a missing identity, 403 for everything else.
	pub fn status(&self) -> StatusCode {
		match self.error_code {
			ErrorCode::AuthRequired => StatusCode::UNAUTHORIZED,
			_ => StatusCode::FORBIDDEN,
		}
	}
}

/// Result of one gate.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
	pub outcome: Result<(), Denial>,
	/// Event to record. Present exactly when an identified subject was denied.
	pub audit: Option<AuditEvent>,
}

impl Decision {
	fn grant() -> Self {
		Self {
			outcome: Ok(()),
			audit: None,
		}
	}

	fn deny(denial: Denial, audit: Option<AuditEvent>) -> Self {
		Self {
			outcome: Err(denial),
			audit,
		}
	}

	pub fn is_granted(&self) -> bool {
		self.outcome.is_ok()
	}
}

/// Evaluates one requirement against the request context.
pub fn evaluate(
	ctx: &AuthContext,
	requirement: &Requirement,
	request: &RequestInfo,
	matrix: &PermissionsMatrix,
) -> Decision {
	let user = match ctx {
		AuthContext::Unauthenticated => {
			tracing::info!(
				method = %request.method,
				path = %request.path,
				"authorization denied: no identity"
			);
			return Decision::deny(Denial::auth_required(), None);
		}
		AuthContext::Authenticated(identity) => {
			tracing::info!(
				user_id = %identity.user_id,
				path = %request.path,
				"authorization denied: user context not loaded"
			);
			let event = context_denial_event(identity, request);
			return Decision::deny(Denial::context_not_loaded(), Some(event));
		}
		AuthContext::ContextLoaded(user) => user,
	};

	let decision = match requirement {
		Requirement::AnyRole(allowed) => {
			if user.has_any_role(allowed) {
				Decision::grant()
			} else {
				let details = serde_json::json!({
					"required_roles": allowed,
					"user_roles": user.roles,
				});
				let event = denial_event(user, request, ROLE_CHECK_RESOURCE, None, details);
				Decision::deny(Denial::insufficient_role(), Some(event))
			}
		}
		Requirement::MinimumRole(minimum) => {
			if matrix.is_role_at_least(user.primary_role, *minimum) {
				Decision::grant()
			} else {
				let details = serde_json::json!({
					"minimum_role": minimum,
					"primary_role": user.primary_role,
				});
				let event = denial_event(user, request, ROLE_HIERARCHY_CHECK_RESOURCE, None, details);
				Decision::deny(Denial::insufficient_role(), Some(event))
			}
		}
		Requirement::Permission(resource, action) => {
			check_permission(user, request, matrix, *resource, Some(*action))
		}
		Requirement::ResourcePermission(resource) => {
			let action = action_for_method(&request.method, request.has_target_id());
			check_permission(user, request, matrix, *resource, action)
		}
	};

	match &decision.outcome {
		Ok(()) => tracing::debug!(
			user_id = %user.user_id,
			path = %request.path,
			?requirement,
			"authorization granted"
		),
		Err(denial) => tracing::info!(
			user_id = %user.user_id,
			path = %request.path,
			error_code = %denial.error_code,
			?requirement,
			"authorization denied"
		),
	}

	decision
}

fn check_permission(
	user: &UserContext,
	request: &RequestInfo,
	matrix: &PermissionsMatrix,
	resource: Resource,
	action: Option<Action>,
) -> Decision {
	if let Some(action) = action {
		if matrix.any_has_permission(&user.roles, resource, action) {
			return Decision::grant();
		}
	}

	let details = match action {
		Some(_) => serde_json::Value::Null,
		None => serde_json::json!({ "unsupported_method": request.method.as_str() }),
	};
	let event = denial_event(user, request, resource.as_str(), action, details);
	Decision::deny(Denial::insufficient_permission(resource, action), Some(event))
}

fn denial_event(
	user: &UserContext,
	request: &RequestInfo,
	resource: &str,
	action: Option<Action>,
	details: serde_json::Value,
) -> AuditEvent {
	let mut builder = AuditEvent::builder(AuditEventType::AccessDenied, AuditOutcome::Denied)
		.actor(user.user_id)
		.resource(resource)
		.roles(user.roles.clone())
		.ip_address(request.client_ip.clone())
		.request(request.method.as_str(), request.path.clone())
		.details(details);
	if let Some(action) = action {
		builder = builder.action(action.as_str());
	}
	if let Some(id) = &request.target_id {
		builder = builder.resource_id(id.clone());
	}
	builder.build()
}

fn context_denial_event(identity: &Identity, request: &RequestInfo) -> AuditEvent {
	AuditEvent::builder(AuditEventType::AccessDenied, AuditOutcome::Denied)
		.actor(identity.user_id)
		.resource(CONTEXT_CHECK_RESOURCE)
		.ip_address(request.client_ip.clone())
		.request(request.method.as_str(), request.path.clone())
		.build()
}
