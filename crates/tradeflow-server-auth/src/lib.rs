// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role-based access control core for Tradeflow.
//!
//! - [`permissions`]: the static role × resource × action matrix and role hierarchy
//! - [`roles`]: role store contract and the single-flight [`RoleLoader`] cache
//! - [`context`]: per-request [`AuthContext`] and user context loading
//! - [`authorize`]: pure authorization stages producing [`Decision`]s
//! - [`audit`]: the [`AuditEvent`] record emitted for access decisions
//!
//! Every path through this crate fails closed: missing matrix entries, unknown
//! roles, store failures and unloaded contexts all end in a denial.

pub mod audit;
pub mod authorize;
pub mod context;
pub mod permissions;
pub mod roles;
pub mod types;

pub use audit::{AuditEvent, AuditEventBuilder, AuditEventType, AuditOutcome, AuditSeverity};
pub use authorize::{
	action_for_method, evaluate, Decision, Denial, ErrorCode, RequestInfo, Requirement,
	CONTEXT_CHECK_RESOURCE, ROLE_CHECK_RESOURCE, ROLE_HIERARCHY_CHECK_RESOURCE,
};
pub use context::{load_user_context, AuthContext, Identity, UserContext};
pub use permissions::{
	get_permitted_actions, get_role_hierarchy, has_permission, is_role_at_least, PermissionsMatrix,
};
pub use roles::{
	get_primary_role, MemoryRoleStore, RoleChange, RoleLoadError, RoleLoader, RoleMutation,
	RoleStore, RoleStoreError, UserRoleAssignment, DEFAULT_ROLE_CACHE_TTL,
};
pub use types::{Action, ParseIdentifierError, Resource, Role, UserId};
