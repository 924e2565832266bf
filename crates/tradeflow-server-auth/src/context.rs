// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-request authorization context.
//!
//! ```text
//! Unauthenticated ──(identity attached upstream)──► Authenticated
//!                                                       │
//!                                         load_user_context (roles resolved)
//!                                                       ▼
//!                                                ContextLoaded ──► gates
//! ```
//!
//! A failure while resolving roles drops the request back to
//! [`AuthContext::Unauthenticated`]. It never proceeds with a partial role set.

use serde::{Deserialize, Serialize};

use crate::roles::{get_primary_role, RoleLoader};
use crate::types::{Role, UserId};

/// Identity resolved by the upstream authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	pub user_id: UserId,
}

impl Identity {
	pub fn new(user_id: UserId) -> Self {
		Self { user_id }
	}
}

/// An identity with its role set attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
	pub user_id: UserId,
	/// Highest rank first.
	pub roles: Vec<Role>,
	pub primary_role: Role,
}

impl UserContext {
	pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
		let primary_role = get_primary_role(&roles);
		Self {
			user_id,
			roles,
			primary_role,
		}
	}

	pub fn has_any_role(&self, allowed: &[Role]) -> bool {
		self.roles.iter().any(|r| allowed.contains(r))
	}
}

/// Authorization state of one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthContext {
	#[default]
	Unauthenticated,
	Authenticated(Identity),
	ContextLoaded(UserContext),
}

impl AuthContext {
	pub fn user_id(&self) -> Option<UserId> {
		match self {
			AuthContext::Unauthenticated => None,
			AuthContext::Authenticated(identity) => Some(identity.user_id),
			AuthContext::ContextLoaded(ctx) => Some(ctx.user_id),
		}
	}

	pub fn user_context(&self) -> Option<&UserContext> {
		match self {
			AuthContext::ContextLoaded(ctx) => Some(ctx),
			_ => None,
		}
	}

	pub fn is_authenticated(&self) -> bool {
		!matches!(self, AuthContext::Unauthenticated)
	}
}

/// Resolves the role set for an identity.
///
/// Any loader error yields [`AuthContext::Unauthenticated`].
pub async fn load_user_context(identity: Option<&Identity>, loader: &RoleLoader) -> AuthContext {
	let Some(identity) = identity else {
		return AuthContext::Unauthenticated;
	};

	match loader.get_user_roles(&identity.user_id).await {
		Ok(roles) => {
			let ctx = UserContext::new(identity.user_id, roles.to_vec());
			tracing::debug!(
				user_id = %ctx.user_id,
				primary_role = %ctx.primary_role,
				"user context loaded"
			);
			AuthContext::ContextLoaded(ctx)
		}
		Err(e) => {
			tracing::warn!(
				user_id = %identity.user_id,
				error = %e,
				"failed to load user context, treating request as unauthenticated"
			);
			AuthContext::Unauthenticated
		}
	}
}
