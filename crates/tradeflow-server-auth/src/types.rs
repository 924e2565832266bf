// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for authorization.
//!
//! - **ID newtypes**: [`UserId`], a type-safe wrapper around the stable identifier
//!   handed to us by the upstream authentication layer
//! - **Roles**: the fixed, totally ordered [`Role`] set plus the [`Role::NoAccess`]
//!   sentinel that fails every check
//! - **Resources**: the protected domain object classes ([`Resource`])
//! - **Actions**: the five verbs a permission can grant ([`Action`])
//!
//! Every identifier serializes as its snake_case wire name and parses back with
//! [`FromStr`]. Unknown names never parse; callers drop them rather than guess.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");

/// Error returned when a wire name does not match any known identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdentifierError {
	#[error("unknown role '{0}'")]
	Role(String),
	#[error("unknown resource '{0}'")]
	Resource(String),
	#[error("unknown action '{0}'")]
	Action(String),
}

// =============================================================================
// Roles
// =============================================================================

/// Business roles, declared highest privilege first.
///
/// The ordinal ([`Role::rank`]) defines the hierarchy used by "at least" checks.
/// [`Role::NoAccess`] is not part of the hierarchy: it is what a user with no
/// assignments resolves to, and it fails every hierarchy and permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// Business owner; full control including settings.
	Owner,
	/// Office administrator; manages users and all records.
	Admin,
	/// Operations manager; runs jobs, quotes and invoicing.
	Manager,
	/// Prepares leads and quotes.
	Estimator,
	/// Field technician; works assigned jobs and equipment.
	Technician,
	/// Read-only access to customer-facing records.
	Viewer,
	/// Sentinel for "holds no role".
	NoAccess,
}

impl Role {
	/// Returns the role hierarchy, highest privilege first. Excludes the sentinel.
	pub fn hierarchy() -> &'static [Role] {
		&[
			Role::Owner,
			Role::Admin,
			Role::Manager,
			Role::Estimator,
			Role::Technician,
			Role::Viewer,
		]
	}

	/// Ordinal position in the hierarchy. Higher is more privileged; the sentinel is 0.
	pub fn rank(&self) -> u8 {
		match self {
			Role::Owner => 6,
			Role::Admin => 5,
			Role::Manager => 4,
			Role::Estimator => 3,
			Role::Technician => 2,
			Role::Viewer => 1,
			Role::NoAccess => 0,
		}
	}

	/// Returns true for every role that can be persisted for a user.
	pub fn is_assignable(&self) -> bool {
		!matches!(self, Role::NoAccess)
	}

	/// Wire name of the role.
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Owner => "owner",
			Role::Admin => "admin",
			Role::Manager => "manager",
			Role::Estimator => "estimator",
			Role::Technician => "technician",
			Role::Viewer => "viewer",
			Role::NoAccess => "no_access",
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = ParseIdentifierError;

	/// Parses an assignable role. The sentinel is never accepted from outside.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Role::hierarchy()
			.iter()
			.copied()
			.find(|r| r.as_str() == s)
			.ok_or_else(|| ParseIdentifierError::Role(s.to_string()))
	}
}

// =============================================================================
// Resources
// =============================================================================

/// Protected domain object classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
	Leads,
	Quotes,
	Jobs,
	Invoices,
	Equipment,
	Customers,
	Users,
	Reports,
	Settings,
	AuditLogs,
}

impl Resource {
	/// Returns all resources.
	pub fn all() -> &'static [Resource] {
		&[
			Resource::Leads,
			Resource::Quotes,
			Resource::Jobs,
			Resource::Invoices,
			Resource::Equipment,
			Resource::Customers,
			Resource::Users,
			Resource::Reports,
			Resource::Settings,
			Resource::AuditLogs,
		]
	}

	/// Wire name of the resource, also used as its path segment.
	pub fn as_str(&self) -> &'static str {
		match self {
			Resource::Leads => "leads",
			Resource::Quotes => "quotes",
			Resource::Jobs => "jobs",
			Resource::Invoices => "invoices",
			Resource::Equipment => "equipment",
			Resource::Customers => "customers",
			Resource::Users => "users",
			Resource::Reports => "reports",
			Resource::Settings => "settings",
			Resource::AuditLogs => "audit_logs",
		}
	}
}

impl fmt::Display for Resource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Resource {
	type Err = ParseIdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Resource::all()
			.iter()
			.copied()
			.find(|r| r.as_str() == s)
			.ok_or_else(|| ParseIdentifierError::Resource(s.to_string()))
	}
}

// =============================================================================
// Actions
// =============================================================================

/// Operations a permission entry can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
	Create,
	Read,
	Update,
	Delete,
	List,
}

impl Action {
	/// Returns all actions.
	pub fn all() -> &'static [Action] {
		&[
			Action::Create,
			Action::Read,
			Action::Update,
			Action::Delete,
			Action::List,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Action::Create => "create",
			Action::Read => "read",
			Action::Update => "update",
			Action::Delete => "delete",
			Action::List => "list",
		}
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Action {
	type Err = ParseIdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Action::all()
			.iter()
			.copied()
			.find(|a| a.as_str() == s)
			.ok_or_else(|| ParseIdentifierError::Action(s.to_string()))
	}
}
