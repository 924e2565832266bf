// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Static role × resource × action permission table.
//!
//! The matrix is built once and never mutated. A triple with no entry is a
//! denial. The sentinel [`Role::NoAccess`] never has entries and is below every
//! rank in the hierarchy.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use crate::types::{Action, Resource, Role};

const CRUDL: &[Action] = &[
	Action::Create,
	Action::Read,
	Action::Update,
	Action::Delete,
	Action::List,
];
const CRUL: &[Action] = &[Action::Create, Action::Read, Action::Update, Action::List];
const RUL: &[Action] = &[Action::Read, Action::Update, Action::List];
const READ_ONLY: &[Action] = &[Action::Read, Action::List];

static STANDARD: LazyLock<PermissionsMatrix> = LazyLock::new(PermissionsMatrix::build_standard);

/// Lookup table keyed by role then resource.
#[derive(Debug, Clone, Default)]
pub struct PermissionsMatrix {
	entries: HashMap<Role, HashMap<Resource, HashSet<Action>>>,
}

impl PermissionsMatrix {
	/// The process-wide business matrix.
	pub fn standard() -> &'static PermissionsMatrix {
		&STANDARD
	}

	/// Builds a matrix from explicit grants. Grants for the sentinel role are ignored.
	pub fn from_entries<I>(entries: I) -> Self
	where
		I: IntoIterator<Item = (Role, Resource, Action)>,
	{
		let mut matrix = Self::default();
		for (role, resource, action) in entries {
			matrix.grant(role, resource, &[action]);
		}
		matrix
	}

	fn grant(&mut self, role: Role, resource: Resource, actions: &[Action]) {
		if !role.is_assignable() {
			return;
		}
		self
			.entries
			.entry(role)
			.or_default()
			.entry(resource)
			.or_default()
			.extend(actions.iter().copied());
	}

	fn build_standard() -> Self {
		use Resource::*;

		let mut m = Self::default();

		for resource in Resource::all() {
			let actions = if *resource == AuditLogs { READ_ONLY } else { CRUDL };
			m.grant(Role::Owner, *resource, actions);
		}

		for resource in [Leads, Quotes, Jobs, Invoices, Equipment, Customers, Reports, Users] {
			m.grant(Role::Admin, resource, CRUDL);
		}
		m.grant(Role::Admin, Settings, RUL);
		m.grant(Role::Admin, AuditLogs, READ_ONLY);

		m.grant(Role::Manager, Leads, CRUDL);
		m.grant(Role::Manager, Quotes, CRUDL);
		for resource in [Jobs, Customers, Equipment, Invoices] {
			m.grant(Role::Manager, resource, CRUL);
		}
		m.grant(Role::Manager, Reports, READ_ONLY);
		m.grant(Role::Manager, Users, READ_ONLY);

		for resource in [Leads, Quotes, Customers] {
			m.grant(Role::Estimator, resource, CRUL);
		}
		m.grant(Role::Estimator, Jobs, READ_ONLY);
		m.grant(Role::Estimator, Equipment, READ_ONLY);

		m.grant(Role::Technician, Jobs, RUL);
		m.grant(Role::Technician, Equipment, RUL);
		m.grant(Role::Technician, Customers, READ_ONLY);

		for resource in [Leads, Quotes, Jobs, Invoices, Equipment, Customers] {
			m.grant(Role::Viewer, resource, READ_ONLY);
		}

		m
	}

	/// Pure lookup. A missing entry is a denial.
	pub fn has_permission(&self, role: Role, resource: Resource, action: Action) -> bool {
		self
			.entries
			.get(&role)
			.and_then(|by_resource| by_resource.get(&resource))
			.is_some_and(|actions| actions.contains(&action))
	}

	/// True if any of `roles` grants the action.
	pub fn any_has_permission(&self, roles: &[Role], resource: Resource, action: Action) -> bool {
		roles
			.iter()
			.any(|role| self.has_permission(*role, resource, action))
	}

	pub fn permitted_actions(&self, role: Role, resource: Resource) -> BTreeSet<Action> {
		self
			.entries
			.get(&role)
			.and_then(|by_resource| by_resource.get(&resource))
			.map(|actions| actions.iter().copied().collect())
			.unwrap_or_default()
	}

	/// Union of permitted actions across several roles.
	pub fn permitted_actions_for_roles(&self, roles: &[Role], resource: Resource) -> BTreeSet<Action> {
		roles
			.iter()
			.flat_map(|role| self.permitted_actions(*role, resource))
			.collect()
	}

	/// Highest privilege first.
	pub fn role_hierarchy(&self) -> &'static [Role] {
		Role::hierarchy()
	}

	/// True iff `role` ranks at or above `minimum`. The sentinel never passes,
	/// not even against itself.
	pub fn is_role_at_least(&self, role: Role, minimum: Role) -> bool {
		if !role.is_assignable() || !minimum.is_assignable() {
			return false;
		}
		role.rank() >= minimum.rank()
	}
}

pub fn has_permission(role: Role, resource: Resource, action: Action) -> bool {
	PermissionsMatrix::standard().has_permission(role, resource, action)
}

pub fn get_permitted_actions(role: Role, resource: Resource) -> BTreeSet<Action> {
	PermissionsMatrix::standard().permitted_actions(role, resource)
}

pub fn get_role_hierarchy() -> &'static [Role] {
	PermissionsMatrix::standard().role_hierarchy()
}

pub fn is_role_at_least(role: Role, minimum: Role) -> bool {
	PermissionsMatrix::standard().is_role_at_least(role, minimum)
}
