// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role resolution and the shared role cache.
//!
//! This module provides:
//! - [`RoleStore`] - the contract the persistent role store implements
//! - [`RoleLoader`] - cache-first role resolution with per-user single-flight loads
//! - [`get_primary_role`] - the highest ranked role of a set
//!
//! # Cache Model
//!
//! ```text
//! get_user_roles(u) ─┬─ fresh entry ──────────────────────► cached roles
//!                    ├─ load in flight for u ─► join ──────► shared result
//!                    └─ miss ─► start load (generation g) ─► store.read_roles(u)
//!                                                              │
//!                          slot for u still generation g? ◄────┘
//!                              yes: cache Ok result    no: answer waiters only
//! ```
//!
//! Invalidation removes both the entry and the in-flight slot, so any read that
//! starts after it returns performs a new store read. The mutex guarding the
//! cache is never held across store I/O.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use crate::types::{Role, UserId};

/// Default time-to-live for cached role sets.
pub const DEFAULT_ROLE_CACHE_TTL: Duration = Duration::from_secs(300);

/// A persisted role held by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleAssignment {
	pub user_id: UserId,
	pub role: Role,
	pub assigned_at: DateTime<Utc>,
}

/// Mutation applied to a user's role set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleMutation {
	Assign,
	Remove,
}

impl fmt::Display for RoleMutation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RoleMutation::Assign => write!(f, "assign"),
			RoleMutation::Remove => write!(f, "remove"),
		}
	}
}

/// Errors reported by a [`RoleStore`].
///
/// Cloneable so one failed load can be handed to every coalesced waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleStoreError {
	#[error("role store unavailable: {0}")]
	Unavailable(String),
	#[error("role store returned corrupt data: {0}")]
	Corrupt(String),
}

/// Errors from [`RoleLoader`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleLoadError {
	#[error(transparent)]
	Store(#[from] RoleStoreError),
	#[error("role cache unavailable")]
	CacheUnavailable,
	#[error("role '{0}' cannot be assigned")]
	NotAssignable(Role),
}

/// Persistent store of role assignments.
///
/// Assigning a role the user already holds succeeds without change. Removing a
/// role the user does not hold succeeds without change.
#[async_trait]
pub trait RoleStore: Send + Sync {
	async fn read_roles(&self, user_id: &UserId) -> Result<Vec<UserRoleAssignment>, RoleStoreError>;

	async fn write_role(
		&self,
		user_id: &UserId,
		role: Role,
		mutation: RoleMutation,
	) -> Result<(), RoleStoreError>;
}

/// In-process [`RoleStore`] for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryRoleStore {
	assignments: Mutex<HashMap<UserId, Vec<UserRoleAssignment>>>,
}

impl MemoryRoleStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> Result<MutexGuard<'_, HashMap<UserId, Vec<UserRoleAssignment>>>, RoleStoreError> {
		self
			.assignments
			.lock()
			.map_err(|_| RoleStoreError::Unavailable("memory role store poisoned".to_string()))
	}
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
	async fn read_roles(&self, user_id: &UserId) -> Result<Vec<UserRoleAssignment>, RoleStoreError> {
		Ok(self.lock()?.get(user_id).cloned().unwrap_or_default())
	}

	async fn write_role(
		&self,
		user_id: &UserId,
		role: Role,
		mutation: RoleMutation,
	) -> Result<(), RoleStoreError> {
		let mut assignments = self.lock()?;
		let held = assignments.entry(*user_id).or_default();
		match mutation {
			RoleMutation::Assign => {
				if !held.iter().any(|a| a.role == role) {
					held.push(UserRoleAssignment {
						user_id: *user_id,
						role,
						assigned_at: Utc::now(),
					});
				}
			}
			RoleMutation::Remove => held.retain(|a| a.role != role),
		}
		Ok(())
	}
}

/// Returns the highest ranked role, or [`Role::NoAccess`] for an empty set.
pub fn get_primary_role(roles: &[Role]) -> Role {
	roles
		.iter()
		.copied()
		.filter(Role::is_assignable)
		.max_by_key(Role::rank)
		.unwrap_or(Role::NoAccess)
}

/// Outcome of a successful role mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChange {
	pub user_id: UserId,
	pub role: Role,
	pub mutation: RoleMutation,
	/// False when the write persisted but the cache entry could not be dropped.
	/// The old role set may then be served until its TTL expires.
	pub cache_invalidated: bool,
}

type LoadResult = Result<Arc<[Role]>, RoleStoreError>;

struct CachedRoles {
	roles: Arc<[Role]>,
	expires_at: Instant,
}

struct PendingLoad {
	generation: u64,
	future: Shared<BoxFuture<'static, LoadResult>>,
}

#[derive(Default)]
struct RoleCacheState {
	entries: HashMap<UserId, CachedRoles>,
	in_flight: HashMap<UserId, PendingLoad>,
	next_generation: u64,
}

/// Cache-first resolver of user roles.
pub struct RoleLoader {
	store: Arc<dyn RoleStore>,
	ttl: Duration,
	state: Mutex<RoleCacheState>,
}

impl fmt::Debug for RoleLoader {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RoleLoader").field("ttl", &self.ttl).finish_non_exhaustive()
	}
}

impl RoleLoader {
	pub fn new(store: Arc<dyn RoleStore>, ttl: Duration) -> Self {
		Self {
			store,
			ttl,
			state: Mutex::new(RoleCacheState::default()),
		}
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	fn lock_state(&self) -> Result<MutexGuard<'_, RoleCacheState>, RoleLoadError> {
		self.state.lock().map_err(|_| RoleLoadError::CacheUnavailable)
	}

	/// Resolves the roles held by a user, highest rank first.
	///
	/// Concurrent misses for the same user share one store read. Failed reads
	/// are returned to every waiter and never cached.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn get_user_roles(&self, user_id: &UserId) -> Result<Arc<[Role]>, RoleLoadError> {
		let (generation, future) = {
			let mut state = self.lock_state()?;
			let now = Instant::now();

			match state.entries.get(user_id) {
				Some(cached) if cached.expires_at > now => {
					tracing::trace!("role cache hit");
					return Ok(cached.roles.clone());
				}
				Some(_) => {
					state.entries.remove(user_id);
				}
				None => {}
			}

			if let Some(pending) = state.in_flight.get(user_id) {
				tracing::trace!(generation = pending.generation, "joining in-flight role load");
				(pending.generation, pending.future.clone())
			} else {
				state.next_generation += 1;
				let generation = state.next_generation;
				let future = self.start_load(*user_id);
				state.in_flight.insert(
					*user_id,
					PendingLoad {
						generation,
						future: future.clone(),
					},
				);
				tracing::debug!(generation, "role cache miss, loading from store");
				(generation, future)
			}
		};

		let result = future.await;

		{
			let mut state = self.lock_state()?;
			let owns_slot = state
				.in_flight
				.get(user_id)
				.is_some_and(|pending| pending.generation == generation);
			if owns_slot {
				state.in_flight.remove(user_id);
				if let Ok(roles) = &result {
					state.entries.insert(
						*user_id,
						CachedRoles {
							roles: roles.clone(),
							expires_at: Instant::now() + self.ttl,
						},
					);
				}
			}
		}

		if let Err(e) = &result {
			tracing::warn!(error = %e, "failed to load user roles");
		}
		result.map_err(RoleLoadError::from)
	}

	fn start_load(&self, user_id: UserId) -> Shared<BoxFuture<'static, LoadResult>> {
		let store = Arc::clone(&self.store);
		async move {
			let assignments = store.read_roles(&user_id).await?;
			Ok(normalize_roles(assignments.into_iter().map(|a| a.role)))
		}
		.boxed()
		.shared()
	}

	/// Drops the cached entry and any in-flight load for the user.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub fn invalidate_user_role_cache(&self, user_id: &UserId) -> Result<(), RoleLoadError> {
		let mut state = self.lock_state()?;
		state.entries.remove(user_id);
		state.in_flight.remove(user_id);
		tracing::debug!("role cache entry invalidated");
		Ok(())
	}

	/// Drops every entry and in-flight load.
	pub fn clear_role_cache(&self) -> Result<(), RoleLoadError> {
		let mut state = self.lock_state()?;
		state.entries.clear();
		state.in_flight.clear();
		tracing::debug!("role cache cleared");
		Ok(())
	}

	/// Number of users with a cached role set, including expired ones not yet evicted.
	pub fn cached_user_count(&self) -> usize {
		self.lock_state().map(|state| state.entries.len()).unwrap_or(0)
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id, role = %role))]
	pub async fn assign_role(&self, user_id: &UserId, role: Role) -> Result<RoleChange, RoleLoadError> {
		self.mutate(user_id, role, RoleMutation::Assign).await
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id, role = %role))]
	pub async fn remove_role(&self, user_id: &UserId, role: Role) -> Result<RoleChange, RoleLoadError> {
		self.mutate(user_id, role, RoleMutation::Remove).await
	}

	/// Persists first, then invalidates.
	async fn mutate(
		&self,
		user_id: &UserId,
		role: Role,
		mutation: RoleMutation,
	) -> Result<RoleChange, RoleLoadError> {
		if !role.is_assignable() {
			return Err(RoleLoadError::NotAssignable(role));
		}

		self.store.write_role(user_id, role, mutation).await?;

		let cache_invalidated = match self.invalidate_user_role_cache(user_id) {
			Ok(()) => true,
			Err(e) => {
				tracing::warn!(
					error = %e,
					%mutation,
					"role change persisted but cache invalidation failed; stale roles may be served until TTL expiry"
				);
				false
			}
		};

		tracing::info!(%mutation, "role change persisted");
		Ok(RoleChange {
			user_id: *user_id,
			role,
			mutation,
			cache_invalidated,
		})
	}
}

/// Drops the sentinel, sorts highest rank first and removes duplicates.
fn normalize_roles(roles: impl IntoIterator<Item = Role>) -> Arc<[Role]> {
	let mut roles: Vec<Role> = roles.into_iter().filter(Role::is_assignable).collect();
	roles.sort_by(|a, b| b.rank().cmp(&a.rank()));
	roles.dedup();
	roles.into()
}
