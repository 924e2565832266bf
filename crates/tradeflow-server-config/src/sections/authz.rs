// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization configuration: role cache lifetime and identity handoff.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_ROLE_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthzConfig {
	pub role_cache_ttl_secs: u64,
	/// Header carrying the user id when the upstream authentication layer runs
	/// as a separate proxy. `None` means identities only arrive as request
	/// extensions. Only set this behind a proxy that strips client copies.
	pub identity_header: Option<String>,
}

impl AuthzConfig {
	pub fn role_cache_ttl(&self) -> Duration {
		Duration::from_secs(self.role_cache_ttl_secs)
	}
}

impl Default for AuthzConfig {
	fn default() -> Self {
		Self {
			role_cache_ttl_secs: DEFAULT_ROLE_CACHE_TTL_SECS,
			identity_header: None,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthzConfigLayer {
	#[serde(default)]
	pub role_cache_ttl_secs: Option<u64>,
	#[serde(default)]
	pub identity_header: Option<String>,
}

impl AuthzConfigLayer {
	pub fn merge(&mut self, other: AuthzConfigLayer) {
		if other.role_cache_ttl_secs.is_some() {
			self.role_cache_ttl_secs = other.role_cache_ttl_secs;
		}
		if other.identity_header.is_some() {
			self.identity_header = other.identity_header;
		}
	}

	pub fn finalize(self) -> AuthzConfig {
		AuthzConfig {
			role_cache_ttl_secs: self
				.role_cache_ttl_secs
				.unwrap_or(DEFAULT_ROLE_CACHE_TTL_SECS),
			identity_header: self
				.identity_header
				.map(|h| h.trim().to_ascii_lowercase())
				.filter(|h| !h.is_empty()),
		}
	}
}
