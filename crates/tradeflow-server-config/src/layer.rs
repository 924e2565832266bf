// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial server configuration, merged across sources.

use serde::Deserialize;

use crate::sections::{
	AuditConfigLayer, AuthzConfigLayer, DatabaseConfigLayer, HttpConfigLayer, LoggingConfigLayer,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub authz: Option<AuthzConfigLayer>,
	#[serde(default)]
	pub audit: Option<AuditConfigLayer>,
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(existing), Some(overlay)) => merge(existing, overlay),
		(None, Some(overlay)) => *base = Some(overlay),
		(_, None) => {}
	}
}

impl ServerConfigLayer {
	/// Overlays `other` on top of `self`. Fields set in `other` win.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_section(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.authz, other.authz, AuthzConfigLayer::merge);
		merge_section(&mut self.audit, other.audit, AuditConfigLayer::merge);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn merge_keeps_unset_sections() {
		let mut base = ServerConfigLayer {
			http: Some(HttpConfigLayer {
				port: Some(9000),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(ServerConfigLayer::default());
		assert_eq!(base.http.unwrap().port, Some(9000));
	}

	#[test]
	fn merge_overlays_fields_within_section() {
		let mut base = ServerConfigLayer {
			authz: Some(AuthzConfigLayer {
				role_cache_ttl_secs: Some(60),
				identity_header: Some("x-user-id".to_string()),
			}),
			..Default::default()
		};
		base.merge(ServerConfigLayer {
			authz: Some(AuthzConfigLayer {
				role_cache_ttl_secs: Some(120),
				identity_header: None,
			}),
			..Default::default()
		});
		let authz = base.authz.unwrap();
		assert_eq!(authz.role_cache_ttl_secs, Some(120));
		assert_eq!(authz.identity_header.as_deref(), Some("x-user-id"));
	}

	#[test]
	fn parses_from_toml() {
		let layer: ServerConfigLayer = toml::from_str(
			r#"
			[http]
			port = 8081

			[authz]
			role_cache_ttl_secs = 30

			[audit]
			queue_overflow_policy = "block"
			"#,
		)
		.unwrap();
		assert_eq!(layer.http.unwrap().port, Some(8081));
		assert_eq!(layer.authz.unwrap().role_cache_ttl_secs, Some(30));
		assert!(layer.database.is_none());
	}
}
