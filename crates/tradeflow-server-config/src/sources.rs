// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuditConfigLayer, AuthzConfigLayer, DatabaseConfigLayer, HttpConfigLayer, LogFormat,
	LoggingConfigLayer, QueueOverflowPolicy,
};

/// Default system-wide config file location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/tradeflow/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: TRADEFLOW_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			database: Some(load_database_from_env()?),
			logging: Some(load_logging_from_env()?),
			authz: Some(load_authz_from_env()?),
			audit: Some(load_audit_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: std::str::FromStr>(name: &str, type_name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {type_name} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	env_parse(name, "u16")
}

fn env_u32(name: &str) -> Result<Option<u32>, ConfigError> {
	env_parse(name, "u32")
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	env_parse(name, "u64")
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
	env_parse(name, "usize")
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("TRADEFLOW_SERVER_HOST"),
		port: env_u16("TRADEFLOW_SERVER_PORT")?,
	})
}

fn load_database_from_env() -> Result<DatabaseConfigLayer, ConfigError> {
	Ok(DatabaseConfigLayer {
		url: env_var("TRADEFLOW_SERVER_DATABASE_URL"),
		max_connections: env_u32("TRADEFLOW_SERVER_DATABASE_MAX_CONNECTIONS")?,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("TRADEFLOW_SERVER_LOG_FORMAT") {
		Some(v) => Some(match v.to_lowercase().as_str() {
			"json" => LogFormat::Json,
			"pretty" | "text" => LogFormat::Pretty,
			_ => {
				return Err(ConfigError::InvalidValue {
					key: "TRADEFLOW_SERVER_LOG_FORMAT".to_string(),
					message: format!("expected 'json' or 'pretty', got '{v}'"),
				})
			}
		}),
		None => None,
	};

	Ok(LoggingConfigLayer {
		level: env_var("TRADEFLOW_SERVER_LOG_LEVEL"),
		format,
	})
}

fn load_authz_from_env() -> Result<AuthzConfigLayer, ConfigError> {
	Ok(AuthzConfigLayer {
		role_cache_ttl_secs: env_u64("TRADEFLOW_SERVER_AUTHZ_ROLE_CACHE_TTL_SECS")?,
		identity_header: env_var("TRADEFLOW_SERVER_AUTHZ_IDENTITY_HEADER"),
	})
}

fn load_audit_from_env() -> Result<AuditConfigLayer, ConfigError> {
	let queue_overflow_policy = match env_var("TRADEFLOW_SERVER_AUDIT_QUEUE_OVERFLOW_POLICY") {
		Some(v) => Some(parse_overflow_policy(&v).ok_or_else(|| ConfigError::InvalidValue {
			key: "TRADEFLOW_SERVER_AUDIT_QUEUE_OVERFLOW_POLICY".to_string(),
			message: format!("expected 'drop_newest' or 'block', got '{v}'"),
		})?),
		None => None,
	};

	Ok(AuditConfigLayer {
		enabled: env_bool("TRADEFLOW_SERVER_AUDIT_ENABLED"),
		queue_capacity: env_usize("TRADEFLOW_SERVER_AUDIT_QUEUE_CAPACITY")?,
		queue_overflow_policy,
		min_severity: env_var("TRADEFLOW_SERVER_AUDIT_MIN_SEVERITY"),
	})
}

fn parse_overflow_policy(value: &str) -> Option<QueueOverflowPolicy> {
	match value.to_lowercase().as_str() {
		"drop_newest" => Some(QueueOverflowPolicy::DropNewest),
		"block" => Some(QueueOverflowPolicy::Block),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let source = DefaultsSource;
		let layer = source.load().unwrap();
		assert!(layer.http.is_none());
		assert!(layer.authz.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_returns_empty() {
		let source = TomlSource::new("/nonexistent/config.toml");
		let layer = source.load().unwrap();
		assert!(layer.http.is_none());
	}

	#[test]
	fn test_toml_source_reads_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[authz]\nrole_cache_ttl_secs = 45\nidentity_header = \"x-user-id\"").unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		let authz = layer.authz.unwrap();
		assert_eq!(authz.role_cache_ttl_secs, Some(45));
		assert_eq!(authz.identity_header.as_deref(), Some("x-user-id"));
	}

	#[test]
	fn test_toml_source_reports_parse_errors() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[authz\nrole_cache_ttl_secs = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_env_parse_rejects_garbage() {
		std::env::set_var("TRADEFLOW_TEST_SOURCES_BAD_U64", "five");
		let err = env_u64("TRADEFLOW_TEST_SOURCES_BAD_U64").unwrap_err();
		std::env::remove_var("TRADEFLOW_TEST_SOURCES_BAD_U64");
		match err {
			ConfigError::InvalidValue { key, message } => {
				assert_eq!(key, "TRADEFLOW_TEST_SOURCES_BAD_U64");
				assert!(message.contains("five"));
			}
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn test_env_var_ignores_empty() {
		std::env::set_var("TRADEFLOW_TEST_SOURCES_EMPTY", "");
		assert_eq!(env_var("TRADEFLOW_TEST_SOURCES_EMPTY"), None);
		std::env::remove_var("TRADEFLOW_TEST_SOURCES_EMPTY");
	}

	#[test]
	fn test_parse_overflow_policy() {
		assert_eq!(parse_overflow_policy("BLOCK"), Some(QueueOverflowPolicy::Block));
		assert_eq!(
			parse_overflow_policy("drop_newest"),
			Some(QueueOverflowPolicy::DropNewest)
		);
		assert_eq!(parse_overflow_policy("drop_oldest"), None);
	}
}
