// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for Tradeflow server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`TRADEFLOW_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use tradeflow_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}:{}", config.http.host, config.http.port);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, SYSTEM_CONFIG_PATH,
};

use tracing::{debug, info};

const SEVERITY_NAMES: &[&str] = &["debug", "info", "notice", "warning", "error", "critical"];

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub authz: AuthzConfig,
	pub audit: AuditConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`TRADEFLOW_SERVER_*`)
/// 2. Config file (`/etc/tradeflow/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merges the given sources in precedence order and validates the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		database: layer.database.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
		authz: layer.authz.unwrap_or_default().finalize(),
		audit: layer.audit.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		role_cache_ttl_secs = config.authz.role_cache_ttl_secs,
		identity_header_configured = config.authz.identity_header.is_some(),
		audit_enabled = config.audit.enabled,
		"Server configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	if config.authz.role_cache_ttl_secs == 0 {
		return Err(ConfigError::Validation(
			"authz.role_cache_ttl_secs must be greater than zero".to_string(),
		));
	}

	if config.audit.queue_capacity == 0 {
		return Err(ConfigError::Validation(
			"audit.queue_capacity must be greater than zero".to_string(),
		));
	}

	if !SEVERITY_NAMES.contains(&config.audit.min_severity.as_str()) {
		return Err(ConfigError::Validation(format!(
			"audit.min_severity '{}' is not one of {}",
			config.audit.min_severity,
			SEVERITY_NAMES.join(", ")
		)));
	}

	if config.database.max_connections == 0 {
		return Err(ConfigError::Validation(
			"database.max_connections must be greater than zero".to_string(),
		));
	}

	Ok(())
}
