// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod audit;
mod authz;
mod database;
mod http;
mod logging;

pub use audit::{AuditConfig, AuditConfigLayer, QueueOverflowPolicy};
pub use authz::{AuthzConfig, AuthzConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
