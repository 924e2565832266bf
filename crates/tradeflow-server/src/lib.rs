// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tradeflow authorization server.
//!
//! Puts the RBAC core from `tradeflow-server-auth` behind axum: a context
//! loading middleware, per-route authorization gates, role administration and
//! audit log review.

pub mod api;
pub mod authz_middleware;
pub mod error;
pub mod routes;
pub mod version;

pub use api::{create_app_state, create_router, AppState};
pub use authz_middleware::{load_user_context_layer, AuthorizationGate, Gates};
pub use error::{ErrorResponse, ServerError};
pub use tradeflow_server_config::ServerConfig;
