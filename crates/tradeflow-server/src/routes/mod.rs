// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod admin;
pub mod health;
pub mod me;

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use tradeflow_server_auth::{AuthContext, Denial, RequestInfo, UserContext};

use crate::authz_middleware::request_info_from_parts;

/// The loaded user context, or the denial for its absence.
pub fn require_user(ctx: &AuthContext) -> Result<&UserContext, Denial> {
	match ctx {
		AuthContext::Unauthenticated => Err(Denial::auth_required()),
		AuthContext::Authenticated(_) => Err(Denial::context_not_loaded()),
		AuthContext::ContextLoaded(user) => Ok(user),
	}
}

/// Request metadata for audit records written by handlers.
pub struct RequestMeta(pub RequestInfo);

impl<S> FromRequestParts<S> for RequestMeta
where
	S: Send + Sync,
{
	type Rejection = Infallible;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		Ok(RequestMeta(request_info_from_parts(
			&parts.method,
			&parts.uri,
			&parts.headers,
			&parts.extensions,
			None,
		)))
	}
}
