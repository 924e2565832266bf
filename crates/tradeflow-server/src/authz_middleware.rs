// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role-based authorization middleware.
//!
//! Two pieces run in order on every protected route:
//!
//! 1. [`load_user_context_layer`] resolves the caller's roles and stores an
//!    [`AuthContext`] in the request extensions
//! 2. An [`AuthorizationGate`] evaluates one [`Requirement`] against it
//!
//! # Security Properties
//!
//! - A role lookup failure leaves the request unauthenticated, never partially authorized
//! - Missing identity is answered with 401 `AUTH_REQUIRED`
//! - Every other denial is answered with 403 and queues exactly one audit event
//! - Audit writes are fire-and-forget and never delay or fail the response
//!
//! # Example
//!
//! ```ignore
//! let gates = state.gates();
//! Router::new()
//!     .route("/jobs/{id}", delete(delete_job))
//!     .route_layer(gates.require_resource_permission(Resource::Jobs))
//!     .layer(from_fn_with_state(state, load_user_context_layer));
//! ```

use std::{
	future::Future,
	net::SocketAddr,
	pin::Pin,
	sync::Arc,
	task::{Context, Poll},
};

use axum::{
	body::Body,
	extract::{ConnectInfo, State},
	http::{Extensions, HeaderMap, HeaderName, Method, Request, StatusCode, Uri},
	middleware::Next,
	response::{IntoResponse, Response},
};
use pin_project_lite::pin_project;
use tower::{Layer, Service};
use tracing::instrument;
use tradeflow_server_audit::{get_client_ip, AuditLogger};
use tradeflow_server_auth::{
	evaluate, load_user_context, Action, AuthContext, Identity, PermissionsMatrix, RequestInfo,
	Requirement, Resource, Role, UserId,
};

use crate::api::AppState;
use crate::error::denial_response;

// =============================================================================
// Context loading
// =============================================================================

/// Resolves roles for the request's identity and attaches an [`AuthContext`].
///
/// The identity comes from an [`Identity`] extension set by the upstream
/// authentication layer. When a trusted identity header is configured it is
/// used as a fallback. Any failure leaves the request unauthenticated.
#[instrument(
	name = "load_user_context",
	skip(state, request, next),
	fields(user_id = tracing::field::Empty)
)]
pub async fn load_user_context_layer(
	State(state): State<AppState>,
	mut request: Request<Body>,
	next: Next,
) -> Response {
	let identity = request
		.extensions()
		.get::<Identity>()
		.cloned()
		.or_else(|| {
			state
				.identity_header
				.as_ref()
				.and_then(|name| identity_from_header(&request, name))
		});

	if let Some(identity) = &identity {
		tracing::Span::current().record("user_id", tracing::field::display(&identity.user_id));
	}

	let ctx = load_user_context(identity.as_ref(), &state.role_loader).await;
	request.extensions_mut().insert(ctx);
	next.run(request).await
}

fn identity_from_header(request: &Request<Body>, name: &HeaderName) -> Option<Identity> {
	let raw = request.headers().get(name)?.to_str().ok()?;
	match raw.trim().parse::<UserId>() {
		Ok(user_id) => Some(Identity::new(user_id)),
		Err(e) => {
			tracing::debug!(header = %name, error = %e, "ignoring malformed identity header");
			None
		}
	}
}

/// Transport-independent view of the request for [`evaluate`].
///
/// The target identifier is the path segment following the resource name,
/// so `/api/jobs/42` targets `42` and `/api/jobs` targets nothing.
pub fn request_info(req: &Request<Body>, resource: Option<Resource>) -> RequestInfo {
	request_info_from_parts(
		req.method(),
		req.uri(),
		req.headers(),
		req.extensions(),
		resource,
	)
}

pub fn request_info_from_parts(
	method: &Method,
	uri: &Uri,
	headers: &HeaderMap,
	extensions: &Extensions,
	resource: Option<Resource>,
) -> RequestInfo {
	let path = uri.path();
	let peer = extensions
		.get::<ConnectInfo<SocketAddr>>()
		.map(|ConnectInfo(addr)| *addr);
	let mut info =
		RequestInfo::new(method.clone(), path).with_client_ip(get_client_ip(headers, peer));
	if let Some(id) = resource.and_then(|r| target_id(path, r)) {
		info = info.with_target_id(id);
	}
	info
}

fn target_id(path: &str, resource: Resource) -> Option<String> {
	let name = resource.as_str();
	let dashed = name.replace('_', "-");
	let mut segments = path.split('/').filter(|s| !s.is_empty());
	segments.find(|s| *s == name || *s == dashed)?;
	segments.next().map(str::to_string)
}

fn requirement_resource(requirement: &Requirement) -> Option<Resource> {
	match requirement {
		Requirement::Permission(resource, _) | Requirement::ResourcePermission(resource) => {
			Some(*resource)
		}
		Requirement::AnyRole(_) | Requirement::MinimumRole(_) => None,
	}
}

// =============================================================================
// Gates
// =============================================================================

/// Builds [`AuthorizationGate`]s that share one matrix and audit logger.
#[derive(Clone, Debug)]
pub struct Gates {
	matrix: Arc<PermissionsMatrix>,
	audit: AuditLogger,
}

impl Gates {
	pub fn new(matrix: Arc<PermissionsMatrix>, audit: AuditLogger) -> Self {
		Self { matrix, audit }
	}

	pub fn require(&self, requirement: Requirement) -> AuthorizationGate {
		AuthorizationGate {
			requirement: Arc::new(requirement),
			matrix: Arc::clone(&self.matrix),
			audit: self.audit.clone(),
		}
	}

	/// Passes if the user holds any of `roles`.
	pub fn require_role(&self, roles: impl Into<Vec<Role>>) -> AuthorizationGate {
		self.require(Requirement::AnyRole(roles.into()))
	}

	/// Passes if any of the user's roles may perform `action` on `resource`.
	pub fn require_permission(&self, resource: Resource, action: Action) -> AuthorizationGate {
		self.require(Requirement::Permission(resource, action))
	}

	/// Passes if the user's primary role ranks at or above `minimum`.
	pub fn require_minimum_role(&self, minimum: Role) -> AuthorizationGate {
		self.require(Requirement::MinimumRole(minimum))
	}

	/// Like [`Gates::require_permission`] with the action derived from the HTTP verb.
	pub fn require_resource_permission(&self, resource: Resource) -> AuthorizationGate {
		self.require(Requirement::ResourcePermission(resource))
	}

	pub fn owner_or_admin(&self) -> AuthorizationGate {
		self.require(Requirement::owner_or_admin())
	}

	pub fn manager_or_above(&self) -> AuthorizationGate {
		self.require(Requirement::manager_or_above())
	}
}

/// Route layer enforcing one [`Requirement`].
///
/// Reads the [`AuthContext`] left by [`load_user_context_layer`]; a request
/// that never went through it is treated as unauthenticated.
#[derive(Clone, Debug)]
pub struct AuthorizationGate {
	requirement: Arc<Requirement>,
	matrix: Arc<PermissionsMatrix>,
	audit: AuditLogger,
}

impl<S> Layer<S> for AuthorizationGate {
	type Service = AuthorizationGateService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		AuthorizationGateService {
			inner,
			requirement: Arc::clone(&self.requirement),
			matrix: Arc::clone(&self.matrix),
			audit: self.audit.clone(),
		}
	}
}

/// Service wrapper for [`AuthorizationGate`].
#[derive(Clone)]
pub struct AuthorizationGateService<S> {
	inner: S,
	requirement: Arc<Requirement>,
	matrix: Arc<PermissionsMatrix>,
	audit: AuditLogger,
}

impl<S> Service<Request<Body>> for AuthorizationGateService<S>
where
	S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
	S::Future: Send,
{
	type Response = Response;
	type Error = S::Error;
	type Future = AuthorizationFuture<S::Future>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		let ctx = req
			.extensions()
			.get::<AuthContext>()
			.cloned()
			.unwrap_or_default();
		let info = request_info(&req, requirement_resource(&self.requirement));

		let decision = evaluate(&ctx, &self.requirement, &info, &self.matrix);
		if let Some(event) = decision.audit {
			self.audit.log_audit_event(event);
		}

		match decision.outcome {
			Ok(()) => AuthorizationFuture::Inner {
				fut: self.inner.call(req),
			},
			Err(denial) => AuthorizationFuture::Rejected {
				resp: Some(denial_response(denial)),
			},
		}
	}
}

pin_project! {
	/// Future for [`AuthorizationGateService`].
	#[project = AuthorizationFutureProj]
	pub enum AuthorizationFuture<F> {
		Inner { #[pin] fut: F },
		Rejected { resp: Option<Response> },
	}
}

impl<F, E> Future for AuthorizationFuture<F>
where
	F: Future<Output = Result<Response, E>>,
{
	type Output = Result<Response, E>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match self.project() {
			AuthorizationFutureProj::Inner { fut } => fut.poll(cx),
			AuthorizationFutureProj::Rejected { resp } => Poll::Ready(Ok(resp
				.take()
				.unwrap_or_else(|| StatusCode::INTERNAL_SERVER_ERROR.into_response()))),
		}
	}
}
