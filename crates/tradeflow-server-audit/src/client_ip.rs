// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Originating client address resolution.

use std::net::SocketAddr;

use http::HeaderMap;

/// Resolve the client IP for audit records.
///
/// Checks in order:
/// 1. `X-Forwarded-For` (first non-empty entry, i.e. the original client)
/// 2. `X-Real-IP`
/// 3. The connection's peer address
pub fn get_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
	if let Some(xff) = headers.get("x-forwarded-for") {
		if let Ok(xff_str) = xff.to_str() {
			if let Some(first_ip) = xff_str.split(',').map(str::trim).find(|s| !s.is_empty()) {
				return Some(first_ip.to_string());
			}
		}
	}

	if let Some(real_ip) = headers.get("x-real-ip") {
		if let Ok(ip) = real_ip.to_str() {
			let ip = ip.trim();
			if !ip.is_empty() {
				return Some(ip.to_string());
			}
		}
	}

	peer.map(|addr| addr.ip().to_string())
}
