//! Client identification for rate limiting.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::ratelimit::constants::{
    IPV6_PREFIX_SEGMENTS, IP_IDENTIFIER_PREFIX, UNKNOWN_IP, USER_IDENTIFIER_PREFIX,
};

/// Extract client IP from connection info or forwarding headers.
///
/// Fallback order: direct connection address, then the first valid
/// X-Forwarded-For entry, then X-Real-IP. With `trust_proxy` the headers are
/// consulted before the connection address. Returns `None` if nothing parses.
pub fn extract_client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy: bool,
) -> Option<IpAddr> {
    let peer = connect_info.map(|c| c.0.ip());

    if trust_proxy {
        forwarded_ip(headers).or(peer)
    } else {
        peer.or_else(|| forwarded_ip(headers))
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded_for = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|first| first.trim().parse().ok());

    forwarded_for.or_else(|| {
        headers
            .get("X-Real-IP")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok())
    })
}

/// Normalize IP address for rate limiting.
///
/// IPv4 addresses are kept as-is.
/// IPv6 addresses are normalized to /64 prefix to prevent circumvention
/// by using multiple addresses within the same allocation.
pub fn normalize_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => {
            let seg = v6.segments();
            let prefix: Vec<String> = (0..IPV6_PREFIX_SEGMENTS)
                .map(|i| format!("{:x}", seg[i]))
                .collect();
            format!("{}::/64", prefix.join(":"))
        }
    }
}

/// Rate limit identifier for an authenticated user.
pub fn user_identifier(user_id: Uuid) -> String {
    format!("{USER_IDENTIFIER_PREFIX}{user_id}")
}

/// Rate limit identifier for an anonymous client, `ip:unknown` when no address is known.
pub fn ip_identifier(normalized_ip: Option<&str>) -> String {
    format!(
        "{IP_IDENTIFIER_PREFIX}{}",
        normalized_ip.unwrap_or(UNKNOWN_IP)
    )
}
