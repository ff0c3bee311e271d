// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client network address extraction and normalization.

use std::net::{IpAddr, Ipv4Addr};

/// Transport-level facts about an inbound request.
///
/// The HTTP adapter fills this from the socket and headers; nothing in this
/// crate touches HTTP types directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Raw `Authorization` header value.
    pub authorization: Option<String>,
    /// Value of the anonymous session cookie.
    pub session_cookie: Option<String>,
    /// Socket peer address.
    pub peer: Option<IpAddr>,
    /// Raw `X-Forwarded-For` header value.
    pub forwarded_for: Option<String>,
    /// Raw `X-Real-IP` header value.
    pub real_ip: Option<String>,
}

impl RequestContext {
    /// Bearer token from the `Authorization` header, if present.
    pub fn bearer_token(&self) -> Option<&str> {
        let header = self.authorization.as_deref()?.trim();
        let (scheme, token) = header.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    }
}

/// Reduce IPv4-mapped IPv6 addresses to IPv4 and `::1` to `127.0.0.1`.
pub fn normalize(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) if v6.is_loopback() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}

fn parse_header_addr(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    let raw = raw
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .unwrap_or(raw);
    raw.parse().ok()
}

/// Pick the client address for `ctx`.
///
/// Priority: socket peer, first `X-Forwarded-For` entry, `X-Real-IP`, then
/// loopback. Values that do not parse are skipped.
pub fn client_address(ctx: &RequestContext) -> IpAddr {
    ctx.peer
        .or_else(|| {
            ctx.forwarded_for
                .as_deref()
                .and_then(|v| v.split(',').next())
                .and_then(parse_header_addr)
        })
        .or_else(|| ctx.real_ip.as_deref().and_then(parse_header_addr))
        .map(normalize)
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
