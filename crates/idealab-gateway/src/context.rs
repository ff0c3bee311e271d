// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction of transport facts and session cookie handling.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use idealab_security::{IssuedSession, RequestContext};

use crate::server::AppState;

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// The request's [`RequestContext`], built from the socket, headers, and
/// the configured session cookie.
#[derive(Debug, Clone)]
pub struct RequestMeta(pub RequestContext);

impl FromRequestParts<AppState> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let session_cookie = jar
            .get(state.resolver.cookie_name())
            .map(|c| c.value().to_string());
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(Self(RequestContext {
            authorization: header(&parts.headers, "authorization"),
            session_cookie,
            peer,
            forwarded_for: header(&parts.headers, "x-forwarded-for"),
            real_ip: header(&parts.headers, "x-real-ip"),
        }))
    }
}

/// Add the minted session cookie, if any, to `jar`.
pub fn with_session(jar: CookieJar, issued: Option<IssuedSession>) -> CookieJar {
    let Some(issued) = issued else {
        return jar;
    };
    let cookie = Cookie::build((issued.cookie_name, issued.token.as_str().to_string()))
        .path("/")
        .http_only(issued.http_only)
        .secure(issued.secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(i64::from(issued.max_age_days)));
    jar.add(cookie)
}
