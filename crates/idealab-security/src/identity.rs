// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity resolution.
//!
//! Resolution order:
//! 1. Bearer token, verified and backed by an active user.
//! 2. Existing anonymous session cookie.
//! 3. A freshly minted session token, returned so the transport can set it.
//!
//! Resolution never fails. Credential problems degrade to anonymous.

use std::sync::Arc;

use rand::RngCore;
use tracing::debug;

use idealab_config::model::{Environment, IdentityConfig};
use idealab_core::{Identity, SessionToken};

use crate::address::{RequestContext, client_address};
use crate::credentials::CredentialVerifier;

/// Bytes of entropy in a minted session token.
const SESSION_TOKEN_BYTES: usize = 32;

/// Generate a new hex-encoded anonymous session token.
pub fn mint_session_token() -> SessionToken {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    SessionToken::from_minted(hex::encode(bytes))
}

/// A session cookie the transport must attach to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: SessionToken,
    pub cookie_name: String,
    pub max_age_days: u32,
    pub secure: bool,
    pub http_only: bool,
}

/// Resolved identity plus any cookie that must be set.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub identity: Identity,
    pub issued: Option<IssuedSession>,
}

#[derive(Clone)]
pub struct IdentityResolver {
    verifier: Option<Arc<dyn CredentialVerifier>>,
    cookie_name: String,
    max_age_days: u32,
    secure: bool,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("verifier", &self.verifier.is_some())
            .field("cookie_name", &self.cookie_name)
            .field("max_age_days", &self.max_age_days)
            .field("secure", &self.secure)
            .finish()
    }
}

impl IdentityResolver {
    /// Without a verifier every caller is anonymous.
    pub fn new(
        verifier: Option<Arc<dyn CredentialVerifier>>,
        config: &IdentityConfig,
        environment: Environment,
    ) -> Self {
        Self {
            verifier,
            cookie_name: config.cookie_name.clone(),
            max_age_days: config.session_max_age_days,
            secure: environment.is_production(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Resolve the caller, minting a session when none is presented.
    pub async fn resolve(&self, ctx: &RequestContext) -> Resolution {
        if let Some(identity) = self.resolve_existing(ctx).await {
            return Resolution {
                identity,
                issued: None,
            };
        }

        let token = mint_session_token();
        let address = client_address(ctx);
        debug!(%address, session = %token.fingerprint(), "minted anonymous session");
        Resolution {
            identity: Identity::Anonymous {
                session: token.clone(),
                address,
            },
            issued: Some(IssuedSession {
                token,
                cookie_name: self.cookie_name.clone(),
                max_age_days: self.max_age_days,
                secure: self.secure,
                http_only: true,
            }),
        }
    }

    /// Resolve the caller without minting.
    ///
    /// Returns `None` for an anonymous caller with no usable session cookie.
    pub async fn resolve_existing(&self, ctx: &RequestContext) -> Option<Identity> {
        if let Some(principal) = self.verify_bearer(ctx).await {
            return Some(Identity::Authenticated(principal));
        }
        let session = ctx.session_cookie.as_deref().and_then(SessionToken::parse)?;
        Some(Identity::Anonymous {
            session,
            address: client_address(ctx),
        })
    }

    async fn verify_bearer(&self, ctx: &RequestContext) -> Option<idealab_core::Principal> {
        let token = ctx.bearer_token()?;
        let Some(verifier) = &self.verifier else {
            debug!("bearer token presented but no credential verifier configured");
            return None;
        };
        verifier.verify(token).await
    }
}
