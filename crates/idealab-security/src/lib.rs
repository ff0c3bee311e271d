// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller identity and abuse mitigation for IdéaLab.
//!
//! Provides identity resolution (bearer JWT or anonymous session), the
//! abuse guard (deny-list, rate windows, behavior heuristic), the spam
//! heuristic for submitted text, and the background sweeper that prunes
//! guard state.

pub mod abuse;
pub mod address;
pub mod behavior;
pub mod credentials;
pub mod identity;
pub mod rate;
pub mod spam;
pub mod sweep;

pub use abuse::AbuseGuard;
pub use address::{RequestContext, client_address, normalize};
pub use credentials::{Claims, CredentialVerifier, JwtVerifier, sign_token};
pub use identity::{IdentityResolver, IssuedSession, Resolution, mint_session_token};
pub use spam::is_spam;
pub use sweep::GuardSweeper;
