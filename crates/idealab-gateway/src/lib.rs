// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP adapter for the IdéaLab voting core.
//!
//! A thin axum layer: each handler builds a transport-agnostic request
//! context, resolves the caller's identity, invokes the vote ledger or
//! comment service, and maps the result or error to a JSON response. A
//! freshly minted anonymous session is returned as an HTTP-only cookie.

pub mod context;
pub mod error;
pub mod handlers;
pub mod server;

pub use context::RequestMeta;
pub use error::{ApiError, ErrorResponse, status_for};
pub use server::{AppState, router, start_server};
