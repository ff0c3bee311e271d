// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy shared by every IdéaLab crate.

use thiserror::Error;

use crate::types::DenyReason;

/// The primary error type returned by the voting and comment core.
///
/// Only [`IdeaLabError::StoreUnavailable`] is retryable. The transport layer
/// maps the remaining variants to terminal client or server errors.
#[derive(Debug, Error)]
pub enum IdeaLabError {
    /// The referenced entity (idea, comment) does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Missing or out-of-range input. The caller must correct and resubmit.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Rejected by the abuse guard, content guard, restriction policy, or ownership check.
    #[error("denied: {0}")]
    Denied(DenyReason),

    /// Transient persistence failure. Safe to retry with backoff.
    #[error("store unavailable: {source}")]
    StoreUnavailable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A uniqueness or compare-and-swap conflict observed by the store.
    ///
    /// Internal signal for the vote ledger; never surfaced to callers.
    #[error("constraint conflict")]
    ConstraintConflict,

    /// Configuration errors detected at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IdeaLabError {
    /// Shorthand for a missing idea.
    pub fn idea_not_found(id: i64) -> Self {
        Self::NotFound { entity: "idea", id }
    }

    /// Shorthand for a missing comment.
    pub fn comment_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "comment",
            id,
        }
    }

    /// Wrap any error as a transient store failure.
    pub fn store<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::StoreUnavailable {
            source: Box::new(source),
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, IdeaLabError>;
