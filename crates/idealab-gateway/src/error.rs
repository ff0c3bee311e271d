// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from core errors to HTTP responses.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use idealab_core::{DenyReason, IdeaLabError};

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// User-facing description.
    pub error: String,
    /// Stable machine code.
    pub code: String,
}

/// Wrapper that renders an [`IdeaLabError`] as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub IdeaLabError);

impl From<IdeaLabError> for ApiError {
    fn from(err: IdeaLabError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(IdeaLabError::InvalidInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(IdeaLabError::InvalidInput(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(IdeaLabError::InvalidInput(rejection.body_text()))
    }
}

/// HTTP status for a core error.
pub fn status_for(err: &IdeaLabError) -> StatusCode {
    match err {
        IdeaLabError::NotFound { .. } => StatusCode::NOT_FOUND,
        IdeaLabError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        IdeaLabError::Denied(DenyReason::RateLimited | DenyReason::SuspiciousBehavior) => {
            StatusCode::TOO_MANY_REQUESTS
        }
        IdeaLabError::Denied(DenyReason::Spam) => StatusCode::BAD_REQUEST,
        IdeaLabError::Denied(_) => StatusCode::FORBIDDEN,
        IdeaLabError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn body_for(err: &IdeaLabError) -> ErrorResponse {
    let (error, code) = match err {
        IdeaLabError::NotFound { .. } => (err.to_string(), "not_found"),
        IdeaLabError::InvalidInput(message) => (message.clone(), "invalid_input"),
        IdeaLabError::Denied(reason) => (reason.message().to_string(), reason.code()),
        IdeaLabError::StoreUnavailable { .. } => (
            "Service temporarily unavailable. Please retry.".to_string(),
            "store_unavailable",
        ),
        _ => ("Internal server error".to_string(), "internal"),
    };
    ErrorResponse {
        error,
        code: code.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(error = %self.0, status = status.as_u16(), "request failed");
        }
        (status, Json(body_for(&self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_taxonomy() {
        let cases = [
            (IdeaLabError::idea_not_found(1), StatusCode::NOT_FOUND),
            (
                IdeaLabError::InvalidInput("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                IdeaLabError::Denied(DenyReason::RateLimited),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                IdeaLabError::Denied(DenyReason::SuspiciousBehavior),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (IdeaLabError::Denied(DenyReason::Spam), StatusCode::BAD_REQUEST),
            (IdeaLabError::Denied(DenyReason::Blocked), StatusCode::FORBIDDEN),
            (
                IdeaLabError::Denied(DenyReason::AddressAlreadyVoted),
                StatusCode::FORBIDDEN,
            ),
            (
                IdeaLabError::Denied(DenyReason::Forbidden),
                StatusCode::FORBIDDEN,
            ),
            (
                IdeaLabError::store(std::io::Error::other("down")),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                IdeaLabError::ConstraintConflict,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err), status, "{err}");
        }
    }

    #[test]
    fn denial_body_never_leaks_internals() {
        let body = body_for(&IdeaLabError::Denied(DenyReason::RateLimited));
        assert_eq!(body.code, "rate_limited");
        assert!(!body.error.chars().any(|c| c.is_ascii_digit()));

        let body = body_for(&IdeaLabError::store(std::io::Error::other("disk I/O error")));
        assert!(!body.error.contains("disk"));
    }
}
