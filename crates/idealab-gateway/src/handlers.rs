// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the vote and comment API.
//!
//! Handlers only translate: resolve identity, call the core, map the result.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use idealab_comments::CommentDraft;
use idealab_core::{
    Ballot, Comment, CommentId, CommentPage, CurrentVotes, DenyReason, HealthStatus, IdeaId,
    IdeaLabError, Identity, VoteAction, VoteCategory, VoteTally,
};

use crate::context::{RequestMeta, with_session};
use crate::error::ApiError;
use crate::server::AppState;

/// Request body for casting a vote.
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub idea_id: IdeaId,
    pub vote_type: String,
}

/// Response body for a cast vote.
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub message: String,
    pub action: VoteAction,
    /// Value now held, `null` after a retraction.
    pub vote_type: Option<Ballot>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub message: String,
    pub comment: Comment,
}

#[derive(Debug, Serialize)]
pub struct RepliesResponse {
    pub replies: Vec<Comment>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

fn vote_message(action: VoteAction) -> &'static str {
    match action {
        VoteAction::Created => "Vote recorded",
        VoteAction::Updated => "Vote updated",
        VoteAction::Removed => "Vote removed",
    }
}

async fn cast(
    state: AppState,
    meta: RequestMeta,
    jar: CookieJar,
    category: VoteCategory,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> Response {
    let resolution = state.resolver.resolve(&meta.0).await;
    let jar = with_session(jar, resolution.issued);

    let result = async {
        let Json(request) = body?;
        let ballot = Ballot::parse(category, &request.vote_type)?;
        let outcome = state
            .ledger
            .cast_vote(&resolution.identity, request.idea_id, ballot)
            .await?;
        Ok::<_, ApiError>(Json(VoteResponse {
            message: vote_message(outcome.action).to_string(),
            action: outcome.action,
            vote_type: outcome.value,
        }))
    }
    .await;

    (jar, result).into_response()
}

/// POST /api/votes/regular
pub async fn post_regular_vote(
    State(state): State<AppState>,
    meta: RequestMeta,
    jar: CookieJar,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> Response {
    cast(state, meta, jar, VoteCategory::Regular, body).await
}

/// POST /api/votes/payment
pub async fn post_payment_vote(
    State(state): State<AppState>,
    meta: RequestMeta,
    jar: CookieJar,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> Response {
    cast(state, meta, jar, VoteCategory::Payment, body).await
}

/// GET /api/votes/idea/{id}
pub async fn get_idea_tally(
    State(state): State<AppState>,
    id: Result<Path<IdeaId>, PathRejection>,
) -> Result<Json<VoteTally>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.ledger.tally(id).await?))
}

/// GET /api/votes/user/{idea_id}
///
/// Never mints a session: a caller without one simply has no votes.
pub async fn get_user_votes(
    State(state): State<AppState>,
    meta: RequestMeta,
    idea_id: Result<Path<IdeaId>, PathRejection>,
) -> Result<Json<CurrentVotes>, ApiError> {
    let Path(idea_id) = idea_id?;
    let identity = state.resolver.resolve_existing(&meta.0).await;
    Ok(Json(
        state
            .ledger
            .current_votes(identity.as_ref(), idea_id)
            .await?,
    ))
}

/// POST /api/comments
pub async fn post_comment(
    State(state): State<AppState>,
    meta: RequestMeta,
    jar: CookieJar,
    body: Result<Json<CommentDraft>, JsonRejection>,
) -> Response {
    let resolution = state.resolver.resolve(&meta.0).await;
    let jar = with_session(jar, resolution.issued);

    let result = async {
        let Json(draft) = body?;
        let comment = state
            .comments
            .post_comment(&resolution.identity, draft)
            .await?;
        Ok::<_, ApiError>((
            StatusCode::CREATED,
            Json(CommentResponse {
                message: "Comment posted".to_string(),
                comment,
            }),
        ))
    }
    .await;

    (jar, result).into_response()
}

/// GET /api/comments/idea/{id}?page&limit
pub async fn list_comments(
    State(state): State<AppState>,
    id: Result<Path<IdeaId>, PathRejection>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<CommentPage>, ApiError> {
    let Path(id) = id?;
    let Query(query) = query?;
    Ok(Json(
        state
            .comments
            .list_comments(id, query.page, query.limit)
            .await?,
    ))
}

/// GET /api/comments/{id}/replies
pub async fn list_replies(
    State(state): State<AppState>,
    id: Result<Path<CommentId>, PathRejection>,
) -> Result<Json<RepliesResponse>, ApiError> {
    let Path(id) = id?;
    let replies = state.comments.list_replies(id).await?;
    Ok(Json(RepliesResponse { replies }))
}

/// Identity for owner-only operations. A caller without credentials or a
/// session cannot own anything.
async fn owner_identity(state: &AppState, meta: &RequestMeta) -> Result<Identity, ApiError> {
    state
        .resolver
        .resolve_existing(&meta.0)
        .await
        .ok_or(ApiError(IdeaLabError::Denied(DenyReason::Forbidden)))
}

/// PUT /api/comments/{id}
pub async fn edit_comment(
    State(state): State<AppState>,
    meta: RequestMeta,
    id: Result<Path<CommentId>, PathRejection>,
    body: Result<Json<EditRequest>, JsonRejection>,
) -> Result<Json<CommentResponse>, ApiError> {
    let Path(id) = id?;
    let Json(request) = body?;
    let identity = owner_identity(&state, &meta).await?;
    let comment = state
        .comments
        .edit_comment(&identity, id, &request.content)
        .await?;
    Ok(Json(CommentResponse {
        message: "Comment updated".to_string(),
        comment,
    }))
}

/// DELETE /api/comments/{id}
pub async fn delete_comment(
    State(state): State<AppState>,
    meta: RequestMeta,
    id: Result<Path<CommentId>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id?;
    let identity = owner_identity(&state, &meta).await?;
    state.comments.delete_comment(&identity, id).await?;
    Ok(Json(MessageResponse {
        message: "Comment deleted".to_string(),
    }))
}

/// GET /health
///
/// Unhealthy if any adapter reports unhealthy or fails its check.
pub async fn get_health(State(state): State<AppState>) -> Response {
    let mut status = "healthy";
    for adapter in &state.adapters {
        match adapter.health_check().await {
            Ok(HealthStatus::Healthy) => {}
            Ok(HealthStatus::Degraded(reason)) => {
                tracing::warn!(adapter = adapter.name(), %reason, "adapter degraded");
                if status == "healthy" {
                    status = "degraded";
                }
            }
            Ok(HealthStatus::Unhealthy(reason)) => {
                tracing::warn!(adapter = adapter.name(), %reason, "adapter unhealthy");
                status = "unhealthy";
            }
            Err(e) => {
                tracing::warn!(adapter = adapter.name(), error = %e, "health check failed");
                status = "unhealthy";
            }
        }
    }

    let code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
        .into_response()
}
