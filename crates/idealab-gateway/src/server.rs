// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use idealab_comments::CommentService;
use idealab_core::{IdeaLabError, PluginAdapter};
use idealab_security::IdentityResolver;
use idealab_votes::VoteLedger;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<IdentityResolver>,
    pub ledger: Arc<VoteLedger>,
    pub comments: Arc<CommentService>,
    /// Adapters reported by `/health`.
    pub adapters: Vec<Arc<dyn PluginAdapter>>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/api/votes/regular", post(handlers::post_regular_vote))
        .route("/api/votes/payment", post(handlers::post_payment_vote))
        .route("/api/votes/idea/{id}", get(handlers::get_idea_tally))
        .route("/api/votes/user/{idea_id}", get(handlers::get_user_votes))
        .route("/api/comments", post(handlers::post_comment))
        .route("/api/comments/idea/{id}", get(handlers::list_comments))
        .route("/api/comments/{id}/replies", get(handlers::list_replies))
        .route(
            "/api/comments/{id}",
            put(handlers::edit_comment).delete(handlers::delete_comment),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `host:port` and serve until `cancel` fires.
pub async fn start_server(
    host: &str,
    port: u16,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), IdeaLabError> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| IdeaLabError::Config(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("server listening on {addr}");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(cancel.cancelled_owned())
    .await
    .map_err(|e| IdeaLabError::Internal(format!("server error: {e}")))?;

    tracing::info!("server stopped");
    Ok(())
}
