// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `idealab serve` command implementation.
//!
//! Opens SQLite storage (applying migrations), wires the identity resolver,
//! abuse guard, vote ledger, and comment service into the HTTP gateway, and
//! runs the guard sweeper alongside the server until a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use idealab_comments::CommentService;
use idealab_config::model::IdeaLabConfig;
use idealab_core::{IdeaLabError, PluginAdapter};
use idealab_gateway::{AppState, start_server};
use idealab_security::{
    AbuseGuard, CredentialVerifier, GuardSweeper, IdentityResolver, JwtVerifier,
};
use idealab_storage::SqliteStore;
use idealab_votes::{AddressRestriction, VoteLedger};
use tracing::{info, warn};

use crate::shutdown;

/// Wire the request stack over `store`.
fn build_state(
    config: &IdeaLabConfig,
    store: Arc<SqliteStore>,
) -> Result<(AppState, Arc<AbuseGuard>), IdeaLabError> {
    let environment = config.server.environment;
    let guard = Arc::new(AbuseGuard::from_config(&config.guard, environment)?);

    let verifier = match config.auth.jwt_secret.as_deref() {
        Some(secret) => {
            let verifier: Arc<dyn CredentialVerifier> =
                Arc::new(JwtVerifier::new(secret, store.clone()));
            Some(verifier)
        }
        None => {
            warn!("auth.jwt_secret not set, every caller is treated as anonymous");
            None
        }
    };

    let adapter: Arc<dyn PluginAdapter> = store.clone();
    let state = AppState {
        resolver: Arc::new(IdentityResolver::new(
            verifier,
            &config.identity,
            environment,
        )),
        ledger: Arc::new(VoteLedger::new(
            store.clone(),
            guard.clone(),
            AddressRestriction::from_config(&config.voting),
        )),
        comments: Arc::new(CommentService::new(
            store,
            guard.clone(),
            config.comments.clone(),
        )),
        adapters: vec![adapter],
    };
    Ok((state, guard))
}

/// Runs the `idealab serve` command.
pub async fn run_serve(config: IdeaLabConfig) -> Result<(), IdeaLabError> {
    init_tracing(&config.server.log_level);

    info!(
        environment = ?config.server.environment,
        anonymous_mode = ?config.voting.anonymous_mode,
        "starting idealab serve"
    );

    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;

    let (state, guard) = build_state(&config, store.clone())?;

    let cancel = shutdown::install_signal_handler();
    let sweeper = GuardSweeper::new(
        guard,
        Duration::from_secs(config.guard.sweep_interval_secs),
    )
    .spawn(cancel.clone());

    let result = start_server(
        &config.server.host,
        config.server.port,
        state,
        cancel.clone(),
    )
    .await;

    // The server may have stopped on its own error; make sure the sweeper stops too.
    cancel.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "guard sweeper task failed");
    }
    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }

    info!("idealab stopped");
    result
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("idealab={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
