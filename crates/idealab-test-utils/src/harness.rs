// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full request stack (identity resolver, abuse
//! guard, vote ledger, comment service, router) over a temp SQLite database
//! or a [`MemoryStore`], and offers seeding helpers for ideas and users.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use idealab_comments::CommentService;
use idealab_config::model::{Environment, IdeaLabConfig, StorageConfig};
use idealab_core::{
    CommentStore, IdeaId, IdeaLabError, PluginAdapter, Principal, UserDirectory, UserId, VoteStore,
};
use idealab_gateway::AppState;
use idealab_security::{AbuseGuard, CredentialVerifier, IdentityResolver, JwtVerifier, sign_token};
use idealab_storage::{IdeaCounters, SqliteStore, queries};
use idealab_votes::{AddressRestriction, VoteLedger};

use crate::memory_store::MemoryStore;

/// JWT secret the harness configures by default.
pub const TEST_JWT_SECRET: &str = "test-harness-secret";

/// Which store backs the harness.
pub enum Backend {
    Sqlite(Arc<SqliteStore>),
    Memory(Arc<MemoryStore>),
}

type Handles = (
    Arc<dyn VoteStore>,
    Arc<dyn CommentStore>,
    Arc<dyn UserDirectory>,
    Arc<dyn PluginAdapter>,
);

fn handles<S>(store: &Arc<S>) -> Handles
where
    S: VoteStore + CommentStore + UserDirectory + PluginAdapter + 'static,
{
    (
        store.clone() as Arc<dyn VoteStore>,
        store.clone() as Arc<dyn CommentStore>,
        store.clone() as Arc<dyn UserDirectory>,
        store.clone() as Arc<dyn PluginAdapter>,
    )
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: IdeaLabConfig,
    memory: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = IdeaLabConfig::default();
        config.auth.jwt_secret = Some(TEST_JWT_SECRET.to_string());
        Self {
            config,
            memory: false,
        }
    }

    /// Adjust the configuration before the stack is built.
    pub fn with_config(mut self, edit: impl FnOnce(&mut IdeaLabConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.config.server.environment = environment;
        self
    }

    /// Back the harness with a [`MemoryStore`] instead of SQLite.
    pub fn in_memory(mut self) -> Self {
        self.memory = true;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, IdeaLabError> {
        let config = self.config;
        let environment = config.server.environment;

        let (backend, temp_dir) = if self.memory {
            (Backend::Memory(Arc::new(MemoryStore::new())), None)
        } else {
            let temp_dir = tempfile::TempDir::new().map_err(IdeaLabError::store)?;
            let db_path = temp_dir.path().join("test.db");
            let store = SqliteStore::new(StorageConfig {
                database_path: db_path.to_string_lossy().to_string(),
                wal_mode: true,
            });
            store.initialize().await?;
            (Backend::Sqlite(Arc::new(store)), Some(temp_dir))
        };

        let (votes, comments, users, adapter) = match &backend {
            Backend::Sqlite(s) => handles(s),
            Backend::Memory(m) => handles(m),
        };

        let guard = Arc::new(AbuseGuard::from_config(&config.guard, environment)?);
        let verifier: Option<Arc<dyn CredentialVerifier>> = config
            .auth
            .jwt_secret
            .as_deref()
            .map(|secret| Arc::new(JwtVerifier::new(secret, users)) as Arc<dyn CredentialVerifier>);

        let state = AppState {
            resolver: Arc::new(IdentityResolver::new(
                verifier,
                &config.identity,
                environment,
            )),
            ledger: Arc::new(VoteLedger::new(
                votes,
                guard.clone(),
                AddressRestriction::from_config(&config.voting),
            )),
            comments: Arc::new(CommentService::new(
                comments,
                guard.clone(),
                config.comments.clone(),
            )),
            adapters: vec![adapter],
        };

        Ok(TestHarness {
            config,
            state,
            guard,
            backend,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment over temp storage.
pub struct TestHarness {
    /// Effective configuration.
    pub config: IdeaLabConfig,
    /// Handler state shared with the router.
    pub state: AppState,
    /// Abuse guard, exposed for sweeping and map inspection.
    pub guard: Arc<AbuseGuard>,
    /// Backing store.
    pub backend: Backend,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The HTTP router over this harness's state.
    pub fn router(&self) -> Router {
        idealab_gateway::router(self.state.clone())
    }

    /// Insert an idea and return its id.
    pub async fn seed_idea(&self, title: &str) -> Result<IdeaId, IdeaLabError> {
        match &self.backend {
            Backend::Sqlite(s) => queries::ideas::insert_idea(s.database()?, title, "", None).await,
            Backend::Memory(m) => Ok(m.add_idea().await),
        }
    }

    /// Insert an active user and return it as a principal.
    pub async fn seed_user(&self, username: &str, email: &str) -> Result<Principal, IdeaLabError> {
        let user_id = match &self.backend {
            Backend::Sqlite(s) => {
                queries::users::insert_user(s.database()?, username, email, "user").await?
            }
            Backend::Memory(m) => m.add_user(username, email, "user").await,
        };
        Ok(Principal {
            user_id,
            email: email.to_string(),
            username: username.to_string(),
            role: "user".to_string(),
        })
    }

    pub async fn deactivate_user(&self, user_id: UserId) -> Result<(), IdeaLabError> {
        match &self.backend {
            Backend::Sqlite(s) => {
                queries::users::set_user_active(s.database()?, user_id, false).await
            }
            Backend::Memory(m) => {
                m.set_user_active(user_id, false).await;
                Ok(())
            }
        }
    }

    /// Denormalized counters for an idea.
    pub async fn idea_counters(&self, idea_id: IdeaId) -> Result<Option<IdeaCounters>, IdeaLabError> {
        match &self.backend {
            Backend::Sqlite(s) => queries::ideas::idea_counters(s.database()?, idea_id).await,
            Backend::Memory(m) => Ok(m.idea_counters(idea_id).await),
        }
    }

    /// A bearer token for `principal`, valid for one hour.
    pub fn token_for(&self, principal: &Principal) -> Result<String, IdeaLabError> {
        let secret = self
            .config
            .auth
            .jwt_secret
            .as_deref()
            .ok_or_else(|| IdeaLabError::Config("no jwt secret configured".into()))?;
        sign_token(secret, principal, Duration::from_secs(3600))
    }
}
