// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the core store traits.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use idealab_config::model::StorageConfig;
use idealab_core::{
    AdapterType, Comment, CommentId, CommentPage, CommentRef, CommentStore, HealthStatus, IdeaId,
    IdeaLabError, IdeaStore, NewComment, PluginAdapter, Principal, SessionToken, UserDirectory,
    UserId, VoteCategory, VoteOwner, VoteRecord, VoteStore, VoteTally, VoteTransition,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on the first call to
/// [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new store with the given configuration.
    ///
    /// The database connection is not opened until [`SqliteStore::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already-open database.
    pub fn from_database(db: Database) -> Self {
        Self {
            config: StorageConfig {
                database_path: String::new(),
                wal_mode: false,
            },
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Open the database and apply migrations.
    pub async fn initialize(&self) -> Result<(), IdeaLabError> {
        let db = Database::open_with(&self.config).await?;
        self.db
            .set(db)
            .map_err(|_| IdeaLabError::Internal("storage already initialized".into()))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, IdeaLabError> {
        self.db.get().ok_or_else(|| {
            IdeaLabError::Internal("storage not initialized -- call initialize() first".into())
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, IdeaLabError> {
        let db = self.database()?;
        let probe = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await;
        Ok(match probe {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), IdeaLabError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl IdeaStore for SqliteStore {
    async fn idea_exists(&self, idea_id: IdeaId) -> Result<bool, IdeaLabError> {
        queries::ideas::idea_exists(self.database()?, idea_id).await
    }
}

#[async_trait]
impl VoteStore for SqliteStore {
    async fn find_vote(
        &self,
        owner: &VoteOwner,
        idea_id: IdeaId,
        category: VoteCategory,
    ) -> Result<Option<VoteRecord>, IdeaLabError> {
        queries::votes::find_vote(self.database()?, owner, idea_id, category).await
    }

    async fn apply_transition(
        &self,
        owner: &VoteOwner,
        address: Option<IpAddr>,
        idea_id: IdeaId,
        transition: VoteTransition,
    ) -> Result<(), IdeaLabError> {
        queries::votes::apply_transition(self.database()?, owner, address, idea_id, transition)
            .await
    }

    async fn address_has_other_vote(
        &self,
        address: IpAddr,
        idea_id: IdeaId,
        category: VoteCategory,
        excluding: &SessionToken,
        within: Duration,
    ) -> Result<bool, IdeaLabError> {
        queries::votes::address_has_other_vote(
            self.database()?,
            address,
            idea_id,
            category,
            excluding,
            within,
        )
        .await
    }

    async fn tally(&self, idea_id: IdeaId) -> Result<VoteTally, IdeaLabError> {
        queries::votes::tally(self.database()?, idea_id).await
    }
}

#[async_trait]
impl CommentStore for SqliteStore {
    async fn find_active_comment(
        &self,
        id: CommentId,
    ) -> Result<Option<CommentRef>, IdeaLabError> {
        queries::comments::find_active_comment(self.database()?, id).await
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, IdeaLabError> {
        queries::comments::insert_comment(self.database()?, comment).await
    }

    async fn list_top_level(
        &self,
        idea_id: IdeaId,
        page: u32,
        limit: u32,
    ) -> Result<CommentPage, IdeaLabError> {
        queries::comments::list_top_level(self.database()?, idea_id, page, limit).await
    }

    async fn list_replies(&self, parent_id: CommentId) -> Result<Vec<Comment>, IdeaLabError> {
        queries::comments::list_replies(self.database()?, parent_id).await
    }

    async fn update_content(
        &self,
        id: CommentId,
        content: &str,
    ) -> Result<Comment, IdeaLabError> {
        queries::comments::update_content(self.database()?, id, content).await
    }

    async fn deactivate(&self, id: CommentId) -> Result<(), IdeaLabError> {
        queries::comments::deactivate(self.database()?, id).await
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn find_active_user(&self, user_id: UserId) -> Result<Option<Principal>, IdeaLabError> {
        queries::users::find_active_user(self.database()?, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idealab_core::{Ballot, RegularVote};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_store_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.version(), semver::Version::new(0, 1, 0));
        assert_eq!(store.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        store.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        assert!(store.initialize().await.is_err(), "second initialize should fail");
    }

    #[tokio::test]
    async fn health_check_reflects_initialization() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        assert!(store.health_check().await.is_err());
        store.initialize().await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn vote_round_trip_through_trait_objects() {
        let db = Database::open_in_memory().await.unwrap();
        let idea = queries::ideas::insert_idea(&db, "idea", "", None).await.unwrap();
        let user = queries::users::insert_user(&db, "ana", "ana@example.org", "user")
            .await
            .unwrap();
        let store = std::sync::Arc::new(SqliteStore::from_database(db));
        let votes: std::sync::Arc<dyn VoteStore> = store.clone();
        let users: std::sync::Arc<dyn UserDirectory> = store;

        let owner = VoteOwner::User(user);
        assert!(votes.idea_exists(idea).await.unwrap());
        votes
            .apply_transition(
                &owner,
                None,
                idea,
                VoteTransition::Create(Ballot::Regular(RegularVote::Up)),
            )
            .await
            .unwrap();
        assert_eq!(votes.tally(idea).await.unwrap().regular.up, 1);
        assert_eq!(
            users.find_active_user(user).await.unwrap().unwrap().email,
            "ana@example.org"
        );
    }

    #[tokio::test]
    async fn shutdown_runs_checkpoint() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("shutdown.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));
        store.initialize().await.unwrap();
        store.shutdown().await.unwrap();
    }
}
