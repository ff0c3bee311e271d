// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence seams consumed by the vote ledger, the comment path, and the
//! credential verifier.
//!
//! Implementations translate [`VoteOwner`] to the nullable `user_id` /
//! `session_id` column pair at the persistence boundary. Lookups for
//! session-owned rows must filter on `user_id IS NULL` so an anonymous
//! session can never match a registered user's row.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::IdeaLabError;
use crate::types::{
    Comment, CommentId, CommentPage, CommentRef, IdeaId, NewComment, Principal, SessionToken,
    UserId, VoteCategory, VoteOwner, VoteRecord, VoteTally, VoteTransition,
};

/// Subject existence checks.
#[async_trait]
pub trait IdeaStore: Send + Sync {
    async fn idea_exists(&self, idea_id: IdeaId) -> Result<bool, IdeaLabError>;
}

/// The vote ledger's backing store.
#[async_trait]
pub trait VoteStore: IdeaStore {
    /// Fetch the owner's record for (idea, category), if any.
    async fn find_vote(
        &self,
        owner: &VoteOwner,
        idea_id: IdeaId,
        category: VoteCategory,
    ) -> Result<Option<VoteRecord>, IdeaLabError>;

    /// Apply `transition` atomically.
    ///
    /// Returns [`IdeaLabError::ConstraintConflict`] when a `Create` hits the
    /// uniqueness constraint, when a `Replace` or `Remove` finds the stored
    /// value no longer equal to `from`, or when an `Overwrite` finds no row.
    /// Regular-category transitions also adjust the idea's `votes_count` by
    /// the outcome's net delta inside the same transaction.
    async fn apply_transition(
        &self,
        owner: &VoteOwner,
        address: Option<IpAddr>,
        idea_id: IdeaId,
        transition: VoteTransition,
    ) -> Result<(), IdeaLabError>;

    /// Whether an anonymous session other than `excluding` voted on
    /// (idea, category) from `address` within the last `within`.
    async fn address_has_other_vote(
        &self,
        address: IpAddr,
        idea_id: IdeaId,
        category: VoteCategory,
        excluding: &SessionToken,
        within: Duration,
    ) -> Result<bool, IdeaLabError>;

    /// Zero-filled counts per value for both categories.
    async fn tally(&self, idea_id: IdeaId) -> Result<VoteTally, IdeaLabError>;
}

/// The comment path's backing store.
#[async_trait]
pub trait CommentStore: IdeaStore {
    /// Active comment by id.
    async fn find_active_comment(
        &self,
        id: CommentId,
    ) -> Result<Option<CommentRef>, IdeaLabError>;

    /// Insert and bump the idea's `comments_count` in one transaction.
    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, IdeaLabError>;

    /// Active top-level comments, newest first.
    async fn list_top_level(
        &self,
        idea_id: IdeaId,
        page: u32,
        limit: u32,
    ) -> Result<CommentPage, IdeaLabError>;

    /// Active replies, oldest first.
    async fn list_replies(&self, parent_id: CommentId) -> Result<Vec<Comment>, IdeaLabError>;

    async fn update_content(
        &self,
        id: CommentId,
        content: &str,
    ) -> Result<Comment, IdeaLabError>;

    /// Soft delete and decrement the idea's `comments_count`.
    async fn deactivate(&self, id: CommentId) -> Result<(), IdeaLabError>;
}

/// Registered user lookups for credential revocation checks.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// The user if it exists and is active.
    async fn find_active_user(&self, user_id: UserId) -> Result<Option<Principal>, IdeaLabError>;
}
