// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comment posting, listing, and owner-only edits.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use idealab_config::model::CommentsConfig;
use idealab_core::{
    ActionClass, Comment, CommentId, CommentPage, CommentStore, DenyReason, IdeaId, IdeaLabError,
    Identity, NewComment, VoteOwner,
};
use idealab_security::{AbuseGuard, is_spam};

use crate::validation::{normalize_email, sanitize_author_name, validate_content};

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A comment as submitted by a caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentDraft {
    pub idea_id: IdeaId,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<CommentId>,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
}

pub struct CommentService {
    store: Arc<dyn CommentStore>,
    guard: Arc<AbuseGuard>,
    config: CommentsConfig,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn CommentStore>,
        guard: Arc<AbuseGuard>,
        config: CommentsConfig,
    ) -> Self {
        Self {
            store,
            guard,
            config,
        }
    }

    /// Validate, screen, and store a new comment.
    pub async fn post_comment(
        &self,
        identity: &Identity,
        draft: CommentDraft,
    ) -> Result<Comment, IdeaLabError> {
        let content = validate_content(&draft.content, &self.config)?;

        if is_spam(&content) {
            warn!(
                idea_id = draft.idea_id,
                address = ?identity.address(),
                reason = %DenyReason::Spam,
                "request denied"
            );
            return Err(IdeaLabError::Denied(DenyReason::Spam));
        }

        let (author_name, author_email) = match identity.principal() {
            Some(principal) => (principal.username.clone(), principal.email.clone()),
            None => {
                let email = normalize_email(draft.author_email.as_deref())?;
                (sanitize_author_name(draft.author_name.as_deref()), email)
            }
        };

        self.guard.check(identity, ActionClass::Comment)?;

        if !self.store.idea_exists(draft.idea_id).await? {
            return Err(IdeaLabError::idea_not_found(draft.idea_id));
        }

        if let Some(parent_id) = draft.parent_id {
            match self.store.find_active_comment(parent_id).await? {
                Some(parent) if parent.idea_id == draft.idea_id => {}
                _ => return Err(IdeaLabError::comment_not_found(parent_id)),
            }
        }

        let stored = self
            .store
            .insert_comment(&NewComment {
                idea_id: draft.idea_id,
                parent_id: draft.parent_id,
                content,
                owner: VoteOwner::from(identity),
                address: identity.address(),
                author_name,
                author_email,
            })
            .await?;

        info!(
            comment_id = stored.id,
            idea_id = stored.idea_id,
            reply = stored.parent_id.is_some(),
            authenticated = identity.is_authenticated(),
            "comment posted"
        );
        Ok(stored)
    }

    /// Active top-level comments, newest first.
    ///
    /// `limit` defaults to the configured page size and is capped at
    /// [`MAX_PAGE_SIZE`].
    pub async fn list_comments(
        &self,
        idea_id: IdeaId,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<CommentPage, IdeaLabError> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(self.config.page_size).clamp(1, MAX_PAGE_SIZE);
        self.store.list_top_level(idea_id, page, limit).await
    }

    /// Active replies to an active comment, oldest first.
    pub async fn list_replies(&self, parent_id: CommentId) -> Result<Vec<Comment>, IdeaLabError> {
        if self.store.find_active_comment(parent_id).await?.is_none() {
            return Err(IdeaLabError::comment_not_found(parent_id));
        }
        self.store.list_replies(parent_id).await
    }

    /// Replace the content of an active comment owned by `identity`.
    ///
    /// The new text is validated and spam-checked before ownership is looked
    /// up.
    pub async fn edit_comment(
        &self,
        identity: &Identity,
        id: CommentId,
        content: &str,
    ) -> Result<Comment, IdeaLabError> {
        let content = validate_content(content, &self.config)?;
        if is_spam(&content) {
            warn!(
                comment_id = id,
                address = ?identity.address(),
                reason = %DenyReason::Spam,
                "request denied"
            );
            return Err(IdeaLabError::Denied(DenyReason::Spam));
        }
        self.authorize(identity, id).await?;
        let updated = self.store.update_content(id, &content).await?;
        info!(comment_id = id, "comment edited");
        Ok(updated)
    }

    pub async fn delete_comment(
        &self,
        identity: &Identity,
        id: CommentId,
    ) -> Result<(), IdeaLabError> {
        self.authorize(identity, id).await?;
        self.store.deactivate(id).await?;
        info!(comment_id = id, "comment deleted");
        Ok(())
    }

    async fn authorize(&self, identity: &Identity, id: CommentId) -> Result<(), IdeaLabError> {
        let found = self
            .store
            .find_active_comment(id)
            .await?
            .ok_or_else(|| IdeaLabError::comment_not_found(id))?;
        if !found.is_owned_by(identity) {
            warn!(comment_id = id, reason = %DenyReason::Forbidden, "request denied");
            return Err(IdeaLabError::Denied(DenyReason::Forbidden));
        }
        Ok(())
    }
}
