// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store for deterministic testing.
//!
//! `MemoryStore` implements every store trait over plain maps behind one
//! lock, with the same uniqueness, compare-and-swap, and counter semantics as
//! the SQLite store. It can be switched offline to exercise the retryable
//! failure path.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::Mutex;

use idealab_core::{
    AdapterType, Comment, CommentId, CommentPage, CommentRef, CommentStore, HealthStatus, IdeaId,
    IdeaLabError, IdeaStore, NewComment, Pagination, PluginAdapter, Principal, SessionToken,
    UserDirectory, UserId, VoteCategory, VoteOwner, VoteRecord, VoteStore, VoteTally,
    VoteTransition,
};
use idealab_storage::IdeaCounters;

/// Returned while the store is switched offline.
#[derive(Debug, thiserror::Error)]
#[error("memory store is offline")]
pub struct Offline;

struct StoredVote {
    record: VoteRecord,
    at: DateTime<Utc>,
}

struct StoredComment {
    comment: Comment,
    owner: VoteOwner,
    is_active: bool,
}

#[derive(Default)]
struct State {
    next_id: i64,
    ideas: HashMap<IdeaId, IdeaCounters>,
    users: HashMap<UserId, (Principal, bool)>,
    votes: HashMap<(VoteCategory, IdeaId, VoteOwner), StoredVote>,
    comments: BTreeMap<CommentId, StoredComment>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn replies_count(&self, parent: CommentId) -> i64 {
        self.comments
            .values()
            .filter(|c| c.is_active && c.comment.parent_id == Some(parent))
            .count() as i64
    }

    fn render(&self, stored: &StoredComment) -> Comment {
        Comment {
            replies_count: self.replies_count(stored.comment.id),
            ..stored.comment.clone()
        }
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A store over in-process maps.
pub struct MemoryStore {
    state: Mutex<State>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with a retryable error, or restore it.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), IdeaLabError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(IdeaLabError::store(Offline));
        }
        Ok(())
    }

    /// Add an idea with zeroed counters.
    pub async fn add_idea(&self) -> IdeaId {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.ideas.insert(id, IdeaCounters::default());
        id
    }

    /// Add an active user.
    pub async fn add_user(&self, username: &str, email: &str, role: &str) -> UserId {
        let mut state = self.state.lock().await;
        let user_id = state.next_id();
        let principal = Principal {
            user_id,
            email: email.to_string(),
            username: username.to_string(),
            role: role.to_string(),
        };
        state.users.insert(user_id, (principal, true));
        user_id
    }

    pub async fn set_user_active(&self, user_id: UserId, active: bool) {
        if let Some(user) = self.state.lock().await.users.get_mut(&user_id) {
            user.1 = active;
        }
    }

    /// Denormalized counters for an idea.
    pub async fn idea_counters(&self, idea_id: IdeaId) -> Option<IdeaCounters> {
        self.state.lock().await.ideas.get(&idea_id).copied()
    }

    /// Number of stored votes across both categories.
    pub async fn vote_count(&self) -> usize {
        self.state.lock().await.votes.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, IdeaLabError> {
        if self.offline.load(Ordering::SeqCst) {
            return Ok(HealthStatus::Unhealthy(Offline.to_string()));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), IdeaLabError> {
        Ok(())
    }
}

#[async_trait]
impl IdeaStore for MemoryStore {
    async fn idea_exists(&self, idea_id: IdeaId) -> Result<bool, IdeaLabError> {
        self.check_online()?;
        Ok(self.state.lock().await.ideas.contains_key(&idea_id))
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn find_vote(
        &self,
        owner: &VoteOwner,
        idea_id: IdeaId,
        category: VoteCategory,
    ) -> Result<Option<VoteRecord>, IdeaLabError> {
        self.check_online()?;
        let state = self.state.lock().await;
        Ok(state
            .votes
            .get(&(category, idea_id, owner.clone()))
            .map(|v| v.record.clone()))
    }

    async fn apply_transition(
        &self,
        owner: &VoteOwner,
        address: Option<IpAddr>,
        idea_id: IdeaId,
        transition: VoteTransition,
    ) -> Result<(), IdeaLabError> {
        self.check_online()?;
        let category = transition.category();
        let key = (category, idea_id, owner.clone());
        let now = Utc::now();
        let mut state = self.state.lock().await;

        match transition {
            VoteTransition::Create(ballot) => {
                if state.votes.contains_key(&key) {
                    return Err(IdeaLabError::ConstraintConflict);
                }
                let id = state.next_id();
                let record = VoteRecord {
                    id,
                    idea_id,
                    ballot,
                    owner: owner.clone(),
                    address,
                    created_at: timestamp(now),
                };
                state.votes.insert(key, StoredVote { record, at: now });
            }
            VoteTransition::Replace { from, to } => {
                let stored = state
                    .votes
                    .get_mut(&key)
                    .filter(|v| v.record.ballot == from)
                    .ok_or(IdeaLabError::ConstraintConflict)?;
                stored.record.ballot = to;
                stored.record.address = address.or(stored.record.address);
                stored.record.created_at = timestamp(now);
                stored.at = now;
            }
            VoteTransition::Remove(ballot) => {
                let matches = state
                    .votes
                    .get(&key)
                    .is_some_and(|v| v.record.ballot == ballot);
                if !matches {
                    return Err(IdeaLabError::ConstraintConflict);
                }
                state.votes.remove(&key);
            }
            VoteTransition::Overwrite(ballot) => {
                let stored = state
                    .votes
                    .get_mut(&key)
                    .ok_or(IdeaLabError::ConstraintConflict)?;
                stored.record.ballot = ballot;
                stored.record.address = address.or(stored.record.address);
                stored.record.created_at = timestamp(now);
                stored.at = now;
            }
        }

        let delta = transition.outcome().net_delta();
        if category == VoteCategory::Regular
            && delta != 0
            && let Some(counters) = state.ideas.get_mut(&idea_id)
        {
            counters.votes_count = (counters.votes_count + delta).max(0);
        }
        Ok(())
    }

    async fn address_has_other_vote(
        &self,
        address: IpAddr,
        idea_id: IdeaId,
        category: VoteCategory,
        excluding: &SessionToken,
        within: Duration,
    ) -> Result<bool, IdeaLabError> {
        self.check_online()?;
        let cutoff = chrono::Duration::from_std(within)
            .ok()
            .and_then(|within| Utc::now().checked_sub_signed(within))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let state = self.state.lock().await;
        Ok(state.votes.iter().any(|((cat, idea, owner), vote)| {
            *cat == category
                && *idea == idea_id
                && matches!(owner, VoteOwner::Session(s) if s != excluding)
                && vote.record.address == Some(address)
                && vote.at >= cutoff
        }))
    }

    async fn tally(&self, idea_id: IdeaId) -> Result<VoteTally, IdeaLabError> {
        self.check_online()?;
        let state = self.state.lock().await;
        let mut tally = VoteTally::default();
        for ((_, idea, _), vote) in &state.votes {
            if *idea == idea_id {
                tally.add(vote.record.ballot, 1);
            }
        }
        Ok(tally)
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn find_active_comment(
        &self,
        id: CommentId,
    ) -> Result<Option<CommentRef>, IdeaLabError> {
        self.check_online()?;
        let state = self.state.lock().await;
        Ok(state.comments.get(&id).filter(|c| c.is_active).map(|c| {
            let (user_id, session) = match &c.owner {
                VoteOwner::User(uid) => (Some(*uid), None),
                VoteOwner::Session(token) => (None, Some(token.clone())),
            };
            CommentRef {
                id,
                idea_id: c.comment.idea_id,
                user_id,
                session,
            }
        }))
    }

    async fn insert_comment(&self, draft: &NewComment) -> Result<Comment, IdeaLabError> {
        self.check_online()?;
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let now = timestamp(Utc::now());
        let comment = Comment {
            id,
            idea_id: draft.idea_id,
            parent_id: draft.parent_id,
            content: draft.content.clone(),
            author_name: draft.author_name.clone(),
            is_registered_user: matches!(draft.owner, VoteOwner::User(_)),
            replies_count: 0,
            created_at: now.clone(),
            updated_at: now,
        };
        state.comments.insert(
            id,
            StoredComment {
                comment: comment.clone(),
                owner: draft.owner.clone(),
                is_active: true,
            },
        );
        if let Some(counters) = state.ideas.get_mut(&draft.idea_id) {
            counters.comments_count += 1;
        }
        Ok(comment)
    }

    async fn list_top_level(
        &self,
        idea_id: IdeaId,
        page: u32,
        limit: u32,
    ) -> Result<CommentPage, IdeaLabError> {
        self.check_online()?;
        let page = page.max(1);
        let state = self.state.lock().await;
        let top: Vec<&StoredComment> = state
            .comments
            .values()
            .rev()
            .filter(|c| c.is_active && c.comment.idea_id == idea_id && c.comment.parent_id.is_none())
            .collect();
        let skip = (page as usize - 1).saturating_mul(limit as usize);
        let comments = top
            .iter()
            .skip(skip)
            .take(limit as usize)
            .map(|c| state.render(c))
            .collect();
        Ok(CommentPage {
            comments,
            pagination: Pagination::new(page, limit, top.len() as u64),
        })
    }

    async fn list_replies(&self, parent_id: CommentId) -> Result<Vec<Comment>, IdeaLabError> {
        self.check_online()?;
        let state = self.state.lock().await;
        Ok(state
            .comments
            .values()
            .filter(|c| c.is_active && c.comment.parent_id == Some(parent_id))
            .map(|c| state.render(c))
            .collect())
    }

    async fn update_content(
        &self,
        id: CommentId,
        content: &str,
    ) -> Result<Comment, IdeaLabError> {
        self.check_online()?;
        let mut state = self.state.lock().await;
        let stored = state
            .comments
            .get_mut(&id)
            .filter(|c| c.is_active)
            .ok_or_else(|| IdeaLabError::comment_not_found(id))?;
        stored.comment.content = content.to_string();
        stored.comment.updated_at = timestamp(Utc::now());
        let state = &*state;
        let stored = &state.comments[&id];
        Ok(state.render(stored))
    }

    async fn deactivate(&self, id: CommentId) -> Result<(), IdeaLabError> {
        self.check_online()?;
        let mut state = self.state.lock().await;
        let stored = state
            .comments
            .get_mut(&id)
            .filter(|c| c.is_active)
            .ok_or_else(|| IdeaLabError::comment_not_found(id))?;
        stored.is_active = false;
        let idea_id = stored.comment.idea_id;
        if let Some(counters) = state.ideas.get_mut(&idea_id) {
            counters.comments_count = (counters.comments_count - 1).max(0);
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_active_user(&self, user_id: UserId) -> Result<Option<Principal>, IdeaLabError> {
        self.check_online()?;
        let state = self.state.lock().await;
        Ok(state
            .users
            .get(&user_id)
            .filter(|(_, active)| *active)
            .map(|(principal, _)| principal.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idealab_core::{Ballot, PaymentVote, RegularVote};
    use std::net::Ipv4Addr;

    fn session(s: &str) -> VoteOwner {
        VoteOwner::Session(SessionToken::parse(s).unwrap())
    }

    const UP: Ballot = Ballot::Regular(RegularVote::Up);
    const DOWN: Ballot = Ballot::Regular(RegularVote::Down);

    #[tokio::test]
    async fn create_twice_conflicts() {
        let store = MemoryStore::new();
        let idea = store.add_idea().await;
        let owner = session("abc");
        store
            .apply_transition(&owner, None, idea, VoteTransition::Create(UP))
            .await
            .unwrap();
        let err = store
            .apply_transition(&owner, None, idea, VoteTransition::Create(DOWN))
            .await
            .unwrap_err();
        assert!(matches!(err, IdeaLabError::ConstraintConflict));
        assert_eq!(store.idea_counters(idea).await.unwrap().votes_count, 1);
    }

    #[tokio::test]
    async fn stale_replace_conflicts() {
        let store = MemoryStore::new();
        let idea = store.add_idea().await;
        let owner = session("abc");
        store
            .apply_transition(&owner, None, idea, VoteTransition::Create(UP))
            .await
            .unwrap();
        let err = store
            .apply_transition(
                &owner,
                None,
                idea,
                VoteTransition::Replace { from: DOWN, to: UP },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IdeaLabError::ConstraintConflict));
    }

    #[tokio::test]
    async fn payment_votes_leave_votes_count_alone() {
        let store = MemoryStore::new();
        let idea = store.add_idea().await;
        let owner = session("abc");
        store
            .apply_transition(
                &owner,
                None,
                idea,
                VoteTransition::Create(Ballot::Payment(PaymentVote::WouldPay)),
            )
            .await
            .unwrap();
        assert_eq!(store.idea_counters(idea).await.unwrap().votes_count, 0);
        assert_eq!(store.tally(idea).await.unwrap().payment.would_pay, 1);
    }

    #[tokio::test]
    async fn address_check_ignores_own_session_and_users() {
        let store = MemoryStore::new();
        let idea = store.add_idea().await;
        let addr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));
        let mine = SessionToken::parse("mine").unwrap();
        let window = Duration::from_secs(3600);

        store
            .apply_transition(&VoteOwner::User(7), Some(addr), idea, VoteTransition::Create(UP))
            .await
            .unwrap();
        store
            .apply_transition(
                &VoteOwner::Session(mine.clone()),
                Some(addr),
                idea,
                VoteTransition::Create(UP),
            )
            .await
            .unwrap();
        assert!(
            !store
                .address_has_other_vote(addr, idea, VoteCategory::Regular, &mine, window)
                .await
                .unwrap()
        );

        let other = SessionToken::parse("other").unwrap();
        assert!(
            store
                .address_has_other_vote(addr, idea, VoteCategory::Regular, &other, window)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn comments_count_tracks_insert_and_deactivate() {
        let store = MemoryStore::new();
        let idea = store.add_idea().await;
        let draft = NewComment {
            idea_id: idea,
            parent_id: None,
            content: "hello there".into(),
            owner: session("abc"),
            address: None,
            author_name: "Anonymous".into(),
            author_email: "a@b.co".into(),
        };
        let first = store.insert_comment(&draft).await.unwrap();
        let reply = store
            .insert_comment(&NewComment {
                parent_id: Some(first.id),
                ..draft.clone()
            })
            .await
            .unwrap();
        assert_eq!(store.idea_counters(idea).await.unwrap().comments_count, 2);

        let page = store.list_top_level(idea, 1, 10).await.unwrap();
        assert_eq!(page.comments.len(), 1);
        assert_eq!(page.comments[0].replies_count, 1);

        store.deactivate(reply.id).await.unwrap();
        assert_eq!(store.idea_counters(idea).await.unwrap().comments_count, 1);
        assert!(store.deactivate(reply.id).await.is_err());
        assert!(store.list_replies(first.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_store_is_retryable_and_unhealthy() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let err = store.idea_exists(1).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(
            store.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }
}
