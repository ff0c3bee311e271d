// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vote ledger: one record per (identity, idea, category) with
//! toggle-on-repeat semantics.
//!
//! Casting a value the caller does not hold creates or switches their
//! record; casting the value they already hold removes it. Writes are
//! compare-and-swap against the value read, so concurrent casts from the
//! same identity never leave two rows or a lost switch.

use std::sync::Arc;

use tracing::{debug, info};

use idealab_core::{
    ActionClass, Ballot, CurrentVotes, IdeaId, IdeaLabError, Identity, VoteAction, VoteCategory,
    VoteOutcome, VoteOwner, VoteStore, VoteTally, VoteTransition,
};
use idealab_security::AbuseGuard;

use crate::restrictions::AddressRestriction;

/// Read-decide-write rounds before giving up under contention.
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, thiserror::Error)]
#[error("vote on idea {idea_id} kept changing across {attempts} attempts")]
struct Contention {
    idea_id: IdeaId,
    attempts: u32,
}

/// Pick the write that takes the caller from `existing` to `requested`.
pub fn decide(existing: Option<Ballot>, requested: Ballot) -> VoteTransition {
    match existing {
        None => VoteTransition::Create(requested),
        Some(held) if held == requested => VoteTransition::Remove(held),
        Some(held) => VoteTransition::Replace {
            from: held,
            to: requested,
        },
    }
}

pub struct VoteLedger {
    store: Arc<dyn VoteStore>,
    guard: Arc<AbuseGuard>,
    restriction: AddressRestriction,
}

impl VoteLedger {
    pub fn new(
        store: Arc<dyn VoteStore>,
        guard: Arc<AbuseGuard>,
        restriction: AddressRestriction,
    ) -> Self {
        Self {
            store,
            guard,
            restriction,
        }
    }

    /// Cast `ballot` on `idea_id` for `identity`.
    ///
    /// Anonymous callers pass through the abuse guard first. A missing idea
    /// is `NotFound`; persistent contention surfaces as a retryable
    /// `StoreUnavailable`.
    pub async fn cast_vote(
        &self,
        identity: &Identity,
        idea_id: IdeaId,
        ballot: Ballot,
    ) -> Result<VoteOutcome, IdeaLabError> {
        self.guard.check(identity, ActionClass::Vote)?;

        if !self.store.idea_exists(idea_id).await? {
            return Err(IdeaLabError::idea_not_found(idea_id));
        }

        let owner = VoteOwner::from(identity);
        let address = identity.address();
        let category = ballot.category();

        for attempt in 1..=MAX_ATTEMPTS {
            let existing = self
                .store
                .find_vote(&owner, idea_id, category)
                .await?
                .map(|record| record.ballot);
            if existing.is_none() {
                self.restriction
                    .check(self.store.as_ref(), identity, idea_id, category)
                    .await?;
            }

            let transition = decide(existing, ballot);
            match self
                .store
                .apply_transition(&owner, address, idea_id, transition)
                .await
            {
                Ok(()) => {
                    let outcome = transition.outcome();
                    info!(
                        idea_id,
                        category = %category,
                        action = %outcome.action,
                        authenticated = identity.is_authenticated(),
                        "vote recorded"
                    );
                    return Ok(outcome);
                }
                Err(IdeaLabError::ConstraintConflict) => {
                    if let VoteTransition::Create(value) = transition {
                        // A concurrent cast from the same identity inserted first.
                        let overwrite = VoteTransition::Overwrite(value);
                        match self
                            .store
                            .apply_transition(&owner, address, idea_id, overwrite)
                            .await
                        {
                            Ok(()) => {
                                debug!(idea_id, attempt, "create lost the race, overwrote winner");
                                return Ok(VoteOutcome {
                                    action: VoteAction::Updated,
                                    value: Some(value),
                                });
                            }
                            Err(IdeaLabError::ConstraintConflict) => {}
                            Err(e) => return Err(e),
                        }
                    }
                    debug!(idea_id, attempt, "vote changed underneath, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(IdeaLabError::store(Contention {
            idea_id,
            attempts: MAX_ATTEMPTS,
        }))
    }

    /// Zero-filled counts for an existing idea.
    pub async fn tally(&self, idea_id: IdeaId) -> Result<VoteTally, IdeaLabError> {
        if !self.store.idea_exists(idea_id).await? {
            return Err(IdeaLabError::idea_not_found(idea_id));
        }
        self.store.tally(idea_id).await
    }

    /// The caller's current values on `idea_id`.
    ///
    /// `None` is an anonymous caller without a session, who holds no votes.
    pub async fn current_votes(
        &self,
        identity: Option<&Identity>,
        idea_id: IdeaId,
    ) -> Result<CurrentVotes, IdeaLabError> {
        let Some(identity) = identity else {
            return Ok(CurrentVotes::default());
        };
        let owner = VoteOwner::from(identity);
        let mut current = CurrentVotes::default();
        for category in VoteCategory::ALL {
            if let Some(record) = self.store.find_vote(&owner, idea_id, category).await? {
                match record.ballot {
                    Ballot::Regular(v) => current.regular_vote = Some(v),
                    Ballot::Payment(v) => current.payment_vote = Some(v),
                }
            }
        }
        Ok(current)
    }
}
