// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Address-scoped restriction for anonymous votes.

use std::time::Duration;

use tracing::warn;

use idealab_config::model::{AnonymousMode, VotingConfig};
use idealab_core::{DenyReason, IdeaId, IdeaLabError, Identity, VoteCategory, VoteStore};

/// Applies the configured [`AnonymousMode`] to new anonymous votes.
#[derive(Debug, Clone, Copy)]
pub struct AddressRestriction {
    mode: AnonymousMode,
    window: Duration,
}

impl AddressRestriction {
    pub fn new(mode: AnonymousMode, window: Duration) -> Self {
        Self { mode, window }
    }

    pub fn from_config(config: &VotingConfig) -> Self {
        Self::new(
            config.anonymous_mode,
            Duration::from_secs(u64::from(config.ip_restriction_hours) * 3600),
        )
    }

    pub fn mode(&self) -> AnonymousMode {
        self.mode
    }

    /// Deny a new anonymous vote when another session already voted on the
    /// same (idea, category) from the caller's address inside the window.
    ///
    /// Only called when the caller holds no record of their own, so an
    /// existing vote can always be switched or retracted.
    pub async fn check(
        &self,
        store: &dyn VoteStore,
        identity: &Identity,
        idea_id: IdeaId,
        category: VoteCategory,
    ) -> Result<(), IdeaLabError> {
        if !self.mode.checks_address() {
            return Ok(());
        }
        let Identity::Anonymous { session, address } = identity else {
            return Ok(());
        };
        if store
            .address_has_other_vote(*address, idea_id, category, session, self.window)
            .await?
        {
            warn!(
                %address,
                idea_id,
                category = %category,
                reason = %DenyReason::AddressAlreadyVoted,
                "request denied"
            );
            return Err(IdeaLabError::Denied(DenyReason::AddressAlreadyVoted));
        }
        Ok(())
    }
}
