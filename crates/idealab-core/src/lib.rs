// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the IdéaLab voting and comment subsystem.
//!
//! This crate provides the error taxonomy, the domain types, and the store
//! traits used throughout the workspace. Storage backends and test doubles
//! implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{IdeaLabError, Result};
pub use types::{
    ActionClass, AdapterType, Ballot, Comment, CommentId, CommentPage, CommentRef, CurrentVotes,
    DenyReason, HealthStatus, IdeaId, Identity, NewComment, Pagination, PaymentTally,
    PaymentVote, Principal, RegularTally, RegularVote, SessionToken, UserId, VoteAction,
    VoteCategory, VoteOutcome, VoteOwner, VoteRecord, VoteTally, VoteTransition,
};

pub use traits::{CommentStore, IdeaStore, PluginAdapter, UserDirectory, VoteStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_store_unavailable_is_retryable() {
        let store = IdeaLabError::store(std::io::Error::other("disk busy"));
        assert!(store.is_retryable());

        let terminal = [
            IdeaLabError::idea_not_found(42),
            IdeaLabError::InvalidInput("bad".into()),
            IdeaLabError::Denied(DenyReason::RateLimited),
            IdeaLabError::ConstraintConflict,
            IdeaLabError::Config("x".into()),
            IdeaLabError::Internal("x".into()),
        ];
        for err in &terminal {
            assert!(!err.is_retryable(), "{err} should not be retryable");
        }
    }

    #[test]
    fn not_found_display_names_entity() {
        assert_eq!(IdeaLabError::idea_not_found(42).to_string(), "idea 42 not found");
        assert_eq!(
            IdeaLabError::comment_not_found(7).to_string(),
            "comment 7 not found"
        );
    }

    #[test]
    fn adapter_type_round_trips_through_strum() {
        use std::str::FromStr;

        for variant in [AdapterType::Storage, AdapterType::Credentials] {
            let parsed = AdapterType::from_str(&variant.to_string()).unwrap();
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn health_status_variants() {
        assert_eq!(HealthStatus::Healthy, HealthStatus::Healthy);
        assert_ne!(HealthStatus::Degraded("slow".into()), HealthStatus::Healthy);
    }

    #[test]
    fn store_traits_are_object_safe() {
        fn _vote(_: &dyn VoteStore) {}
        fn _comment(_: &dyn CommentStore) {}
        fn _users(_: &dyn UserDirectory) {}
        fn _adapter(_: &dyn PluginAdapter) {}
    }
}
