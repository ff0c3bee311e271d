// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the identity, guard, ledger, and comment crates.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::IdeaLabError;

/// Primary key of a registered user.
pub type UserId = i64;

/// Primary key of an idea (the subject being voted or commented on).
pub type IdeaId = i64;

/// Primary key of a comment.
pub type CommentId = i64;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Credentials,
}

// --- Identity ---

/// Opaque anonymous session token carried in the session cookie.
///
/// Freshly minted tokens are 64 lowercase hex characters. Tokens read back
/// from a cookie are accepted as long as they are non-empty printable ASCII.
///
/// Equality and hashing look at the token value only.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken {
    value: String,
    #[serde(skip)]
    fresh: bool,
}

impl SessionToken {
    /// Longest cookie value accepted as a session token.
    pub const MAX_LEN: usize = 128;

    /// Validate a token read from a cookie.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > Self::MAX_LEN {
            return None;
        }
        if !raw.chars().all(|c| c.is_ascii_graphic()) {
            return None;
        }
        Some(Self {
            value: raw.to_string(),
            fresh: false,
        })
    }

    /// Wrap a token produced by the session minting routine.
    pub fn from_minted(hex: String) -> Self {
        Self {
            value: hex,
            fresh: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// True when the token was minted for the current request rather than
    /// presented by the caller.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Short prefix safe to put in log lines.
    pub fn fingerprint(&self) -> &str {
        let end = self.value.len().min(8);
        &self.value[..end]
    }
}

impl PartialEq for SessionToken {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for SessionToken {}

impl std::hash::Hash for SessionToken {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({}…)", self.fingerprint())
    }
}

/// A verified, active registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub username: String,
    pub role: String,
}

/// The resolved caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A registered user with a valid bearer credential.
    Authenticated(Principal),
    /// A visitor identified by session cookie and network address.
    Anonymous {
        session: SessionToken,
        address: IpAddr,
    },
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Authenticated(principal) => Some(principal.user_id),
            Self::Anonymous { .. } => None,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(principal) => Some(principal),
            Self::Anonymous { .. } => None,
        }
    }

    pub fn session(&self) -> Option<&SessionToken> {
        match self {
            Self::Authenticated(_) => None,
            Self::Anonymous { session, .. } => Some(session),
        }
    }

    /// Network address recorded for anonymous identities.
    pub fn address(&self) -> Option<IpAddr> {
        match self {
            Self::Authenticated(_) => None,
            Self::Anonymous { address, .. } => Some(*address),
        }
    }
}

/// Owner of a persisted row, as translated at the persistence boundary.
///
/// Maps onto the nullable `user_id` / `session_id` column pair: exactly one
/// of the two is set, and session-owned rows always have `user_id IS NULL`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VoteOwner {
    User(UserId),
    Session(SessionToken),
}

impl From<&Identity> for VoteOwner {
    fn from(identity: &Identity) -> Self {
        match identity {
            Identity::Authenticated(principal) => Self::User(principal.user_id),
            Identity::Anonymous { session, .. } => Self::Session(session.clone()),
        }
    }
}

// --- Votes ---

/// The axis being voted on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VoteCategory {
    /// Up/down sentiment.
    Regular,
    /// Willingness to pay.
    Payment,
}

impl VoteCategory {
    pub const ALL: [VoteCategory; 2] = [VoteCategory::Regular, VoteCategory::Payment];

    /// Wire values accepted for this category.
    pub fn allowed_values(&self) -> &'static [&'static str] {
        match self {
            Self::Regular => &["up", "down"],
            Self::Payment => &["would_pay", "would_not_pay"],
        }
    }
}

/// Value of a `regular` vote.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegularVote {
    Up,
    Down,
}

/// Value of a `payment` vote.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentVote {
    WouldPay,
    WouldNotPay,
}

/// A vote value tied to its category, so a `payment` vote can never carry `up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Ballot {
    Regular(RegularVote),
    Payment(PaymentVote),
}

impl Ballot {
    pub fn category(&self) -> VoteCategory {
        match self {
            Self::Regular(_) => VoteCategory::Regular,
            Self::Payment(_) => VoteCategory::Payment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular(v) => v.into(),
            Self::Payment(v) => v.into(),
        }
    }

    /// Parse a wire value within a category.
    pub fn parse(category: VoteCategory, raw: &str) -> Result<Self, IdeaLabError> {
        let parsed = match category {
            VoteCategory::Regular => raw.parse::<RegularVote>().ok().map(Self::Regular),
            VoteCategory::Payment => raw.parse::<PaymentVote>().ok().map(Self::Payment),
        };
        parsed.ok_or_else(|| {
            IdeaLabError::InvalidInput(format!(
                "invalid vote type `{raw}` for {category} votes, expected one of: {}",
                category.allowed_values().join(", ")
            ))
        })
    }
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a cast did to the caller's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VoteAction {
    Created,
    Updated,
    Removed,
}

/// Result of casting a vote: the action taken and the value now held
/// (`None` after a toggle-off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub action: VoteAction,
    pub value: Option<Ballot>,
}

impl VoteOutcome {
    /// Change in the number of stored votes caused by this outcome.
    pub fn net_delta(&self) -> i64 {
        match self.action {
            VoteAction::Created => 1,
            VoteAction::Updated => 0,
            VoteAction::Removed => -1,
        }
    }
}

/// A write the ledger asks the store to perform atomically.
///
/// `Replace` and `Remove` are compare-and-swap: the store applies them only
/// if the current value still equals `from`, otherwise it reports
/// [`IdeaLabError::ConstraintConflict`]. `Create` reports the same error when
/// the uniqueness constraint rejects the insert. `Overwrite` sets the value
/// unconditionally on an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    Create(Ballot),
    Replace { from: Ballot, to: Ballot },
    Remove(Ballot),
    Overwrite(Ballot),
}

impl VoteTransition {
    pub fn category(&self) -> VoteCategory {
        match self {
            Self::Create(b) | Self::Remove(b) | Self::Overwrite(b) => b.category(),
            Self::Replace { to, .. } => to.category(),
        }
    }

    pub fn outcome(&self) -> VoteOutcome {
        match *self {
            Self::Create(b) => VoteOutcome {
                action: VoteAction::Created,
                value: Some(b),
            },
            Self::Replace { to, .. } | Self::Overwrite(to) => VoteOutcome {
                action: VoteAction::Updated,
                value: Some(to),
            },
            Self::Remove(_) => VoteOutcome {
                action: VoteAction::Removed,
                value: None,
            },
        }
    }
}

/// A persisted vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    pub id: i64,
    pub idea_id: IdeaId,
    pub ballot: Ballot,
    pub owner: VoteOwner,
    pub address: Option<IpAddr>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularTally {
    pub up: u64,
    pub down: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTally {
    pub would_pay: u64,
    pub would_not_pay: u64,
}

/// Vote counts for one idea, zero-filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub regular: RegularTally,
    pub payment: PaymentTally,
}

impl VoteTally {
    /// Add `count` votes of the given value.
    pub fn add(&mut self, ballot: Ballot, count: u64) {
        match ballot {
            Ballot::Regular(RegularVote::Up) => self.regular.up += count,
            Ballot::Regular(RegularVote::Down) => self.regular.down += count,
            Ballot::Payment(PaymentVote::WouldPay) => self.payment.would_pay += count,
            Ballot::Payment(PaymentVote::WouldNotPay) => self.payment.would_not_pay += count,
        }
    }
}

/// The caller's own votes on one idea.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CurrentVotes {
    pub regular_vote: Option<RegularVote>,
    pub payment_vote: Option<PaymentVote>,
}

// --- Guards ---

/// Class of action gated by the abuse guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ActionClass {
    Vote,
    Comment,
}

/// Why a request was denied.
///
/// The `Display` form is a stable machine code; [`DenyReason::message`] is
/// the user-facing text. Neither reveals counters or thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DenyReason {
    /// Address is on the deny-list.
    Blocked,
    /// Too many actions from this address in the current window.
    RateLimited,
    /// Burst or volume heuristic tripped for this address and session.
    SuspiciousBehavior,
    /// Another anonymous session already voted from this address.
    AddressAlreadyVoted,
    /// Submitted text looks like spam.
    Spam,
    /// The caller does not own the resource.
    Forbidden,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        self.into()
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Blocked => "Requests from this address are blocked.",
            Self::RateLimited => "Too many requests. Please try again later.",
            Self::SuspiciousBehavior => "Suspicious activity detected. Please slow down.",
            Self::AddressAlreadyVoted => "A vote from this address has already been recorded.",
            Self::Spam => "This content looks like spam.",
            Self::Forbidden => "You can only modify your own content.",
        }
    }
}

// --- Comments ---

/// A comment as returned to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub idea_id: IdeaId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub author_name: String,
    pub is_registered_user: bool,
    pub replies_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A validated comment ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub idea_id: IdeaId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub owner: VoteOwner,
    pub address: Option<IpAddr>,
    pub author_name: String,
    pub author_email: String,
}

/// Location and ownership columns of a stored, active comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRef {
    pub id: CommentId,
    pub idea_id: IdeaId,
    pub user_id: Option<UserId>,
    pub session: Option<SessionToken>,
}

impl CommentRef {
    /// Whether `identity` may edit or delete the comment.
    ///
    /// Anonymous callers match only comments that have no user id.
    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        match identity {
            Identity::Authenticated(principal) => self.user_id == Some(principal.user_id),
            Identity::Anonymous { session, .. } => {
                self.user_id.is_none() && self.session.as_ref() == Some(session)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub pagination: Pagination,
}
