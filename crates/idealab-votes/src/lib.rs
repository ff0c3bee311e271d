// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vote ledger for IdéaLab ideas.
//!
//! One record per (identity, idea, category). Repeating a value retracts it,
//! a different value switches it. Anonymous votes can additionally be
//! restricted per network address.

pub mod ledger;
pub mod restrictions;

pub use ledger::{VoteLedger, decide};
pub use restrictions::AddressRestriction;
