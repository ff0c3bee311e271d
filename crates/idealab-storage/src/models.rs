// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types that only the storage layer and its callers in tests need.
//!
//! Types crossing trait boundaries live in `idealab-core::types`.

use serde::Serialize;

/// Denormalized counters on an idea row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IdeaCounters {
    pub votes_count: i64,
    pub comments_count: i64,
    pub views_count: i64,
    pub shares_count: i64,
}
