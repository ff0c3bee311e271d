// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comment path for IdéaLab ideas.
//!
//! Submitted text is validated, screened by the spam heuristic, and gated by
//! the abuse guard before it is stored. Edits and deletes are owner-only.

pub mod service;
pub mod validation;

pub use service::{CommentDraft, CommentService, MAX_PAGE_SIZE};
