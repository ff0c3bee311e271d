// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the core and its adapters.
//!
//! Async traits use `#[async_trait]` so they can be held as trait objects.

pub mod adapter;
pub mod store;

pub use adapter::PluginAdapter;
pub use store::{CommentStore, IdeaStore, UserDirectory, VoteStore};
