// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for IdéaLab integration tests.
//!
//! Provides an in-memory store and a test harness for fast, deterministic,
//! CI-runnable tests without a server process.
//!
//! # Components
//!
//! - [`MemoryStore`] - Every store trait over in-process maps, with an offline switch
//! - [`TestHarness`] - The full request stack over temp SQLite or a `MemoryStore`

pub mod harness;
pub mod memory_store;

pub use harness::{Backend, TEST_JWT_SECRET, TestHarness, TestHarnessBuilder};
pub use memory_store::MemoryStore;
