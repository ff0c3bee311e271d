// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-address action counters over a reset-on-expiry window.
//!
//! This is a coarse fixed window, not a sliding log: a burst just before
//! expiry followed by a burst just after can briefly exceed the ceiling.

use std::net::IpAddr;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use idealab_core::ActionClass;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Concurrent map of rate windows keyed by address and action class.
#[derive(Debug)]
pub struct RateWindows {
    window: Duration,
    entries: DashMap<(IpAddr, ActionClass), Window>,
}

impl RateWindows {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: DashMap::new(),
        }
    }

    /// Count one action and return the post-increment count.
    ///
    /// The shard lock is held across the read-modify-write so concurrent
    /// hits never lose an increment.
    pub fn hit_at(&self, addr: IpAddr, class: ActionClass, now: Instant) -> u32 {
        let mut entry = self.entries.entry((addr, class)).or_insert(Window {
            count: 0,
            started: now,
        });
        if now.saturating_duration_since(entry.started) > self.window {
            entry.count = 1;
            entry.started = now;
        } else {
            entry.count = entry.count.saturating_add(1);
        }
        entry.count
    }

    /// Drop windows that started longer ago than the window length.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, w| now.saturating_duration_since(w.started) <= self.window);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
