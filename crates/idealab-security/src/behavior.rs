// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Burst detection per (address, session) pair.
//!
//! Callers that presented no session share one entry per address.

use std::net::IpAddr;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Entry {
    last_action: Instant,
    rapid: u32,
    total: u32,
}

/// Limits applied by [`BehaviorTracker::record_at`].
#[derive(Debug, Clone, Copy)]
pub struct BehaviorLimits {
    /// Two actions closer than this count as rapid.
    pub rapid_interval: Duration,
    /// Rapid counter above this is suspicious.
    pub rapid_limit: u32,
    /// Lifetime counter above this is suspicious.
    pub lifetime_limit: u32,
}

#[derive(Debug)]
pub struct BehaviorTracker {
    limits: BehaviorLimits,
    entries: DashMap<(IpAddr, Option<String>), Entry>,
}

impl BehaviorTracker {
    pub fn new(limits: BehaviorLimits) -> Self {
        Self {
            limits,
            entries: DashMap::new(),
        }
    }

    /// Record one action and report whether the pair now looks automated.
    ///
    /// `session` is `None` for a caller without a session cookie. The rapid
    /// counter climbs on each quick action and decays by one, floored at
    /// zero, on each slow one. The first action is never rapid.
    pub fn record_at(&self, addr: IpAddr, session: Option<&str>, now: Instant) -> bool {
        let key = (addr, session.map(str::to_string));
        let limits = self.limits;
        let mut entry = self.entries.entry(key).or_insert(Entry {
            last_action: now,
            rapid: 0,
            total: 0,
        });
        if entry.total > 0 {
            if now.saturating_duration_since(entry.last_action) < limits.rapid_interval {
                entry.rapid = entry.rapid.saturating_add(1);
            } else {
                entry.rapid = entry.rapid.saturating_sub(1);
            }
        }
        entry.total = entry.total.saturating_add(1);
        entry.last_action = now;
        entry.rapid > limits.rapid_limit || entry.total > limits.lifetime_limit
    }

    /// Drop entries idle for longer than `idle`.
    pub fn sweep_at(&self, now: Instant, idle: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.last_action) <= idle);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> BehaviorTracker {
        BehaviorTracker::new(BehaviorLimits {
            rapid_interval: Duration::from_millis(2000),
            rapid_limit: 5,
            lifetime_limit: 100,
        })
    }

    fn addr() -> IpAddr {
        "10.0.0.5".parse().unwrap()
    }

    #[test]
    fn rapid_burst_is_flagged_on_seventh_action() {
        let t = tracker();
        let t0 = Instant::now();
        // First action never counts as rapid; the next five bring rapid to 5.
        for i in 0..6 {
            assert!(!t.record_at(addr(), Some("s"), t0 + Duration::from_millis(100 * i)));
        }
        assert!(t.record_at(addr(), Some("s"), t0 + Duration::from_millis(600)));
    }

    #[test]
    fn slow_actions_decay_rapid_counter() {
        let t = tracker();
        let mut now = Instant::now();
        for _ in 0..5 {
            t.record_at(addr(), Some("s"), now);
            now += Duration::from_millis(10);
        }
        // Rapid is 4. Two slow actions bring it to 2.
        now += Duration::from_secs(3);
        t.record_at(addr(), Some("s"), now);
        now += Duration::from_secs(3);
        t.record_at(addr(), Some("s"), now);
        // Three more quick ones reach 5, still allowed.
        for _ in 0..3 {
            now += Duration::from_millis(10);
            assert!(!t.record_at(addr(), Some("s"), now));
        }
        now += Duration::from_millis(10);
        assert!(t.record_at(addr(), Some("s"), now));
    }

    #[test]
    fn lifetime_limit_trips_after_one_hundred() {
        let t = tracker();
        let mut now = Instant::now();
        for _ in 0..100 {
            assert!(!t.record_at(addr(), Some("s"), now));
            now += Duration::from_secs(5);
        }
        assert!(t.record_at(addr(), Some("s"), now));
    }

    #[test]
    fn sessions_are_tracked_separately() {
        let t = tracker();
        let t0 = Instant::now();
        for _ in 0..7 {
            t.record_at(addr(), Some("a"), t0);
        }
        assert!(!t.record_at(addr(), Some("b"), t0));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn cookieless_callers_share_one_entry_per_address() {
        let t = tracker();
        let t0 = Instant::now();
        for i in 0..6 {
            assert!(!t.record_at(addr(), None, t0 + Duration::from_millis(100 * i)));
        }
        assert!(t.record_at(addr(), None, t0 + Duration::from_millis(600)));
        assert!(!t.record_at("10.0.0.6".parse().unwrap(), None, t0));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn sweep_drops_idle_pairs() {
        let t = tracker();
        let t0 = Instant::now();
        let day = Duration::from_secs(86_400);
        t.record_at(addr(), Some("old"), t0);
        t.record_at(addr(), Some("fresh"), t0 + day);
        assert_eq!(t.sweep_at(t0 + day + Duration::from_secs(1), day), 1);
        assert_eq!(t.len(), 1);
    }
}
