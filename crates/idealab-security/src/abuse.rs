// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Abuse guard: deny-list, rate ceiling, then behavior heuristic.
//!
//! The first failing check short-circuits. Authenticated callers skip all
//! three checks. A session minted for the current request is not yet known
//! to the caller, so its behavior is tracked per address instead.

use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use idealab_config::model::{Environment, GuardConfig};
use idealab_core::{ActionClass, DenyReason, IdeaLabError, Identity};

use crate::address::normalize;
use crate::behavior::{BehaviorLimits, BehaviorTracker};
use crate::rate::RateWindows;

#[derive(Debug)]
pub struct AbuseGuard {
    blocked: HashSet<IpAddr>,
    exempt_loopback: bool,
    vote_ceiling: u32,
    comment_ceiling: u32,
    behavior_idle: Duration,
    rate: RateWindows,
    behavior: BehaviorTracker,
}

impl AbuseGuard {
    /// Build a guard from `[guard]` settings.
    ///
    /// Outside production the loopback address is never treated as blocked.
    pub fn from_config(
        config: &GuardConfig,
        environment: Environment,
    ) -> Result<Self, IdeaLabError> {
        let blocked = config
            .blocked_addresses
            .iter()
            .map(|raw| {
                raw.trim()
                    .parse::<IpAddr>()
                    .map(normalize)
                    .map_err(|_| IdeaLabError::Config(format!("invalid blocked address `{raw}`")))
            })
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(Self {
            blocked,
            exempt_loopback: !environment.is_production(),
            vote_ceiling: config.vote_ceiling_per_hour,
            comment_ceiling: config.comment_ceiling_per_hour,
            behavior_idle: Duration::from_secs(config.behavior_idle_secs),
            rate: RateWindows::new(Duration::from_secs(config.rate_window_secs)),
            behavior: BehaviorTracker::new(BehaviorLimits {
                rapid_interval: Duration::from_millis(config.rapid_interval_ms),
                rapid_limit: config.rapid_action_limit,
                lifetime_limit: config.lifetime_action_limit,
            }),
        })
    }

    fn ceiling(&self, class: ActionClass) -> u32 {
        match class {
            ActionClass::Vote => self.vote_ceiling,
            ActionClass::Comment => self.comment_ceiling,
        }
    }

    pub fn is_blocked(&self, addr: IpAddr) -> bool {
        let addr = normalize(addr);
        if self.exempt_loopback && addr.is_loopback() {
            return false;
        }
        self.blocked.contains(&addr)
    }

    pub fn check(&self, identity: &Identity, class: ActionClass) -> Result<(), IdeaLabError> {
        self.check_at(identity, class, Instant::now())
    }

    /// Evaluate `identity` for one action of `class` at `now`.
    ///
    /// Counters are bumped once per call whether or not the call is denied.
    pub fn check_at(
        &self,
        identity: &Identity,
        class: ActionClass,
        now: Instant,
    ) -> Result<(), IdeaLabError> {
        let Identity::Anonymous { session, address } = identity else {
            return Ok(());
        };
        let address = normalize(*address);
        let tracked_session = (!session.is_fresh()).then(|| session.as_str());

        let verdict = if self.is_blocked(address) {
            Err(DenyReason::Blocked)
        } else if self.rate.hit_at(address, class, now) > self.ceiling(class) {
            Err(DenyReason::RateLimited)
        } else if self.behavior.record_at(address, tracked_session, now) {
            Err(DenyReason::SuspiciousBehavior)
        } else {
            Ok(())
        };

        match verdict {
            Ok(()) => {
                debug!(%address, action = %class, session = %session.fingerprint(), "guard passed");
                Ok(())
            }
            Err(reason) => {
                warn!(%address, action = %class, reason = %reason, "request denied");
                Err(IdeaLabError::Denied(reason))
            }
        }
    }

    /// Prune expired rate windows and idle behavior entries.
    pub fn sweep_at(&self, now: Instant) -> (usize, usize) {
        (
            self.rate.sweep_at(now),
            self.behavior.sweep_at(now, self.behavior_idle),
        )
    }

    pub fn sweep(&self) -> (usize, usize) {
        self.sweep_at(Instant::now())
    }

    pub fn rate_windows(&self) -> &RateWindows {
        &self.rate
    }

    pub fn behavior(&self) -> &BehaviorTracker {
        &self.behavior
    }
}
