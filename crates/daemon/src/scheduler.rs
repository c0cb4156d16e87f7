// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-shot timer bookkeeping for the event loop.
//!
//! Timers are re-armed from the completion of the previous probe, never
//! from its start, so slow probes delay the next cycle instead of piling
//! up behind it.

use lvsd_core::TimerId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Armed timers, keyed by identity. Setting an already-armed timer replaces
/// its deadline.
#[derive(Debug, Default)]
pub struct Scheduler {
    armed: HashMap<TimerId, Instant>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a single-shot timer `duration` from `now`.
    pub fn set_timer(&mut self, id: TimerId, duration: Duration, now: Instant) {
        self.armed.insert(id, now + duration);
    }

    /// Discard a timer if armed.
    pub fn cancel_timer(&mut self, id: &TimerId) {
        self.armed.remove(id);
    }

    /// Discard every armed timer (shutdown and hot-reload teardown).
    pub fn clear(&mut self) {
        self.armed.clear();
    }

    /// Remove and return all timers due at `now`, in deadline order.
    pub fn fired_timers(&mut self, now: Instant) -> Vec<TimerId> {
        let mut due: Vec<(TimerId, Instant)> = Vec::new();
        self.armed.retain(|id, fires_at| {
            if *fires_at <= now {
                due.push((*id, *fires_at));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|&(id, fires_at)| (fires_at, id.to_string()));
        due.into_iter().map(|(id, _)| id).collect()
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.armed.values().min().copied()
    }

    pub fn has_timers(&self) -> bool {
        !self.armed.is_empty()
    }

    pub fn is_armed(&self, id: &TimerId) -> bool {
        self.armed.contains_key(id)
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
