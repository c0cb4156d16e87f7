// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effect executor.
//!
//! Every effect is non-blocking on the event loop: timers are bookkeeping,
//! probes and table updates run as detached tasks that report back through
//! the event channel or the log.

use crate::adapters::CheckAdapter;
use crate::driver::TableDriver;
use crate::scheduler::Scheduler;
use lvsd_core::{Clock, Effect, Event, TimerId};
use std::time::Instant;
use tokio::sync::mpsc;

/// Executes effects using the configured driver and check adapter.
pub struct Executor<D, P, C: Clock> {
    driver: D,
    checks: P,
    scheduler: Scheduler,
    clock: C,
    events: mpsc::Sender<Event>,
}

impl<D, P, C> Executor<D, P, C>
where
    D: TableDriver,
    P: CheckAdapter,
    C: Clock,
{
    pub fn new(driver: D, checks: P, clock: C, events: mpsc::Sender<Event>) -> Self {
        Self { driver, checks, scheduler: Scheduler::new(), clock, events }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Execute a single effect.
    pub fn execute(&mut self, effect: Effect) {
        tracing::debug!(effect = %effect, "executing");
        match effect {
            Effect::SetTimer { id, duration } => {
                let now = self.clock.now();
                self.scheduler.set_timer(id, duration, now);
            }
            Effect::CancelTimer { id } => {
                self.scheduler.cancel_timer(&id);
            }
            Effect::RunCheck { virtual_service, real, settings } => {
                self.checks.spawn_check(*virtual_service, real, settings, self.events.clone());
            }
            Effect::Reconcile { op } => {
                self.driver.apply_detached(op);
            }
        }
    }

    /// Remove and return the timers due at `now`.
    pub fn fired_timers(&mut self, now: Instant) -> Vec<TimerId> {
        self.scheduler.fired_timers(now)
    }

    /// Discard all armed timers.
    pub fn clear_timers(&mut self) {
        self.scheduler.clear();
    }

    pub fn has_timers(&self) -> bool {
        self.scheduler.has_timers()
    }

    pub fn is_armed(&self, id: &TimerId) -> bool {
        self.scheduler.is_armed(id)
    }
}
