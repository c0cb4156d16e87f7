// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime for the lvsd event loop.
//!
//! All scheduler bookkeeping, state-machine transitions, and table-driver
//! dispatch happen here, on one logical task. Probe I/O and tool
//! subprocesses are the only concurrent work, and they come back as events.

mod handlers;

use crate::adapters::CheckAdapter;
use crate::driver::TableDriver;
use crate::executor::Executor;
use lvsd_core::{Clock, Event, GlobalSettings, TimerId, VirtualService};
use std::time::{Duration, SystemTime};

/// How often the configuration file's modification time is checked when
/// `autoreload` is on.
pub const CONFIG_CHECK_PERIOD: Duration = Duration::from_secs(10);

/// What the event loop should do after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Tear this instance down and start over from the configuration file.
    Reload,
}

/// Coordinates the scheduler, the outcome state machine, and the table
/// driver for one configuration instance.
pub struct Runtime<D, P, C: Clock> {
    pub(crate) executor: Executor<D, P, C>,
    settings: GlobalSettings,
    virtuals: Vec<VirtualService>,
    /// Last observed mtime of the configuration file (autoreload).
    watch_mtime: Option<SystemTime>,
}

impl<D, P, C> Runtime<D, P, C>
where
    D: TableDriver,
    P: CheckAdapter,
    C: Clock,
{
    pub fn new(
        executor: Executor<D, P, C>,
        settings: GlobalSettings,
        virtuals: Vec<VirtualService>,
    ) -> Self {
        Self { executor, settings, virtuals, watch_mtime: None }
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    pub fn virtuals(&self) -> &[VirtualService] {
        &self.virtuals
    }

    /// Take the model back out for cleanup after the loop has exited.
    pub fn into_virtuals(self) -> Vec<VirtualService> {
        self.virtuals
    }

    /// Queue one immediate probe per (virtual, real) pair and arm the
    /// configuration watchdog. Must run after the initial table reset.
    pub fn initialize(&mut self) {
        for vi in 0..self.virtuals.len() {
            for ri in 0..self.virtuals[vi].reals.len() {
                self.launch_check(vi, ri);
            }
        }

        if self.settings.autoreload {
            self.watch_mtime = config_mtime(&self.settings);
            self.executor.execute(lvsd_core::Effect::SetTimer {
                id: TimerId::ConfigWatch,
                duration: CONFIG_CHECK_PERIOD,
            });
        }
    }

    /// Discard all armed timers. In-flight probe outcomes are dropped with
    /// the event channel when the instance is torn down.
    pub fn shutdown(&mut self) {
        self.executor.clear_timers();
    }

    /// Timers due at the current clock reading.
    pub fn due_timers(&mut self) -> Vec<TimerId> {
        let now = self.executor.clock().now();
        self.executor.fired_timers(now)
    }

    /// Process one event to completion.
    pub fn handle_event(&mut self, event: Event) -> Flow {
        match event {
            Event::TimerFired { id } => self.handle_timer(id),
            Event::CheckCompleted { service, real, outcome } => {
                self.handle_check_completed(service, real, outcome)
            }
        }
    }
}

fn config_mtime(settings: &GlobalSettings) -> Option<SystemTime> {
    std::fs::metadata(&settings.configfile).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
