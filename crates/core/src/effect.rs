// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Side effects requested by the event handlers and performed by the
//! daemon's executor.

use crate::real::RealServer;
use crate::service::VirtualService;
use crate::settings::GlobalSettings;
use crate::table::TableOp;
use crate::timer::TimerId;
use std::fmt;
use std::time::Duration;

/// Effects that need to be executed by the runtime.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Arm a single-shot timer.
    SetTimer { id: TimerId, duration: Duration },

    /// Discard an armed timer.
    CancelTimer { id: TimerId },

    /// Launch a probe of one real server. Carries read-only snapshots of the
    /// model so the probe task never touches live state.
    RunCheck { virtual_service: Box<VirtualService>, real: RealServer, settings: GlobalSettings },

    /// Apply a routine table operation through the external tool, detached;
    /// a non-zero exit is logged and not retried.
    Reconcile { op: TableOp },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::SetTimer { .. } => "set-timer",
            Effect::CancelTimer { .. } => "cancel-timer",
            Effect::RunCheck { .. } => "run-check",
            Effect::Reconcile { .. } => "reconcile",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::SetTimer { id, duration } => {
                write!(f, "set-timer {} {}s", id, duration.as_secs())
            }
            Effect::CancelTimer { id } => write!(f, "cancel-timer {}", id),
            Effect::RunCheck { virtual_service, real, .. } => {
                write!(f, "run-check {} {}", virtual_service.addr, real.addr)
            }
            Effect::Reconcile { op } => write!(f, "reconcile {}", op),
        }
    }
}
