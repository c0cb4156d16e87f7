// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer identities for the scheduler.

use crate::real::RealAddr;
use crate::service::ServiceAddr;
use std::fmt;

/// Identifies one armed timer.
///
/// There is at most one `Check` timer per (virtual, real) pair: the next
/// probe is armed only after the previous one completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// A probe of `real` behind `service` is due.
    Check { service: ServiceAddr, real: RealAddr },
    /// Periodic configuration-file modification check (autoreload).
    ConfigWatch,
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerId::Check { service, real } => write!(f, "check:{}:{}", service, real),
            TimerId::ConfigWatch => f.write_str("config-watch"),
        }
    }
}
