// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lvsd daemon library.
//!
//! Owns the single-threaded event loop that schedules probes, feeds their
//! outcomes through the state machine, and reconciles the kernel IPVS table
//! through the external `ipvsadm` tool.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod driver;
pub mod env;
pub mod executor;
pub mod lifecycle;
pub mod pidfile;
pub mod runtime;
pub mod scheduler;

pub use adapters::{CheckAdapter, ProbeCheckAdapter};
pub use driver::{DriverError, IpvsDriver, TableDriver};
pub use executor::Executor;
pub use lifecycle::{cleanup, initial_reset, StartupError};
pub use runtime::{Flow, Runtime};

#[cfg(any(test, feature = "test-support"))]
pub use adapters::FakeCheckAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use driver::{FakeDriver, Invocation};
