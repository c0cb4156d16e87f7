// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health probes for lvsd.
//!
//! Every probe implements [`Probe`]: a bounded asynchronous test of a single
//! real server that resolves to success or a [`CheckError`]. Probes get
//! read-only snapshots of the model and impose their own timeouts from the
//! effective check/negotiate timeout settings.
//!
//! The registry replaces the original filesystem plugin scan with
//! compile-time registration; the `service` configuration string keys into
//! it at probe time.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod connect;
mod http;
mod imap;
mod ldap;
mod registry;
mod smtp;
mod sql;
mod ssh;

pub use connect::ConnectProbe;
pub use registry::ProbeRegistry;

use async_trait::async_trait;
use lvsd_core::{GlobalSettings, RealServer, VirtualService};
use thiserror::Error;

/// User agent sent by the HTTP probes.
pub const USER_AGENT: &str = concat!("lvsd/", env!("CARGO_PKG_VERSION"));

/// Why a probe judged a real server unhealthy (or could not run at all).
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unexpected result: got '{got}', expected '{expected}'")]
    Unexpected { got: String, expected: String },

    /// Required probe parameter missing from the configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CheckResult = Result<(), CheckError>;

/// A health probe against a single real server.
///
/// Implementations must not block and must complete within the effective
/// timeout for the virtual service.
#[async_trait]
pub trait Probe: Send + Sync + std::fmt::Debug {
    async fn check(
        &self,
        virtual_service: &VirtualService,
        real: &RealServer,
        settings: &GlobalSettings,
    ) -> CheckResult;
}
