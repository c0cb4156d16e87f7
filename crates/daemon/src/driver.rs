// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Table driver: invokes the external `ipvsadm` tool.
//!
//! The driver is the single writer to the kernel table. Synchronous
//! application (`apply`) is used during the initial reset and cleanup where
//! ordering against the next call matters; detached application
//! (`apply_detached`) is used for routine post-probe edits, whose failures
//! are logged and left for the next probe cycle to converge.

use async_trait::async_trait;
use lvsd_core::{TableError, TableOp};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Safety net for a wedged external tool.
const TOOL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("{op}: failed to run tool: {source}")]
    Io {
        op: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{op}: tool exited with status {code}")]
    NonZero { op: String, code: i32 },

    #[error("{op}: tool timed out after {}s", TOOL_TIMEOUT.as_secs())]
    Timeout { op: String },
}

/// Applies table operations. The production implementation shells out to
/// `ipvsadm`; tests substitute a recording fake.
#[async_trait]
pub trait TableDriver: Clone + Send + Sync + 'static {
    /// Run the operation and wait for its exit status.
    async fn apply(&self, op: &TableOp) -> Result<(), DriverError>;

    /// Launch the operation without waiting. The exit status is observed
    /// and logged by a background task.
    fn apply_detached(&self, op: TableOp);
}

/// Production driver shelling out to the `ipvsadm` binary.
#[derive(Debug, Clone)]
pub struct IpvsDriver {
    tool: PathBuf,
}

impl IpvsDriver {
    pub fn new(tool: PathBuf) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl TableDriver for IpvsDriver {
    async fn apply(&self, op: &TableOp) -> Result<(), DriverError> {
        let args = op.argv()?;
        tracing::debug!(tool = %self.tool.display(), args = %args.join(" "), "running table update");

        let mut cmd = Command::new(&self.tool);
        cmd.args(&args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = match tokio::time::timeout(TOOL_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(DriverError::Io { op: op.to_string(), source }),
            Err(_) => return Err(DriverError::Timeout { op: op.to_string() }),
        };

        if !output.stdout.is_empty() {
            tracing::warn!(op = %op, "tool output: {}", String::from_utf8_lossy(&output.stdout).trim_end());
        }
        if !output.stderr.is_empty() {
            tracing::error!(op = %op, "tool error output: {}", String::from_utf8_lossy(&output.stderr).trim_end());
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(DriverError::NonZero { op: op.to_string(), code: output.status.code().unwrap_or(-1) })
        }
    }

    fn apply_detached(&self, op: TableOp) {
        let driver = self.clone();
        tokio::spawn(async move {
            if let Err(e) = driver.apply(&op).await {
                tracing::error!(error = %e, "table update failed");
            }
        });
    }
}

/// How a fake-driver call was made.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    Sync,
    Detached,
}

/// Recording driver for tests. Optionally fails operations matching a
/// predicate, to exercise the fatal-startup and tolerated-failure paths.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct FakeDriver {
    ops: std::sync::Arc<parking_lot::Mutex<Vec<(TableOp, Invocation)>>>,
    fail_when: Option<fn(&TableOp) -> bool>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(fail_when: fn(&TableOp) -> bool) -> Self {
        Self { ops: Default::default(), fail_when: Some(fail_when) }
    }

    /// Everything applied so far, in call order.
    pub fn ops(&self) -> Vec<(TableOp, Invocation)> {
        self.ops.lock().clone()
    }

    /// Argument vectors of all recorded operations, for literal assertions.
    pub fn argv_log(&self) -> Vec<String> {
        self.ops
            .lock()
            .iter()
            .filter_map(|(op, _)| op.argv().ok().map(|args| args.join(" ")))
            .collect()
    }

    pub fn clear(&self) {
        self.ops.lock().clear();
    }

    fn record(&self, op: &TableOp, invocation: Invocation) -> Result<(), DriverError> {
        self.ops.lock().push((op.clone(), invocation));
        if op.service().protocol == lvsd_core::Protocol::Fwm {
            return Err(DriverError::Table(TableError::FwmNotImplemented));
        }
        if self.fail_when.is_some_and(|f| f(op)) {
            return Err(DriverError::NonZero { op: op.to_string(), code: 255 });
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl TableDriver for FakeDriver {
    async fn apply(&self, op: &TableOp) -> Result<(), DriverError> {
        self.record(op, Invocation::Sync)
    }

    fn apply_detached(&self, op: TableOp) {
        if let Err(e) = self.record(&op, Invocation::Detached) {
            tracing::error!(error = %e, "table update failed");
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
