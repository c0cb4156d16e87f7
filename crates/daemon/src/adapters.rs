// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Probe launch adapter.
//!
//! The runtime hands the adapter read-only snapshots of the model; the
//! adapter runs the probe concurrently and delivers the verdict back to the
//! event loop as a [`Event::CheckCompleted`].

use lvsd_core::{CheckOutcome, Event, GlobalSettings, RealServer, VirtualService};
use lvsd_probes::ProbeRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Launches asynchronous probes.
pub trait CheckAdapter: Send + 'static {
    fn spawn_check(
        &self,
        virtual_service: VirtualService,
        real: RealServer,
        settings: GlobalSettings,
        events: mpsc::Sender<Event>,
    );
}

/// Production adapter resolving probes through the registry.
#[derive(Clone)]
pub struct ProbeCheckAdapter {
    registry: Arc<ProbeRegistry>,
}

impl ProbeCheckAdapter {
    pub fn new(registry: Arc<ProbeRegistry>) -> Self {
        Self { registry }
    }
}

impl CheckAdapter for ProbeCheckAdapter {
    fn spawn_check(
        &self,
        virtual_service: VirtualService,
        real: RealServer,
        settings: GlobalSettings,
        events: mpsc::Sender<Event>,
    ) {
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let outcome = match registry.select(&virtual_service) {
                Ok(probe) => match probe.check(&virtual_service, &real, &settings).await {
                    Ok(()) => CheckOutcome::Success,
                    Err(e) => CheckOutcome::Failure(e.to_string()),
                },
                Err(e) => CheckOutcome::Failure(e.to_string()),
            };
            tracing::debug!(service = %virtual_service.addr, real = %real.addr, outcome = %outcome, "check finished");

            let event =
                Event::CheckCompleted { service: virtual_service.addr, real: real.addr, outcome };
            if events.send(event).await.is_err() {
                // The loop is gone (shutdown); the verdict is dropped.
                tracing::debug!("event loop closed, dropping check outcome");
            }
        });
    }
}

/// Recording adapter for tests; outcomes are injected manually.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct FakeCheckAdapter {
    launched: std::sync::Arc<
        parking_lot::Mutex<Vec<(lvsd_core::ServiceAddr, lvsd_core::RealAddr)>>,
    >,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeCheckAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// (virtual, real) pairs probed so far, in launch order.
    pub fn launched(&self) -> Vec<(lvsd_core::ServiceAddr, lvsd_core::RealAddr)> {
        self.launched.lock().clone()
    }

    pub fn clear(&self) {
        self.launched.lock().clear();
    }
}

#[cfg(any(test, feature = "test-support"))]
impl CheckAdapter for FakeCheckAdapter {
    fn spawn_check(
        &self,
        virtual_service: VirtualService,
        real: RealServer,
        _settings: GlobalSettings,
        _events: mpsc::Sender<Event>,
    ) {
        self.launched.lock().push((virtual_service.addr, real.addr));
    }
}
