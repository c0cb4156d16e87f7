// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance lifecycle: initial table reset and pre-exit cleanup.
//!
//! Both run synchronously through the driver so their ordering against the
//! event loop is exact: the reset completes before the first probe is
//! armed, and cleanup runs after the loop has stopped.

use crate::driver::{DriverError, TableDriver};
use lvsd_core::{GlobalSettings, TableOp, VirtualService};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("initial table setup failed: {0}")]
    Driver(#[from] DriverError),
}

/// Reset and seed the kernel table from the configuration tree.
///
/// For every virtual service: delete it (tolerating "not present"), add it
/// back, seed all reals with weight 0 when quiescent, and add the fallback
/// at weight 1. Any non-tolerated failure is fatal to startup.
pub async fn initial_reset<D: TableDriver>(
    driver: &D,
    virtuals: &mut [VirtualService],
    settings: &GlobalSettings,
) -> Result<(), StartupError> {
    tracing::debug!("beginning initial table setup");
    for virtual_service in virtuals.iter_mut() {
        let service = virtual_service.addr;

        if let Err(e) = driver.apply(&TableOp::DeleteVirtual { service }).await {
            tracing::debug!(service = %service, error = %e,
                "deleting the virtual service failed during initialization (probably not present)");
        }

        tracing::info!(service = %service, "adding virtual service");
        driver
            .apply(&TableOp::AddVirtual { service, scheduler: virtual_service.scheduler })
            .await?;
        virtual_service.is_present = true;

        if virtual_service.effective_quiescent(settings) {
            for real in &mut virtual_service.reals {
                real.current_weight = 0;
                real.failcount = 0;
                tracing::info!(service = %service, real = %real.addr, "adding real server");
                driver
                    .apply(&TableOp::AddReal {
                        service,
                        real: real.addr,
                        method: real.method,
                        weight: 0,
                    })
                    .await?;
                real.is_present = true;
            }
        } else {
            for real in &mut virtual_service.reals {
                real.current_weight = 0;
                real.failcount = 0;
                real.is_present = false;
            }
        }

        if let Some(fallback) = virtual_service.fallback.as_mut() {
            fallback.current_weight = 1;
            tracing::info!(service = %service, fallback = %fallback.addr, "adding fallback server");
            driver
                .apply(&TableOp::AddReal {
                    service,
                    real: fallback.addr,
                    method: fallback.method,
                    weight: 1,
                })
                .await?;
            fallback.is_present = true;
        }
    }
    tracing::debug!("initial table setup done");
    Ok(())
}

/// Remove virtual services whose effective `cleanstop` is set. A failing
/// removal is logged and does not block the remaining ones.
pub async fn cleanup<D: TableDriver>(
    driver: &D,
    virtuals: &mut [VirtualService],
    settings: &GlobalSettings,
) {
    for virtual_service in virtuals.iter_mut() {
        if !virtual_service.effective_cleanstop(settings) || !virtual_service.is_present {
            continue;
        }
        let service = virtual_service.addr;
        tracing::info!(service = %service, "removing virtual service");
        if let Err(e) = driver.apply(&TableOp::DeleteVirtual { service }).await {
            tracing::error!(service = %service, error = %e, "could not remove virtual service");
        }
        virtual_service.is_present = false;
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
