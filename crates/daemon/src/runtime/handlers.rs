// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event handlers: timer routing and probe-outcome processing.

use super::{config_mtime, Flow, Runtime, CONFIG_CHECK_PERIOD};
use crate::adapters::CheckAdapter;
use crate::driver::TableDriver;
use lvsd_core::{
    transition, CheckOutcome, Clock, Effect, RealAddr, ServiceAddr, TimerId,
};
use std::time::Duration;

impl<D, P, C> Runtime<D, P, C>
where
    D: TableDriver,
    P: CheckAdapter,
    C: Clock,
{
    pub(super) fn handle_timer(&mut self, id: TimerId) -> Flow {
        match id {
            TimerId::Check { service, real } => {
                let Some((vi, ri)) = self.find_pair(service, real) else {
                    tracing::debug!(service = %service, real = %real, "check timer for unknown pair");
                    return Flow::Continue;
                };
                self.launch_check(vi, ri);
                Flow::Continue
            }
            TimerId::ConfigWatch => self.handle_config_watch(),
        }
    }

    /// Snapshot the pair and hand it to the check adapter.
    pub(super) fn launch_check(&mut self, vi: usize, ri: usize) {
        let virtual_service = self.virtuals[vi].clone();
        let real = virtual_service.reals[ri].clone();
        self.executor.execute(Effect::RunCheck {
            virtual_service: Box::new(virtual_service),
            real,
            settings: self.settings.clone(),
        });
    }

    pub(super) fn handle_check_completed(
        &mut self,
        service: ServiceAddr,
        real: RealAddr,
        outcome: CheckOutcome,
    ) -> Flow {
        let Some((vi, ri)) = self.find_pair(service, real) else {
            tracing::debug!(service = %service, real = %real, "outcome for unknown pair, dropped");
            return Flow::Continue;
        };
        tracing::debug!(real = %real, "{}", outcome);

        let virtual_service = &mut self.virtuals[vi];
        let ops = match outcome {
            CheckOutcome::Success => transition::on_success(virtual_service, ri),
            CheckOutcome::Failure(ref reason) => {
                tracing::info!(service = %service, real = %real, reason = %reason, "check failed");
                transition::on_failure(virtual_service, ri, &self.settings)
            }
        };
        let interval = virtual_service.effective_checkinterval(&self.settings);

        for op in ops {
            tracing::info!(op = %op, "updating kernel table");
            self.executor.execute(Effect::Reconcile { op });
        }

        // Re-arm from completion time: no overlap, no drift amplification.
        self.executor.execute(Effect::SetTimer {
            id: TimerId::Check { service, real },
            duration: Duration::from_secs(interval),
        });

        Flow::Continue
    }

    /// Compare the configuration file's mtime against the last observation;
    /// a changed, parseable file triggers an orderly restart.
    fn handle_config_watch(&mut self) -> Flow {
        let rearm = Effect::SetTimer { id: TimerId::ConfigWatch, duration: CONFIG_CHECK_PERIOD };

        let current = config_mtime(&self.settings);
        if current.is_some() && current != self.watch_mtime {
            match lvsd_config::parse_file(&self.settings.configfile) {
                Ok(_) => {
                    tracing::info!(
                        config = %self.settings.configfile.display(),
                        "configuration changed on disk, restarting"
                    );
                    return Flow::Reload;
                }
                Err(e) => {
                    tracing::error!(error = %e, "changed configuration does not parse, ignoring");
                    self.watch_mtime = current;
                }
            }
        }

        self.executor.execute(rearm);
        Flow::Continue
    }

    fn find_pair(&self, service: ServiceAddr, real: RealAddr) -> Option<(usize, usize)> {
        let vi = self.virtuals.iter().position(|v| v.addr == service)?;
        let ri = self.virtuals[vi].reals.iter().position(|r| r.addr == real)?;
        Some((vi, ri))
    }
}
