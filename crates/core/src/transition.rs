// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outcome state machine: maps probe verdicts onto model mutations and
//! kernel-table operations.
//!
//! Both entry points mutate the virtual service in place and return the
//! table operations to issue, in order. They are pure with respect to I/O,
//! which keeps the whole hysteresis/fallback logic testable without a
//! kernel or an external tool.

use crate::real::RealServer;
use crate::service::VirtualService;
use crate::settings::GlobalSettings;
use crate::table::TableOp;

/// Apply a successful probe outcome for `virtual_service.reals[real_idx]`.
///
/// Resets the failure counter, restores the real to its target weight
/// (adding it to the table if absent), and withdraws the fallback if it is
/// still active.
pub fn on_success(virtual_service: &mut VirtualService, real_idx: usize) -> Vec<TableOp> {
    let mut ops = Vec::new();
    let service = virtual_service.addr;

    let Some(real) = virtual_service.reals.get_mut(real_idx) else {
        return ops;
    };

    real.failcount = 0;

    if !real.is_present || real.current_weight < real.weight {
        real.current_weight = real.weight;
        if real.is_present {
            ops.push(TableOp::EditReal {
                service,
                real: real.addr,
                method: real.method,
                weight: real.current_weight,
            });
        } else {
            ops.push(TableOp::AddReal {
                service,
                real: real.addr,
                method: real.method,
                weight: real.current_weight,
            });
            real.is_present = true;
        }
    }

    // A healthy real means the fallback must not carry traffic.
    if let Some(fallback) = virtual_service.fallback.as_mut() {
        if fallback.current_weight > 0 || fallback.is_present {
            fallback.current_weight = 0;
            if fallback.is_present {
                ops.push(TableOp::DeleteReal { service, real: fallback.addr });
                fallback.is_present = false;
            }
        }
    }

    ops
}

/// Apply a failed probe outcome for `virtual_service.reals[real_idx]`.
///
/// Increments the (saturating) failure counter and, once the effective
/// failure count is reached, takes the real out of rotation: weight 0 when
/// quiescent, removal otherwise. Afterwards the fallback is activated if no
/// real in the service remains active.
pub fn on_failure(
    virtual_service: &mut VirtualService,
    real_idx: usize,
    defaults: &GlobalSettings,
) -> Vec<TableOp> {
    let mut ops = Vec::new();
    let service = virtual_service.addr;
    let failurecount = virtual_service.effective_failurecount(defaults);
    let quiescent = virtual_service.effective_quiescent(defaults);
    let readdquiescent = virtual_service.effective_readdquiescent(defaults);

    let Some(real) = virtual_service.reals.get_mut(real_idx) else {
        return ops;
    };

    real.failcount = (real.failcount + 1).min(failurecount);
    if real.failcount < failurecount {
        // Below the threshold: hysteresis, no table change.
        return ops;
    }

    if quiescent {
        if real.is_present {
            if real.current_weight != 0 {
                real.current_weight = 0;
                ops.push(TableOp::EditReal {
                    service,
                    real: real.addr,
                    method: real.method,
                    weight: 0,
                });
            }
        } else if readdquiescent {
            real.current_weight = 0;
            ops.push(TableOp::AddReal { service, real: real.addr, method: real.method, weight: 0 });
            real.is_present = true;
        }
    } else {
        real.current_weight = 0;
        if real.is_present {
            ops.push(TableOp::DeleteReal { service, real: real.addr });
            real.is_present = false;
        }
    }

    // Fallback activation: only when the whole pool is down, and only when a
    // fallback is actually configured.
    if virtual_service.reals.iter().any(RealServer::is_active) {
        return ops;
    }
    if let Some(fallback) = virtual_service.fallback.as_mut() {
        if !fallback.is_present || fallback.current_weight < 1 {
            fallback.current_weight = 1;
            if fallback.is_present {
                ops.push(TableOp::EditReal {
                    service,
                    real: fallback.addr,
                    method: fallback.method,
                    weight: 1,
                });
            } else {
                ops.push(TableOp::AddReal {
                    service,
                    real: fallback.addr,
                    method: fallback.method,
                    weight: 1,
                });
                fallback.is_present = true;
            }
        }
    }

    ops
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;
