// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kernel-table operations and their `ipvsadm` argument grammar.
//!
//! A [`TableOp`] is pure data describing one mutation of the IPVS table.
//! [`TableOp::argv`] renders it into the flag vector the external tool
//! expects; the daemon's table driver decides whether to run it
//! synchronously or detached.

use crate::real::{ForwardingMethod, RealAddr};
use crate::service::{Protocol, SchedulingMethod, ServiceAddr};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("firewall-mark services are not implemented")]
    FwmNotImplemented,
}

/// One operation against the kernel virtual-server table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOp {
    AddVirtual { service: ServiceAddr, scheduler: SchedulingMethod },
    DeleteVirtual { service: ServiceAddr },
    EditVirtual { service: ServiceAddr, scheduler: SchedulingMethod },
    AddReal { service: ServiceAddr, real: RealAddr, method: ForwardingMethod, weight: u32 },
    DeleteReal { service: ServiceAddr, real: RealAddr },
    EditReal { service: ServiceAddr, real: RealAddr, method: ForwardingMethod, weight: u32 },
}

impl TableOp {
    pub fn name(&self) -> &'static str {
        match self {
            TableOp::AddVirtual { .. } => "add-virtual",
            TableOp::DeleteVirtual { .. } => "delete-virtual",
            TableOp::EditVirtual { .. } => "edit-virtual",
            TableOp::AddReal { .. } => "add-real",
            TableOp::DeleteReal { .. } => "delete-real",
            TableOp::EditReal { .. } => "edit-real",
        }
    }

    pub fn service(&self) -> &ServiceAddr {
        match self {
            TableOp::AddVirtual { service, .. }
            | TableOp::DeleteVirtual { service }
            | TableOp::EditVirtual { service, .. }
            | TableOp::AddReal { service, .. }
            | TableOp::DeleteReal { service, .. }
            | TableOp::EditReal { service, .. } => service,
        }
    }

    /// Render the `ipvsadm` argument vector for this operation.
    pub fn argv(&self) -> Result<Vec<String>, TableError> {
        let mut args: Vec<String> = Vec::new();

        let service = self.service();
        let op_flag = match self {
            TableOp::AddVirtual { .. } => "-A",
            TableOp::DeleteVirtual { .. } => "-D",
            TableOp::EditVirtual { .. } => "-E",
            TableOp::AddReal { .. } => "-a",
            TableOp::DeleteReal { .. } => "-d",
            TableOp::EditReal { .. } => "-e",
        };
        args.push(op_flag.to_string());

        let proto_flag = match service.protocol {
            Protocol::Tcp => "-t",
            Protocol::Udp => "-u",
            Protocol::Fwm => return Err(TableError::FwmNotImplemented),
        };
        args.push(proto_flag.to_string());
        args.push(service.endpoint());

        match self {
            TableOp::AddVirtual { scheduler, .. } | TableOp::EditVirtual { scheduler, .. } => {
                args.push("-s".to_string());
                args.push(scheduler.name().to_string());
            }
            TableOp::DeleteVirtual { .. } => {}
            TableOp::AddReal { real, method, weight, .. }
            | TableOp::EditReal { real, method, weight, .. } => {
                args.push("-r".to_string());
                args.push(real.endpoint());
                args.push(method_flag(*method).to_string());
                args.push("-w".to_string());
                args.push(weight.to_string());
            }
            TableOp::DeleteReal { real, .. } => {
                args.push("-r".to_string());
                args.push(real.endpoint());
            }
        }

        Ok(args)
    }
}

fn method_flag(method: ForwardingMethod) -> &'static str {
    match method {
        ForwardingMethod::Gate => "-g",
        ForwardingMethod::Masq => "-m",
        ForwardingMethod::Ipip => "-i",
    }
}

impl fmt::Display for TableOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.argv() {
            Ok(args) => write!(f, "{}", args.join(" ")),
            Err(_) => write!(f, "{} {} (fwm unsupported)", self.name(), self.service()),
        }
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
