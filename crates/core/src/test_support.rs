// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Model builders shared by tests across the workspace.

use crate::real::{Fallback, ForwardingMethod, RealAddr, RealServer};
use crate::service::{CheckType, Protocol, SchedulingMethod, ServiceAddr, VirtualService};
use std::net::IpAddr;

/// Parse an IP literal, panicking on bad test input.
fn ip(s: &str) -> IpAddr {
    match s.parse() {
        Ok(ip) => ip,
        Err(e) => unreachable!("bad test IP {s}: {e}"),
    }
}

/// A TCP virtual service at `addr:port` with `wrr` scheduling and no reals.
pub fn virtual_service(addr: &str, port: u16) -> VirtualService {
    VirtualService::new(
        ServiceAddr::new(ip(addr), port, Protocol::Tcp),
        SchedulingMethod::Wrr,
        CheckType::Negotiate,
    )
}

/// A direct-routed real server with weight 1.
pub fn real_server(addr: &str, port: u16) -> RealServer {
    RealServer::new(RealAddr::new(ip(addr), port), ForwardingMethod::Gate)
}

/// A direct-routed fallback server.
pub fn fallback(addr: &str, port: u16) -> Fallback {
    Fallback::new(RealAddr::new(ip(addr), port), ForwardingMethod::Gate)
}
