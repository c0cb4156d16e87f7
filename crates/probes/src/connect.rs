// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in TCP connect probe (`checktype = connect`).

use crate::{CheckError, CheckResult, Probe};
use async_trait::async_trait;
use lvsd_core::{GlobalSettings, RealServer, VirtualService};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// Opens a TCP connection to the check port and closes it immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectProbe;

#[async_trait]
impl Probe for ConnectProbe {
    async fn check(
        &self,
        virtual_service: &VirtualService,
        real: &RealServer,
        settings: &GlobalSettings,
    ) -> CheckResult {
        let timeout = virtual_service.effective_checktimeout(settings);
        let addr = SocketAddr::new(real.addr.ip, virtual_service.check_port(real));

        match tokio::time::timeout(Duration::from_secs(timeout), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                Ok(())
            }
            Ok(Err(e)) => Err(CheckError::Connect(format!("{addr}: {e}"))),
            Err(_) => Err(CheckError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
#[path = "connect_tests.rs"]
mod tests;
