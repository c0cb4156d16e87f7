// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH transport probe.
//!
//! Completes the SSH key exchange and, when the virtual service pins a
//! host-key fingerprint, requires an exact match. No authentication is
//! attempted; the connection is dropped once the transport is secure.

use crate::{CheckError, CheckResult, Probe};
use async_trait::async_trait;
use lvsd_core::{GlobalSettings, RealServer, VirtualService};
use parking_lot::Mutex;
use russh::client;
use russh::keys::{HashAlg, PublicKey};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct SshProbe;

struct KexHandler {
    expected: Option<String>,
    observed: Arc<Mutex<Option<String>>>,
}

impl client::Handler for KexHandler {
    type Error = russh::Error;

    async fn check_server_key(&mut self, key: &PublicKey) -> Result<bool, Self::Error> {
        let fingerprint = key.fingerprint(HashAlg::Sha256).to_string();
        let accepted = match self.expected.as_deref() {
            Some(expected) => expected == fingerprint,
            None => true,
        };
        *self.observed.lock() = Some(fingerprint);
        Ok(accepted)
    }
}

#[async_trait]
impl Probe for SshProbe {
    async fn check(
        &self,
        virtual_service: &VirtualService,
        real: &RealServer,
        settings: &GlobalSettings,
    ) -> CheckResult {
        let timeout = virtual_service.effective_negotiatetimeout(settings);
        let addr = SocketAddr::new(real.addr.ip, virtual_service.check_port(real));

        let observed = Arc::new(Mutex::new(None));
        let handler = KexHandler {
            expected: virtual_service.fingerprint.clone(),
            observed: Arc::clone(&observed),
        };
        let config = Arc::new(client::Config::default());

        let connected =
            tokio::time::timeout(Duration::from_secs(timeout), client::connect(config, addr, handler))
                .await;

        match connected {
            Err(_) => Err(CheckError::Timeout(timeout)),
            Ok(Ok(session)) => {
                let _ = session
                    .disconnect(russh::Disconnect::ByApplication, "health check done", "en")
                    .await;
                Ok(())
            }
            Ok(Err(e)) => {
                // A rejected host key surfaces as a generic kex failure;
                // report the observed fingerprint instead when we have one.
                if let (Some(expected), Some(got)) =
                    (virtual_service.fingerprint.as_deref(), observed.lock().clone())
                {
                    if got != expected {
                        return Err(CheckError::Unexpected {
                            got,
                            expected: expected.to_string(),
                        });
                    }
                }
                Err(CheckError::Connect(format!("{addr}: {e}")))
            }
        }
    }
}
