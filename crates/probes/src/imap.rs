// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IMAP4 greeting probe.
//!
//! Healthy means the server greets with a non-empty capability list; the
//! probe then logs out without authenticating.

use crate::{CheckError, CheckResult, Probe};
use async_trait::async_trait;
use lvsd_core::{GlobalSettings, RealServer, VirtualService};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Debug, Clone, Copy, Default)]
pub struct ImapProbe;

/// Extract the capability names from an IMAP greeting such as
/// `* OK [CAPABILITY IMAP4rev1 STARTTLS] ready`.
fn greeting_capabilities(line: &str) -> Vec<&str> {
    let Some(start) = line.find("[CAPABILITY") else {
        return Vec::new();
    };
    let rest = &line[start + "[CAPABILITY".len()..];
    let Some(end) = rest.find(']') else {
        return Vec::new();
    };
    rest[..end].split_whitespace().collect()
}

#[async_trait]
impl Probe for ImapProbe {
    async fn check(
        &self,
        virtual_service: &VirtualService,
        real: &RealServer,
        settings: &GlobalSettings,
    ) -> CheckResult {
        let timeout = virtual_service.effective_negotiatetimeout(settings);
        let addr = SocketAddr::new(real.addr.ip, virtual_service.check_port(real));

        let run = async {
            let stream = TcpStream::connect(addr)
                .await
                .map_err(|e| CheckError::Connect(format!("{addr}: {e}")))?;
            let mut reader = BufReader::new(stream);

            let mut greeting = String::new();
            let n = reader.read_line(&mut greeting).await?;
            if n == 0 {
                return Err(CheckError::Protocol("connection closed before greeting".into()));
            }
            let greeting = greeting.trim_end();

            if greeting_capabilities(greeting).is_empty() {
                return Err(CheckError::Unexpected {
                    got: greeting.to_string(),
                    expected: "greeting with a capability list".to_string(),
                });
            }

            let stream = reader.get_mut();
            stream.write_all(b"a1 LOGOUT\r\n").await?;
            Ok(())
        };

        tokio::time::timeout(Duration::from_secs(timeout), run)
            .await
            .unwrap_or(Err(CheckError::Timeout(timeout)))
    }
}

#[cfg(test)]
#[path = "imap_tests.rs"]
mod tests;
