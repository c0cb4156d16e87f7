// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SMTP banner/HELO probe.
//!
//! Expects a 220 banner, sends `HELO <local identity>`, and treats any 2xx
//! reply as healthy before quitting. Multi-line replies (`250-...`) are
//! accumulated; lines starting with `0` are verbose informational output
//! and ignored.

use crate::{CheckError, CheckResult, Probe};
use async_trait::async_trait;
use lvsd_core::{GlobalSettings, RealServer, VirtualService};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpProbe;

/// One complete SMTP reply: status code and the accumulated lines.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

/// Read one (possibly multi-line) SMTP reply.
pub(crate) async fn read_reply<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<Reply, CheckError> {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(CheckError::Protocol("connection closed mid-reply".into()));
        }
        let line = line.trim_end_matches(['\r', '\n']);

        // Verbose informational message, ignore it.
        if line.starts_with('0') {
            continue;
        }

        if line.len() < 3 {
            return Err(CheckError::Protocol(format!("malformed reply line '{line}'")));
        }
        let code: u16 = line[..3]
            .parse()
            .map_err(|_| CheckError::Protocol(format!("malformed reply line '{line}'")))?;
        lines.push(line.get(4..).unwrap_or("").to_string());

        // A dash after the code marks a continuation line.
        if line.as_bytes().get(3) == Some(&b'-') {
            continue;
        }
        return Ok(Reply { code, lines });
    }
}

fn local_identity() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

#[async_trait]
impl Probe for SmtpProbe {
    async fn check(
        &self,
        virtual_service: &VirtualService,
        real: &RealServer,
        settings: &GlobalSettings,
    ) -> CheckResult {
        let timeout = virtual_service.effective_negotiatetimeout(settings);
        let addr = SocketAddr::new(real.addr.ip, real.addr.port);

        let run = async {
            let stream = TcpStream::connect(addr)
                .await
                .map_err(|e| CheckError::Connect(format!("{addr}: {e}")))?;
            let mut reader = BufReader::new(stream);

            let banner = read_reply(&mut reader).await?;
            if banner.code != 220 {
                return Err(CheckError::Unexpected {
                    got: format!("{} {}", banner.code, banner.lines.join(" / ")),
                    expected: "220 banner".to_string(),
                });
            }

            let helo = format!("HELO {}\r\n", local_identity());
            reader.get_mut().write_all(helo.as_bytes()).await?;

            let reply = read_reply(&mut reader).await?;
            if !(200..300).contains(&reply.code) {
                return Err(CheckError::Unexpected {
                    got: format!("{} {}", reply.code, reply.lines.join(" / ")),
                    expected: "2xx reply to HELO".to_string(),
                });
            }

            reader.get_mut().write_all(b"QUIT\r\n").await?;
            Ok(())
        };

        tokio::time::timeout(Duration::from_secs(timeout), run)
            .await
            .unwrap_or(Err(CheckError::Timeout(timeout)))
    }
}

#[cfg(test)]
#[path = "smtp_tests.rs"]
mod tests;
