// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP and HTTPS probes.
//!
//! The TCP connection always targets the real server's address; the URI
//! host (and with it the `Host` header and TLS verification name) is the
//! virtual service's `hostname` when configured. `reqwest`'s resolver
//! override pins the hostname to the real's address so every probe hits the
//! backend under test.

use crate::{CheckError, CheckResult, Probe, USER_AGENT};
use async_trait::async_trait;
use lvsd_core::{GlobalSettings, HttpMethod, RealServer, VirtualService};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Shared GET/HEAD probe for `http` and `https`.
#[derive(Debug, Clone, Copy)]
pub struct HttpProbe {
    scheme: Scheme,
}

impl HttpProbe {
    pub fn new(scheme: Scheme) -> Self {
        Self { scheme }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(
        &self,
        virtual_service: &VirtualService,
        real: &RealServer,
        settings: &GlobalSettings,
    ) -> CheckResult {
        let timeout = virtual_service.effective_negotiatetimeout(settings);
        let port = virtual_service.check_port(real);
        let path = real
            .request
            .as_deref()
            .or(virtual_service.request.as_deref())
            .ok_or_else(|| CheckError::Config("no request path ('request') specified".into()))?;
        let path = path.strip_prefix('/').unwrap_or(path);

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(timeout))
            .timeout(Duration::from_secs(timeout));

        // With a configured hostname the URI carries it (for Host and SNI)
        // and the resolver is pinned to the real server's address.
        let host = match virtual_service.hostname.as_deref() {
            Some(hostname) => {
                builder =
                    builder.resolve(hostname, SocketAddr::new(real.addr.ip, port));
                hostname.to_string()
            }
            None => real.addr.ip.to_string(),
        };

        let client = builder
            .build()
            .map_err(|e| CheckError::Protocol(format!("client setup: {e}")))?;

        let url = match real.addr.ip {
            std::net::IpAddr::V6(ip) if virtual_service.hostname.is_none() => {
                format!("{}://[{}]:{}/{}", self.scheme.as_str(), ip, port, path)
            }
            _ => format!("{}://{}:{}/{}", self.scheme.as_str(), host, port, path),
        };

        let request = match virtual_service.httpmethod {
            HttpMethod::Get => client.get(&url),
            HttpMethod::Head => client.head(&url),
        };

        let response = request
            .header(reqwest::header::HOST, &host)
            .send()
            .await
            .map_err(classify_reqwest_error(timeout))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(classify_reqwest_error(timeout))?;

        match real.receive.as_deref().or(virtual_service.receive.as_deref()) {
            Some(expected) => {
                if body.as_ref() == expected.as_bytes() {
                    Ok(())
                } else {
                    Err(CheckError::Unexpected {
                        got: String::from_utf8_lossy(&body).into_owned(),
                        expected: expected.to_string(),
                    })
                }
            }
            // Without an expected body, any successful status is healthy.
            None if status.is_success() => Ok(()),
            None => Err(CheckError::Protocol(format!("status {status}"))),
        }
    }
}

fn classify_reqwest_error(timeout: u64) -> impl Fn(reqwest::Error) -> CheckError {
    move |e| {
        if e.is_timeout() {
            CheckError::Timeout(timeout)
        } else if e.is_connect() {
            CheckError::Connect(e.to_string())
        } else {
            CheckError::Protocol(e.to_string())
        }
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
