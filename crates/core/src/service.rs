// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Virtual service configuration and identity.

use crate::real::{Fallback, RealServer};
use crate::settings::GlobalSettings;
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

/// Error for parsing one of the closed keyword sets below.
#[derive(Debug, Error)]
#[error("unknown value '{value}', expected one of: {allowed}")]
pub struct UnknownVariant {
    pub value: String,
    pub allowed: &'static str,
}

/// Transport protocol of a virtual service.
///
/// `fwm` (firewall-mark) is accepted by the parser but the table driver
/// rejects it as not implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    Fwm,
}

impl Protocol {
    pub const ALLOWED: &'static str = "tcp, udp, fwm";
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Fwm => "fwm",
        })
    }
}

impl FromStr for Protocol {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "fwm" => Ok(Protocol::Fwm),
            _ => Err(UnknownVariant { value: s.to_string(), allowed: Protocol::ALLOWED }),
        }
    }
}

/// IPVS packet-scheduling algorithm, named as `ipvsadm -s` expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingMethod {
    Rr,
    Wrr,
    Lc,
    Wlc,
    Lblc,
    Lblcr,
    Dh,
    Sh,
    Sed,
    Nq,
}

impl SchedulingMethod {
    pub const ALLOWED: &'static str = "rr, wrr, lc, wlc, lblc, lblcr, dh, sh, sed, nq";

    /// The scheduler name as passed to `ipvsadm -s`.
    pub fn name(self) -> &'static str {
        match self {
            SchedulingMethod::Rr => "rr",
            SchedulingMethod::Wrr => "wrr",
            SchedulingMethod::Lc => "lc",
            SchedulingMethod::Wlc => "wlc",
            SchedulingMethod::Lblc => "lblc",
            SchedulingMethod::Lblcr => "lblcr",
            SchedulingMethod::Dh => "dh",
            SchedulingMethod::Sh => "sh",
            SchedulingMethod::Sed => "sed",
            SchedulingMethod::Nq => "nq",
        }
    }
}

impl fmt::Display for SchedulingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SchedulingMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rr" => Ok(SchedulingMethod::Rr),
            "wrr" => Ok(SchedulingMethod::Wrr),
            "lc" => Ok(SchedulingMethod::Lc),
            "wlc" => Ok(SchedulingMethod::Wlc),
            "lblc" => Ok(SchedulingMethod::Lblc),
            "lblcr" => Ok(SchedulingMethod::Lblcr),
            "dh" => Ok(SchedulingMethod::Dh),
            "sh" => Ok(SchedulingMethod::Sh),
            "sed" => Ok(SchedulingMethod::Sed),
            "nq" => Ok(SchedulingMethod::Nq),
            _ => Err(UnknownVariant { value: s.to_string(), allowed: SchedulingMethod::ALLOWED }),
        }
    }
}

/// How a virtual service's reals are probed.
///
/// Only `connect` and `negotiate` are implemented; the remaining variants
/// exist so the parser can name them in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckType {
    Connect,
    Negotiate,
    External,
    Ping,
    Off,
    On,
    NegotiateConnect,
}

impl CheckType {
    pub const ALLOWED: &'static str =
        "connect, negotiate, external, ping, off, on, negotiate_connect";
    pub const IMPLEMENTED: &'static str = "connect, negotiate";

    /// Whether this check type is implemented (the rest are reserved).
    pub fn is_implemented(self) -> bool {
        matches!(self, CheckType::Connect | CheckType::Negotiate)
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckType::Connect => "connect",
            CheckType::Negotiate => "negotiate",
            CheckType::External => "external",
            CheckType::Ping => "ping",
            CheckType::Off => "off",
            CheckType::On => "on",
            CheckType::NegotiateConnect => "negotiate_connect",
        })
    }
}

impl FromStr for CheckType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connect" => Ok(CheckType::Connect),
            "negotiate" => Ok(CheckType::Negotiate),
            "external" => Ok(CheckType::External),
            "ping" => Ok(CheckType::Ping),
            "off" => Ok(CheckType::Off),
            "on" => Ok(CheckType::On),
            "negotiate_connect" => Ok(CheckType::NegotiateConnect),
            _ => Err(UnknownVariant { value: s.to_string(), allowed: CheckType::ALLOWED }),
        }
    }
}

/// HTTP request method used by the http/https probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Head,
}

impl HttpMethod {
    pub const ALLOWED: &'static str = "get, head";
}

impl FromStr for HttpMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "head" => Ok(HttpMethod::Head),
            _ => Err(UnknownVariant { value: s.to_string(), allowed: HttpMethod::ALLOWED }),
        }
    }
}

/// Identity of a virtual service: address, port, and transport protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceAddr {
    pub ip: IpAddr,
    pub port: u16,
    pub protocol: Protocol,
}

impl ServiceAddr {
    pub fn new(ip: IpAddr, port: u16, protocol: Protocol) -> Self {
        Self { ip, port, protocol }
    }

    /// `ip:port` as `ipvsadm` expects it (IPv6 addresses bracketed).
    pub fn endpoint(&self) -> String {
        match self.ip {
            IpAddr::V4(ip) => format!("{}:{}", ip, self.port),
            IpAddr::V6(ip) => format!("[{}]:{}", ip, self.port),
        }
    }
}

impl fmt::Display for ServiceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.endpoint(), self.protocol)
    }
}

/// One virtual service: identity, check policy, probe parameters, and the
/// owned collection of real servers plus an optional fallback.
///
/// All `Option` policy fields inherit the global default when unset; the
/// `effective_*` accessors resolve that.
#[derive(Debug, Clone)]
pub struct VirtualService {
    pub addr: ServiceAddr,
    pub scheduler: SchedulingMethod,
    pub checktype: CheckType,
    /// Probe name from the registry, used when `checktype` is `negotiate`.
    pub service: Option<String>,
    pub checkport: Option<u16>,
    pub checktimeout: Option<u64>,
    pub negotiatetimeout: Option<u64>,
    pub checkinterval: Option<u64>,
    pub failurecount: Option<u32>,
    pub quiescent: Option<bool>,
    pub readdquiescent: Option<bool>,
    pub cleanstop: Option<bool>,
    pub persistent: Option<u32>,
    pub httpmethod: HttpMethod,
    pub request: Option<String>,
    pub receive: Option<String>,
    /// HTTP `Host` header and TLS verification name for the http/https
    /// probes; falls back to the real server's address when unset.
    pub hostname: Option<String>,
    pub login: Option<String>,
    pub passwd: Option<String>,
    pub database: Option<String>,
    pub secret: Option<String>,
    /// Expected SSH host-key fingerprint for the ssh probe.
    pub fingerprint: Option<String>,
    pub checkcommand: Option<String>,
    /// Unknown configuration keys, preserved verbatim.
    pub custom: HashMap<String, String>,
    pub reals: Vec<RealServer>,
    pub fallback: Option<Fallback>,
    /// Whether this service is in the kernel table, as last driven by us.
    pub is_present: bool,
}

impl VirtualService {
    pub fn new(addr: ServiceAddr, scheduler: SchedulingMethod, checktype: CheckType) -> Self {
        Self {
            addr,
            scheduler,
            checktype,
            service: None,
            checkport: None,
            checktimeout: None,
            negotiatetimeout: None,
            checkinterval: None,
            failurecount: None,
            quiescent: None,
            readdquiescent: None,
            cleanstop: None,
            persistent: None,
            httpmethod: HttpMethod::Get,
            request: None,
            receive: None,
            hostname: None,
            login: None,
            passwd: None,
            database: None,
            secret: None,
            fingerprint: None,
            checkcommand: None,
            custom: HashMap::new(),
            reals: Vec::new(),
            fallback: None,
            is_present: false,
        }
    }

    pub fn effective_checktimeout(&self, defaults: &GlobalSettings) -> u64 {
        self.checktimeout.unwrap_or(defaults.checktimeout)
    }

    pub fn effective_negotiatetimeout(&self, defaults: &GlobalSettings) -> u64 {
        self.negotiatetimeout.unwrap_or(defaults.negotiatetimeout)
    }

    pub fn effective_checkinterval(&self, defaults: &GlobalSettings) -> u64 {
        self.checkinterval.unwrap_or(defaults.checkinterval)
    }

    pub fn effective_failurecount(&self, defaults: &GlobalSettings) -> u32 {
        self.failurecount.unwrap_or(defaults.failurecount)
    }

    pub fn effective_quiescent(&self, defaults: &GlobalSettings) -> bool {
        self.quiescent.unwrap_or(defaults.quiescent)
    }

    pub fn effective_readdquiescent(&self, defaults: &GlobalSettings) -> bool {
        self.readdquiescent.unwrap_or(defaults.readdquiescent)
    }

    pub fn effective_cleanstop(&self, defaults: &GlobalSettings) -> bool {
        self.cleanstop.unwrap_or(defaults.cleanstop)
    }

    /// Port the probe should dial: explicit `checkport` or the real's port.
    pub fn check_port(&self, real: &RealServer) -> u16 {
        self.checkport.unwrap_or(real.addr.port)
    }

    /// Whether any real server is present with a positive weight.
    pub fn has_active_real(&self) -> bool {
        self.reals.iter().any(RealServer::is_active)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
