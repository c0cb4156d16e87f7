// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real and fallback server configuration.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::service::UnknownVariant;

/// Packet-forwarding technique for a real server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardingMethod {
    /// Direct routing (`-g`)
    Gate,
    /// NAT (`-m`)
    Masq,
    /// IP-in-IP tunnel (`-i`)
    Ipip,
}

impl ForwardingMethod {
    pub const ALLOWED: &'static str = "gate, masq, ipip";
}

impl fmt::Display for ForwardingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ForwardingMethod::Gate => "gate",
            ForwardingMethod::Masq => "masq",
            ForwardingMethod::Ipip => "ipip",
        })
    }
}

impl FromStr for ForwardingMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gate" => Ok(ForwardingMethod::Gate),
            "masq" => Ok(ForwardingMethod::Masq),
            "ipip" => Ok(ForwardingMethod::Ipip),
            _ => Err(UnknownVariant { value: s.to_string(), allowed: ForwardingMethod::ALLOWED }),
        }
    }
}

/// Address of a backend server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RealAddr {
    pub ip: IpAddr,
    pub port: u16,
}

impl RealAddr {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    /// `ip:port` as `ipvsadm -r` expects it (IPv6 addresses bracketed).
    pub fn endpoint(&self) -> String {
        match self.ip {
            IpAddr::V4(ip) => format!("{}:{}", ip, self.port),
            IpAddr::V6(ip) => format!("[{}]:{}", ip, self.port),
        }
    }
}

impl fmt::Display for RealAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint())
    }
}

/// One backend server behind a virtual service.
///
/// `weight` is the configured target; `current_weight` and `is_present`
/// track what was last pushed to the kernel table. `failcount` saturates at
/// the effective failure count for the owning virtual service.
#[derive(Debug, Clone)]
pub struct RealServer {
    pub addr: RealAddr,
    pub method: ForwardingMethod,
    pub weight: u32,
    /// Per-real override of the virtual service's probe request.
    pub request: Option<String>,
    /// Per-real override of the expected probe response.
    pub receive: Option<String>,
    pub failcount: u32,
    pub current_weight: u32,
    pub is_present: bool,
}

impl RealServer {
    pub fn new(addr: RealAddr, method: ForwardingMethod) -> Self {
        Self {
            addr,
            method,
            weight: 1,
            request: None,
            receive: None,
            failcount: 0,
            current_weight: 0,
            is_present: false,
        }
    }

    /// Present in the table with a positive weight.
    pub fn is_active(&self) -> bool {
        self.is_present && self.current_weight > 0
    }
}

/// The designated server activated only when every real is unhealthy.
/// Its target weight is implicitly 1.
#[derive(Debug, Clone)]
pub struct Fallback {
    pub addr: RealAddr,
    pub method: ForwardingMethod,
    pub current_weight: u32,
    pub is_present: bool,
}

impl Fallback {
    pub fn new(addr: RealAddr, method: ForwardingMethod) -> Self {
        Self { addr, method, current_weight: 1, is_present: false }
    }
}
