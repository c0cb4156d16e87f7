// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compile-time probe registry.

use crate::connect::ConnectProbe;
use crate::http::{HttpProbe, Scheme};
use crate::imap::ImapProbe;
use crate::ldap::LdapProbe;
use crate::smtp::SmtpProbe;
use crate::sql::{MySqlProbe, PgProbe};
use crate::ssh::SshProbe;
use crate::{CheckError, Probe};
use lvsd_core::{CheckType, VirtualService};
use std::collections::HashMap;
use std::sync::Arc;

/// Maps `service` names to probe implementations.
///
/// `checktype = connect` bypasses the registry and always uses the built-in
/// TCP connect probe; `negotiate` selects by the service name.
pub struct ProbeRegistry {
    probes: HashMap<&'static str, Arc<dyn Probe>>,
    connect: Arc<dyn Probe>,
}

impl ProbeRegistry {
    /// The full built-in probe set.
    pub fn builtin() -> Self {
        let mut probes: HashMap<&'static str, Arc<dyn Probe>> = HashMap::new();
        probes.insert("http", Arc::new(HttpProbe::new(Scheme::Http)));
        probes.insert("https", Arc::new(HttpProbe::new(Scheme::Https)));
        probes.insert("imap", Arc::new(ImapProbe));
        probes.insert("smtp", Arc::new(SmtpProbe));
        probes.insert("ssh", Arc::new(SshProbe));
        probes.insert("ldap", Arc::new(LdapProbe));
        probes.insert("mysql", Arc::new(MySqlProbe));
        probes.insert("pgsql", Arc::new(PgProbe));
        Self { probes, connect: Arc::new(ConnectProbe) }
    }

    /// Registered service names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.probes.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Probe>> {
        self.probes.get(name).map(Arc::clone)
    }

    /// Resolve the probe for a virtual service per its check policy.
    pub fn select(&self, virtual_service: &VirtualService) -> Result<Arc<dyn Probe>, CheckError> {
        match virtual_service.checktype {
            CheckType::Connect => Ok(Arc::clone(&self.connect)),
            CheckType::Negotiate => {
                let service = virtual_service.service.as_deref().ok_or_else(|| {
                    CheckError::Config("no probe ('service') configured".to_string())
                })?;
                self.get(service).ok_or_else(|| {
                    CheckError::NotImplemented(format!("no probe registered for '{service}'"))
                })
            }
            other => Err(CheckError::NotImplemented(format!("check type '{other}'"))),
        }
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
