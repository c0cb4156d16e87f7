// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LDAP simple-bind probe.

use crate::{CheckError, CheckResult, Probe};
use async_trait::async_trait;
use ldap3::{LdapConnAsync, LdapConnSettings};
use lvsd_core::{GlobalSettings, RealServer, VirtualService};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct LdapProbe;

#[async_trait]
impl Probe for LdapProbe {
    async fn check(
        &self,
        virtual_service: &VirtualService,
        real: &RealServer,
        settings: &GlobalSettings,
    ) -> CheckResult {
        let timeout = virtual_service.effective_negotiatetimeout(settings);
        let login = virtual_service
            .login
            .as_deref()
            .ok_or_else(|| CheckError::Config("no bind DN ('login') specified for LDAP check".into()))?;
        let passwd = virtual_service.passwd.as_deref().unwrap_or("");

        let url = format!("ldap://{}", real.addr.endpoint());
        let conn_settings =
            LdapConnSettings::new().set_conn_timeout(Duration::from_secs(timeout));

        let run = async {
            let (conn, mut ldap) = LdapConnAsync::with_settings(conn_settings, &url)
                .await
                .map_err(|e| CheckError::Connect(format!("{url}: {e}")))?;
            ldap3::drive!(conn);

            let result = ldap
                .simple_bind(login, passwd)
                .await
                .map_err(|e| CheckError::Protocol(format!("bind: {e}")))?;
            result
                .success()
                .map_err(|e| CheckError::Protocol(format!("bind rejected: {e}")))?;

            let _ = ldap.unbind().await;
            Ok(())
        };

        tokio::time::timeout(Duration::from_secs(timeout), run)
            .await
            .unwrap_or(Err(CheckError::Timeout(timeout)))
    }
}
