// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MySQL and PostgreSQL query probes.
//!
//! Each probe opens a single-connection pool, runs the configured query,
//! and requires a non-empty result. The pool is closed in both the success
//! and the failure path before the verdict is returned.

use crate::{CheckError, CheckResult, Probe};
use async_trait::async_trait;
use lvsd_core::{GlobalSettings, RealServer, VirtualService};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::time::Duration;

/// Connection parameters shared by both SQL probes. Missing values are a
/// configuration error, caught again here in case the parser was bypassed.
struct SqlParams<'a> {
    login: &'a str,
    passwd: &'a str,
    database: &'a str,
    query: &'a str,
}

fn sql_params<'a>(virtual_service: &'a VirtualService, service: &str) -> Result<SqlParams<'a>, CheckError> {
    let login = virtual_service
        .login
        .as_deref()
        .ok_or_else(|| CheckError::Config(format!("no username ('login') specified for {service} check")))?;
    let database = virtual_service
        .database
        .as_deref()
        .ok_or_else(|| CheckError::Config(format!("no database specified for {service} check")))?;
    let query = virtual_service
        .request
        .as_deref()
        .ok_or_else(|| CheckError::Config(format!("no query ('request') specified for {service} check")))?;
    Ok(SqlParams { login, passwd: virtual_service.passwd.as_deref().unwrap_or(""), database, query })
}

fn verdict(result: Result<usize, sqlx::Error>) -> CheckResult {
    match result {
        Ok(0) => Err(CheckError::Unexpected {
            got: "empty result".to_string(),
            expected: "at least one row".to_string(),
        }),
        Ok(_) => Ok(()),
        Err(e) => Err(CheckError::Protocol(e.to_string())),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlProbe;

#[async_trait]
impl Probe for MySqlProbe {
    async fn check(
        &self,
        virtual_service: &VirtualService,
        real: &RealServer,
        settings: &GlobalSettings,
    ) -> CheckResult {
        let timeout = virtual_service.effective_negotiatetimeout(settings);
        let params = sql_params(virtual_service, "MySQL")?;

        let options = MySqlConnectOptions::new()
            .host(&real.addr.ip.to_string())
            .port(real.addr.port)
            .username(params.login)
            .password(params.passwd)
            .database(params.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(timeout))
            .connect_with(options)
            .await
            .map_err(|e| CheckError::Connect(format!("{}: {e}", real.addr)))?;

        let result = sqlx::query(params.query).fetch_all(&pool).await.map(|rows| rows.len());
        pool.close().await;
        verdict(result)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PgProbe;

#[async_trait]
impl Probe for PgProbe {
    async fn check(
        &self,
        virtual_service: &VirtualService,
        real: &RealServer,
        settings: &GlobalSettings,
    ) -> CheckResult {
        let timeout = virtual_service.effective_negotiatetimeout(settings);
        let params = sql_params(virtual_service, "PostgreSQL")?;

        let options = PgConnectOptions::new()
            .host(&real.addr.ip.to_string())
            .port(virtual_service.check_port(real))
            .username(params.login)
            .password(params.passwd)
            .database(params.database);

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(timeout))
            .connect_with(options)
            .await
            .map_err(|e| CheckError::Connect(format!("{}: {e}", real.addr)))?;

        let result = sqlx::query(params.query).fetch_all(&pool).await.map(|rows| rows.len());
        pool.close().await;
        verdict(result)
    }
}

#[cfg(test)]
#[path = "sql_tests.rs"]
mod tests;
