// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lvsd_core::test_support::{real_server, virtual_service};
use tokio::net::TcpListener;

#[tokio::test]
async fn open_port_is_healthy() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let _ = listener.accept().await;
    });

    let virtual_service = virtual_service("127.0.0.1", 80);
    let real = real_server("127.0.0.1", port);
    let settings = GlobalSettings::default();

    ConnectProbe.check(&virtual_service, &real, &settings).await.unwrap();
}

#[tokio::test]
async fn refused_connection_fails() {
    // Bind then drop, so the port is closed.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let virtual_service = virtual_service("127.0.0.1", 80);
    let real = real_server("127.0.0.1", port);
    let settings = GlobalSettings::default();

    let err = ConnectProbe.check(&virtual_service, &real, &settings).await.unwrap_err();
    assert!(matches!(err, CheckError::Connect(_)), "{err}");
}

#[tokio::test]
async fn checkport_overrides_real_port() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let _ = listener.accept().await;
    });

    let mut virtual_service = virtual_service("127.0.0.1", 80);
    virtual_service.checkport = Some(port);
    // The real's own port is closed; only the checkport is listening.
    let real = real_server("127.0.0.1", 1);
    let settings = GlobalSettings::default();

    ConnectProbe.check(&virtual_service, &real, &settings).await.unwrap();
}
