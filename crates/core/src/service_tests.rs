// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::settings::GlobalSettings;
use crate::test_support::{real_server, virtual_service};

#[test]
fn endpoint_formats_ipv4() {
    let v = virtual_service("10.0.0.1", 80);
    assert_eq!(v.addr.endpoint(), "10.0.0.1:80");
}

#[test]
fn endpoint_brackets_ipv6() {
    let addr = ServiceAddr::new("2001:db8::1".parse().unwrap(), 443, Protocol::Tcp);
    assert_eq!(addr.endpoint(), "[2001:db8::1]:443");
}

#[test]
fn effective_values_fall_back_to_defaults() {
    let defaults = GlobalSettings::default();
    let mut v = virtual_service("10.0.0.1", 80);

    assert_eq!(v.effective_checkinterval(&defaults), 10);
    assert_eq!(v.effective_failurecount(&defaults), 1);

    v.checkinterval = Some(3);
    v.failurecount = Some(5);
    assert_eq!(v.effective_checkinterval(&defaults), 3);
    assert_eq!(v.effective_failurecount(&defaults), 5);
}

#[yare::parameterized(
    inherit_true = { None, true, true },
    inherit_false = { None, false, false },
    override_on = { Some(true), false, true },
    override_off = { Some(false), true, false },
)]
fn quiescent_is_three_valued(setting: Option<bool>, default: bool, expected: bool) {
    let mut defaults = GlobalSettings::default();
    defaults.quiescent = default;
    let mut v = virtual_service("10.0.0.1", 80);
    v.quiescent = setting;
    assert_eq!(v.effective_quiescent(&defaults), expected);
}

#[test]
fn check_port_prefers_explicit_checkport() {
    let mut v = virtual_service("10.0.0.1", 80);
    let real = real_server("10.0.1.1", 8080);
    assert_eq!(v.check_port(&real), 8080);

    v.checkport = Some(9000);
    assert_eq!(v.check_port(&real), 9000);
}

#[yare::parameterized(
    connect = { "connect", true },
    negotiate = { "negotiate", true },
    external = { "external", false },
    ping = { "ping", false },
    off = { "off", false },
    on = { "on", false },
    negotiate_connect = { "negotiate_connect", false },
)]
fn checktype_implementation_status(name: &str, implemented: bool) {
    let ct: CheckType = name.parse().unwrap();
    assert_eq!(ct.is_implemented(), implemented);
}

#[test]
fn scheduler_names_round_trip() {
    for name in ["rr", "wrr", "lc", "wlc", "lblc", "lblcr", "dh", "sh", "sed", "nq"] {
        let s: SchedulingMethod = name.parse().unwrap();
        assert_eq!(s.name(), name);
    }
}

#[test]
fn unknown_scheduler_lists_allowed_values() {
    let err = "fancy".parse::<SchedulingMethod>().unwrap_err();
    assert!(err.to_string().contains("wrr"), "diagnostic should list allowed values: {err}");
}
