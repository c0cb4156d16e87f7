// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lvsd_core::test_support::{real_server, virtual_service};
use lvsd_core::{Clock, FakeClock};

fn check_timer(real_ip: &str) -> TimerId {
    let v = virtual_service("10.0.0.1", 80);
    let r = real_server(real_ip, 80);
    TimerId::Check { service: v.addr, real: r.addr }
}

#[test]
fn timer_fires_after_its_deadline() {
    let clock = FakeClock::new();
    let mut scheduler = Scheduler::new();
    let id = check_timer("10.0.1.1");

    scheduler.set_timer(id, Duration::from_secs(10), clock.now());
    assert!(scheduler.has_timers());
    assert!(scheduler.next_deadline().is_some());

    clock.advance(Duration::from_secs(5));
    assert!(scheduler.fired_timers(clock.now()).is_empty());

    clock.advance(Duration::from_secs(10));
    assert_eq!(scheduler.fired_timers(clock.now()), vec![id]);
    assert!(!scheduler.has_timers());
}

#[test]
fn cancelled_timer_never_fires() {
    let clock = FakeClock::new();
    let mut scheduler = Scheduler::new();
    let id = check_timer("10.0.1.1");

    scheduler.set_timer(id, Duration::from_secs(10), clock.now());
    scheduler.cancel_timer(&id);

    clock.advance(Duration::from_secs(15));
    assert!(scheduler.fired_timers(clock.now()).is_empty());
}

#[test]
fn rearming_replaces_the_deadline() {
    let clock = FakeClock::new();
    let mut scheduler = Scheduler::new();
    let id = check_timer("10.0.1.1");

    scheduler.set_timer(id, Duration::from_secs(5), clock.now());
    scheduler.set_timer(id, Duration::from_secs(60), clock.now());

    clock.advance(Duration::from_secs(10));
    assert!(scheduler.fired_timers(clock.now()).is_empty());
    assert!(scheduler.is_armed(&id));
}

#[test]
fn due_timers_come_out_in_deadline_order() {
    let clock = FakeClock::new();
    let mut scheduler = Scheduler::new();
    let late = check_timer("10.0.1.1");
    let early = check_timer("10.0.1.2");

    scheduler.set_timer(late, Duration::from_secs(20), clock.now());
    scheduler.set_timer(early, Duration::from_secs(10), clock.now());

    clock.advance(Duration::from_secs(30));
    assert_eq!(scheduler.fired_timers(clock.now()), vec![early, late]);
}

#[test]
fn clear_discards_everything() {
    let clock = FakeClock::new();
    let mut scheduler = Scheduler::new();

    scheduler.set_timer(check_timer("10.0.1.1"), Duration::from_secs(1), clock.now());
    scheduler.set_timer(TimerId::ConfigWatch, Duration::from_secs(1), clock.now());
    scheduler.clear();

    clock.advance(Duration::from_secs(5));
    assert!(scheduler.fired_timers(clock.now()).is_empty());
    assert!(!scheduler.has_timers());
}
