// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::FakeCheckAdapter;
use crate::driver::{FakeDriver, Invocation};
use crate::executor::Executor;
use crate::lifecycle::initial_reset;
use lvsd_core::test_support::{fallback, real_server, virtual_service};
use lvsd_core::{CheckOutcome, FakeClock};
use std::time::Duration;
use tokio::sync::mpsc;

struct Harness {
    runtime: Runtime<FakeDriver, FakeCheckAdapter, FakeClock>,
    driver: FakeDriver,
    checks: FakeCheckAdapter,
    clock: FakeClock,
    _rx: mpsc::Receiver<Event>,
}

/// One virtual with two reals and a fallback, taken through the real
/// initial reset against the fake driver.
async fn setup(settings: GlobalSettings) -> Harness {
    let mut v = virtual_service("10.0.0.1", 80);
    v.checkinterval = Some(10);
    v.reals.push(real_server("10.0.1.1", 80));
    v.reals.push(real_server("10.0.1.2", 80));
    v.fallback = Some(fallback("127.0.0.1", 80));
    let mut virtuals = vec![v];

    let driver = FakeDriver::new();
    initial_reset(&driver, &mut virtuals, &settings).await.unwrap();
    driver.clear();

    let checks = FakeCheckAdapter::new();
    let clock = FakeClock::new();
    let (tx, rx) = mpsc::channel(64);
    let executor = Executor::new(driver.clone(), checks.clone(), clock.clone(), tx);
    let runtime = Runtime::new(executor, settings, virtuals);
    Harness { runtime, driver, checks, clock, _rx: rx }
}

fn pair(h: &Harness, ri: usize) -> (lvsd_core::ServiceAddr, lvsd_core::RealAddr) {
    let v = &h.runtime.virtuals()[0];
    (v.addr, v.reals[ri].addr)
}

#[tokio::test]
async fn initialize_launches_one_check_per_pair() {
    let mut h = setup(GlobalSettings::default()).await;
    h.runtime.initialize();

    let launched = h.checks.launched();
    assert_eq!(launched.len(), 2);
    assert_eq!(launched[0], pair(&h, 0));
    assert_eq!(launched[1], pair(&h, 1));
}

#[tokio::test]
async fn success_updates_the_table_and_rearms() {
    let mut h = setup(GlobalSettings::default()).await;
    h.runtime.initialize();
    h.checks.clear();
    let (service, real) = pair(&h, 0);

    let flow = h.runtime.handle_event(Event::CheckCompleted {
        service,
        real,
        outcome: CheckOutcome::Success,
    });
    assert_eq!(flow, Flow::Continue);

    // Weight restored, fallback withdrawn, both detached.
    assert_eq!(
        h.driver.argv_log(),
        vec!["-e -t 10.0.0.1:80 -r 10.0.1.1:80 -g -w 1", "-d -t 10.0.0.1:80 -r 127.0.0.1:80"]
    );
    assert!(h.driver.ops().iter().all(|(_, i)| *i == Invocation::Detached));

    // Next probe armed from completion, at the effective interval.
    let timer = TimerId::Check { service, real };
    assert!(h.runtime.executor.is_armed(&timer));

    h.clock.advance(Duration::from_secs(5));
    assert!(h.runtime.due_timers().is_empty());

    h.clock.advance(Duration::from_secs(6));
    assert_eq!(h.runtime.due_timers(), vec![timer]);

    let flow = h.runtime.handle_event(Event::TimerFired { id: timer });
    assert_eq!(flow, Flow::Continue);
    assert_eq!(h.checks.launched(), vec![(service, real)]);
}

#[tokio::test]
async fn steady_state_emits_no_operations() {
    let mut h = setup(GlobalSettings::default()).await;
    h.runtime.initialize();
    let (service, real) = pair(&h, 0);

    for _ in 0..2 {
        h.runtime.handle_event(Event::CheckCompleted {
            service,
            real,
            outcome: CheckOutcome::Success,
        });
    }
    h.driver.clear();

    h.runtime.handle_event(Event::CheckCompleted {
        service,
        real,
        outcome: CheckOutcome::Success,
    });
    assert!(h.driver.ops().is_empty(), "stable verdicts must not touch the table");
}

#[tokio::test]
async fn failures_below_the_threshold_only_rearm() {
    let mut settings = GlobalSettings::default();
    settings.failurecount = 3;
    let mut h = setup(settings).await;
    h.runtime.initialize();
    let (service, real) = pair(&h, 0);

    // Bring the real up first.
    h.runtime.handle_event(Event::CheckCompleted {
        service,
        real,
        outcome: CheckOutcome::Success,
    });
    h.driver.clear();

    for _ in 0..2 {
        let flow = h.runtime.handle_event(Event::CheckCompleted {
            service,
            real,
            outcome: CheckOutcome::Failure("connect refused".to_string()),
        });
        assert_eq!(flow, Flow::Continue);
    }
    assert!(h.driver.ops().is_empty());

    h.runtime.handle_event(Event::CheckCompleted {
        service,
        real,
        outcome: CheckOutcome::Failure("connect refused".to_string()),
    });
    assert_eq!(h.driver.argv_log(), vec!["-e -t 10.0.0.1:80 -r 10.0.1.1:80 -g -w 0"]);
}

#[tokio::test]
async fn outcomes_for_unknown_pairs_are_dropped() {
    let mut h = setup(GlobalSettings::default()).await;
    h.runtime.initialize();

    let stranger = real_server("192.0.2.1", 80);
    let flow = h.runtime.handle_event(Event::CheckCompleted {
        service: h.runtime.virtuals()[0].addr,
        real: stranger.addr,
        outcome: CheckOutcome::Success,
    });
    assert_eq!(flow, Flow::Continue);
    assert!(h.driver.ops().is_empty());
}

#[tokio::test]
async fn shutdown_discards_all_timers() {
    let mut h = setup(GlobalSettings::default()).await;
    h.runtime.initialize();
    let (service, real) = pair(&h, 0);
    h.runtime.handle_event(Event::CheckCompleted {
        service,
        real,
        outcome: CheckOutcome::Success,
    });
    assert!(h.runtime.executor.has_timers());

    h.runtime.shutdown();
    assert!(!h.runtime.executor.has_timers());
    h.clock.advance(Duration::from_secs(60));
    assert!(h.runtime.due_timers().is_empty());
}

mod config_watch {
    use super::*;
    use std::fs::OpenOptions;
    use std::time::SystemTime;

    const VALID: &str = "[web]\nhost = 10.0.0.9\nport = 80\nprotocol = tcp\nchecktype = connect\n";

    fn bump_mtime(path: &std::path::Path, forward: Duration) {
        let file = OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + forward).unwrap();
    }

    async fn watch_harness(content: &str) -> (Harness, std::path::PathBuf, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lvsd.conf");
        std::fs::write(&path, content).unwrap();

        let mut settings = GlobalSettings::default();
        settings.autoreload = true;
        settings.configfile = path.clone();
        let mut h = setup(settings).await;
        h.runtime.initialize();
        (h, path, dir)
    }

    #[tokio::test]
    async fn unchanged_file_rearms_the_watch() {
        let (mut h, _path, _dir) = watch_harness(VALID).await;
        assert!(h.runtime.executor.is_armed(&TimerId::ConfigWatch));

        h.clock.advance(CONFIG_CHECK_PERIOD);
        assert!(h.runtime.due_timers().contains(&TimerId::ConfigWatch));

        let flow = h.runtime.handle_event(Event::TimerFired { id: TimerId::ConfigWatch });
        assert_eq!(flow, Flow::Continue);
        assert!(h.runtime.executor.is_armed(&TimerId::ConfigWatch));
    }

    #[tokio::test]
    async fn changed_file_requests_a_reload() {
        let (mut h, path, _dir) = watch_harness(VALID).await;
        bump_mtime(&path, Duration::from_secs(30));

        h.clock.advance(CONFIG_CHECK_PERIOD);
        h.runtime.due_timers();
        let flow = h.runtime.handle_event(Event::TimerFired { id: TimerId::ConfigWatch });
        assert_eq!(flow, Flow::Reload);
    }

    #[tokio::test]
    async fn unparseable_change_is_ignored() {
        let (mut h, path, _dir) = watch_harness(VALID).await;
        std::fs::write(&path, "[web]\nport = not-a-port\n").unwrap();
        bump_mtime(&path, Duration::from_secs(30));

        h.clock.advance(CONFIG_CHECK_PERIOD);
        h.runtime.due_timers();
        let flow = h.runtime.handle_event(Event::TimerFired { id: TimerId::ConfigWatch });
        assert_eq!(flow, Flow::Continue);
        assert!(h.runtime.executor.is_armed(&TimerId::ConfigWatch), "watch survives a bad file");
    }
}
