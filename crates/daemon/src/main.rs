// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lvsd — health-monitoring controller for the kernel IPVS table.
//!
//! One binary provides the CLI actions and the daemon. `start` forks a
//! detached `run` instance (or stays in the foreground with `--debug` or
//! `supervised`); `stop`, `restart`, `reload`, and `status` act on the
//! running daemon through its PID file.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use lvsd_core::{Event, SystemClock, VirtualService};
use lvsd_daemon::pidfile::{pid_path, read_pid, PidFile};
use lvsd_daemon::runtime::Flow;
use lvsd_daemon::{cleanup, env, initial_reset, Executor, IpvsDriver, ProbeCheckAdapter, Runtime};
use lvsd_probes::ProbeRegistry;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::info;

/// Exit code for an unknown or missing action.
const EXIT_USAGE: u8 = 4;

const ACTIONS: &str = "start|stop|restart|reload|status";

#[derive(Parser)]
#[command(
    name = "lvsd",
    version,
    about = "Health-monitoring controller for the kernel IPVS virtual-server table"
)]
struct Cli {
    /// Stay in the foreground and log debug output to stderr
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Configuration file
    #[arg(
        short = 'f',
        long = "file",
        value_name = "CONFIG",
        default_value = "/etc/lvsd/lvsd.conf"
    )]
    file: PathBuf,

    /// One of: start | stop | restart | reload | status
    #[arg(value_name = "ACTION")]
    action: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("lvsd: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn dispatch(cli: Cli) -> Result<u8> {
    match cli.action.as_deref() {
        Some("start") => start(cli.debug, &cli.file).await,
        Some("stop") => stop(&cli.file),
        Some("restart") => restart(cli.debug, &cli.file).await,
        Some("reload") => reload(&cli.file),
        Some("status") => status(&cli.file),
        // Internal: foreground daemon entry used by the detached start.
        Some("run") => run_daemon(cli.debug, cli.file).await,
        Some(other) => {
            eprintln!("lvsd: unknown action '{other}' (expected {ACTIONS})");
            Ok(EXIT_USAGE)
        }
        None => {
            eprintln!("lvsd: missing action (expected {ACTIONS})");
            Ok(EXIT_USAGE)
        }
    }
}

async fn start(debug: bool, file: &Path) -> Result<u8> {
    // Sanity first so misconfiguration is reported on the caller's tty.
    sanity_checks()?;
    let (settings, _) = lvsd_config::parse_file(file).map_err(|e| anyhow!("{e}"))?;

    if let Some(pid) = running_pid(file) {
        println!("lvsd is already running (pid {pid})");
        return Ok(0);
    }

    if debug || settings.supervised {
        return run_daemon(debug, file.to_path_buf()).await;
    }

    // Detach: re-exec ourselves as the daemon process.
    let exe = std::env::current_exe().context("cannot determine own executable")?;
    std::process::Command::new(exe)
        .arg("-f")
        .arg(file)
        .arg("run")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("failed to spawn daemon process")?;
    println!("Starting lvsd");
    Ok(0)
}

fn stop(file: &Path) -> Result<u8> {
    match running_pid(file) {
        Some(pid) => {
            kill(Pid::from_raw(pid), Signal::SIGTERM).context("failed to signal daemon")?;
            println!("Stopping lvsd (pid {pid})");
            Ok(0)
        }
        None => {
            println!("lvsd is not running");
            Ok(0)
        }
    }
}

async fn restart(debug: bool, file: &Path) -> Result<u8> {
    if let Some(pid) = running_pid(file) {
        kill(Pid::from_raw(pid), Signal::SIGTERM).context("failed to signal daemon")?;
        wait_for_exit(pid).await;
    }
    start(debug, file).await
}

fn reload(file: &Path) -> Result<u8> {
    match running_pid(file) {
        Some(pid) => {
            kill(Pid::from_raw(pid), Signal::SIGHUP).context("failed to signal daemon")?;
            println!("Reloading lvsd (pid {pid})");
            Ok(0)
        }
        None => {
            eprintln!("lvsd: not running");
            Ok(1)
        }
    }
}

fn status(file: &Path) -> Result<u8> {
    match running_pid(file) {
        Some(pid) => println!("lvsd is running (pid {pid})"),
        None => println!("lvsd is not running"),
    }
    Ok(0)
}

/// PID from the pid file, filtered to processes that are actually alive.
/// EPERM means the process exists but belongs to someone else, which still
/// counts as running.
fn running_pid(file: &Path) -> Option<i32> {
    let pid = read_pid(&pid_path(Path::new(env::RUN_DIR), file))?;
    match kill(Pid::from_raw(pid), None) {
        Ok(()) | Err(nix::errno::Errno::EPERM) => Some(pid),
        Err(_) => None,
    }
}

async fn wait_for_exit(pid: i32) {
    for _ in 0..100 {
        if kill(Pid::from_raw(pid), None).is_err() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

fn sanity_checks() -> Result<PathBuf> {
    let tool = env::find_tool()
        .ok_or_else(|| anyhow!("'ipvsadm' not found (looked in /sbin, /usr/sbin, and PATH)"))?;
    if !env::is_privileged() {
        bail!("must be run as root to manage the IPVS table");
    }
    Ok(tool)
}

/// The daemon proper: parse, reset, and run instances until shutdown.
/// Hot-reload tears the instance down and starts over with the new file.
async fn run_daemon(debug: bool, config_path: PathBuf) -> Result<u8> {
    let tool = sanity_checks()?;
    let (mut settings, mut virtuals) =
        lvsd_config::parse_file(&config_path).map_err(|e| anyhow!("{e}"))?;
    let registry = Arc::new(ProbeRegistry::builtin());
    validate_services(&virtuals, &registry)?;

    let _log_guard = setup_logging(debug, &settings.logfile)?;
    let _pidfile = PidFile::acquire(&pid_path(Path::new(env::RUN_DIR), &config_path))
        .map_err(|e| anyhow!("{e}"))?;

    let mut signals = Signals::new()?;
    info!(version = env!("CARGO_PKG_VERSION"), config = %config_path.display(), "starting lvsd");

    loop {
        let driver = IpvsDriver::new(tool.clone());
        initial_reset(&driver, &mut virtuals, &settings).await?;

        let (events_tx, mut events_rx) = mpsc::channel::<Event>(256);
        let executor = Executor::new(
            driver.clone(),
            ProbeCheckAdapter::new(Arc::clone(&registry)),
            SystemClock,
            events_tx,
        );
        let mut runtime = Runtime::new(executor, settings.clone(), virtuals);
        runtime.initialize();

        let reason = run_instance(&mut runtime, &mut events_rx, &mut signals).await;
        runtime.shutdown();
        virtuals = runtime.into_virtuals();
        cleanup(&driver, &mut virtuals, &settings).await;

        match reason {
            ExitReason::Shutdown => break,
            ExitReason::Reload => {
                info!("reloading configuration");
                match lvsd_config::parse_file(&config_path) {
                    Ok((new_settings, new_virtuals)) => {
                        if let Err(e) = validate_services(&new_virtuals, &registry) {
                            tracing::error!(error = %e, "reloaded configuration is invalid, keeping the previous one");
                        } else {
                            settings = new_settings;
                            virtuals = new_virtuals;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "reload failed, keeping the previous configuration")
                    }
                }
            }
        }
    }

    info!("lvsd stopped");
    Ok(0)
}

/// Reject `service` names with no registered probe at startup rather than
/// on the first check.
fn validate_services(virtuals: &[VirtualService], registry: &ProbeRegistry) -> Result<()> {
    for virtual_service in virtuals {
        if virtual_service.checktype == lvsd_core::CheckType::Negotiate {
            if let Some(service) = virtual_service.service.as_deref() {
                if registry.get(service).is_none() {
                    bail!(
                        "section for {}: unknown service '{}' (available: {})",
                        virtual_service.addr,
                        service,
                        registry.names().join(", ")
                    );
                }
            }
        }
    }
    Ok(())
}

enum ExitReason {
    Shutdown,
    Reload,
}

struct Signals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
    sighup: tokio::signal::unix::Signal,
}

impl Signals {
    fn new() -> Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
            sighup: signal(SignalKind::hangup())?,
        })
    }
}

/// The event loop for one configuration instance.
async fn run_instance(
    runtime: &mut Runtime<IpvsDriver, ProbeCheckAdapter, SystemClock>,
    events: &mut mpsc::Receiver<Event>,
    signals: &mut Signals,
) -> ExitReason {
    // Timer resolution. Created outside the loop: select! re-evaluates its
    // branches each iteration, and a sleep() would reset on every event.
    let mut tick = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            maybe = events.recv() => {
                match maybe {
                    Some(event) => {
                        if runtime.handle_event(event) == Flow::Reload {
                            return ExitReason::Reload;
                        }
                    }
                    None => return ExitReason::Shutdown,
                }
            }

            _ = signals.sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                return ExitReason::Shutdown;
            }

            _ = signals.sigint.recv() => {
                info!("received SIGINT, shutting down");
                return ExitReason::Shutdown;
            }

            _ = signals.sighup.recv() => {
                info!("received SIGHUP, reloading");
                return ExitReason::Reload;
            }

            _ = tick.tick() => {
                for id in runtime.due_timers() {
                    if runtime.handle_event(Event::TimerFired { id }) == Flow::Reload {
                        return ExitReason::Reload;
                    }
                }
            }
        }
    }
}

fn setup_logging(
    debug: bool,
    logfile: &Path,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if debug {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    }

    let dir = logfile.parent().unwrap_or_else(|| Path::new("."));
    let name = logfile.file_name().unwrap_or_else(|| std::ffi::OsStr::new("lvsd.log"));
    std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();
    Ok(Some(guard))
}
