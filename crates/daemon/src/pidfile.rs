// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PID file handling.
//!
//! The daemon holds an exclusive lock on the PID file for its lifetime, so
//! a stale file from a crashed process never blocks a restart.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PidFileError {
    #[error("another instance is already running{}", pid.map(|p| format!(" (pid {p})")).unwrap_or_default())]
    AlreadyRunning { pid: Option<i32> },

    #[error("cannot write pid file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Path of the PID file for a given configuration file:
/// `<run_dir>/lvsd.<basename>.pid`.
pub fn pid_path(run_dir: &Path, configfile: &Path) -> PathBuf {
    let basename = configfile
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lvsd.conf".to_string());
    run_dir.join(format!("lvsd.{basename}.pid"))
}

/// Read the PID recorded in a pid file, if any.
pub fn read_pid(path: &Path) -> Option<i32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// An acquired, locked PID file. Dropping it releases the lock and removes
/// the file.
#[derive(Debug)]
pub struct PidFile {
    file: File,
    path: PathBuf,
}

impl PidFile {
    pub fn acquire(path: &Path) -> Result<Self, PidFileError> {
        let io = |source| PidFileError::Io { path: path.to_path_buf(), source };

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(io)?;

        if file.try_lock_exclusive().is_err() {
            return Err(PidFileError::AlreadyRunning { pid: read_pid(path) });
        }

        let mut pidfile = Self { file, path: path.to_path_buf() };
        pidfile.file.set_len(0).map_err(io)?;
        writeln!(pidfile.file, "{}", std::process::id()).map_err(io)?;
        pidfile.file.flush().map_err(io)?;
        Ok(pidfile)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
