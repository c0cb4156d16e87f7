// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn acquire_writes_our_pid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lvsd.test.pid");

    let pidfile = PidFile::acquire(&path).unwrap();
    assert_eq!(pidfile.path(), path);
    assert_eq!(read_pid(&path), Some(std::process::id() as i32));
}

#[test]
fn second_acquire_fails_while_held() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lvsd.test.pid");

    let _held = PidFile::acquire(&path).unwrap();
    let err = PidFile::acquire(&path).unwrap_err();
    assert!(matches!(err, PidFileError::AlreadyRunning { pid: Some(_) }), "{err}");
}

#[test]
fn drop_releases_and_removes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lvsd.test.pid");

    drop(PidFile::acquire(&path).unwrap());
    assert!(!path.exists());
    let _reacquired = PidFile::acquire(&path).unwrap();
}

#[test]
fn pid_path_is_derived_from_the_config_basename() {
    let path = pid_path(Path::new("/run"), Path::new("/etc/lvsd/production.conf"));
    assert_eq!(path, PathBuf::from("/run/lvsd.production.conf.pid"));
}

#[test]
fn read_pid_handles_missing_and_garbage_files() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(read_pid(&dir.path().join("absent.pid")), None);

    let garbage = dir.path().join("garbage.pid");
    std::fs::write(&garbage, "not a pid\n").unwrap();
    assert_eq!(read_pid(&garbage), None);
}
