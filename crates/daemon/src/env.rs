// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment sanity checks performed before the daemon starts.

use std::path::{Path, PathBuf};

/// Directory for PID files.
pub const RUN_DIR: &str = "/run";

/// Well-known locations of the `ipvsadm` binary, tried before `PATH`.
const TOOL_CANDIDATES: &[&str] = &["/sbin/ipvsadm", "/usr/sbin/ipvsadm"];

/// Locate the external table-management tool.
pub fn find_tool() -> Option<PathBuf> {
    for candidate in TOOL_CANDIDATES {
        let path = Path::new(candidate);
        if path.is_file() {
            return Some(path.to_path_buf());
        }
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).map(|dir| dir.join("ipvsadm")).find(|p| p.is_file())
}

/// Manipulating the kernel table requires root.
pub fn is_privileged() -> bool {
    nix::unistd::geteuid().is_root()
}
