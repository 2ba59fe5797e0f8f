// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Config file path: `RILL_CONFIG` or `./rilld.toml`.
pub fn config_path() -> PathBuf {
    std::env::var("RILL_CONFIG").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("rilld.toml"))
}

/// Runtime mode override.
pub fn mode() -> Option<String> {
    std::env::var("RILL_MODE").ok().filter(|s| !s.is_empty())
}

/// Node name override.
pub fn name() -> Option<String> {
    std::env::var("RILL_NAME").ok().filter(|s| !s.is_empty())
}

/// TCP bind address override.
pub fn listen() -> Option<String> {
    std::env::var("RILL_LISTEN").ok().filter(|s| !s.is_empty())
}

/// Master node override for worker mode.
pub fn master() -> Option<String> {
    std::env::var("RILL_MASTER").ok().filter(|s| !s.is_empty())
}

/// Log directory; when set, logs also go to a rolling file.
pub fn log_dir() -> Option<PathBuf> {
    std::env::var("RILL_LOG_DIR").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}
