// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rilld: boot a rill runtime from `rilld.toml` and serve until
//! interrupted.

use rill_daemon::{boot::Daemon, config::Config, env};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let path = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(env::config_path);

    let config = match Config::load(&path).map(Config::with_env_overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("rilld: {e}");
            return ExitCode::from(2);
        }
    };

    init_tracing(config.telemetry);

    let handle = match Daemon::new().boot(config).await {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "boot failed");
            return ExitCode::FAILURE;
        }
    };

    if tokio::signal::ctrl_c().await.is_err() {
        error!("signal handler unavailable");
        return ExitCode::FAILURE;
    }
    handle.shutdown();
    ExitCode::SUCCESS
}

/// Console logging via `RUST_LOG`, plus a rolling file when `RILL_LOG_DIR`
/// is set. With telemetry off only warnings surface.
fn init_tracing(telemetry: bool) {
    let default = if telemetry { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));

    match env::log_dir() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "rilld.log");
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(appender).init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
