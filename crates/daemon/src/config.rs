// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Read from a TOML file (default `rilld.toml`), then overridden by
//! `RILL_*` environment variables. Unknown keys are rejected so typos
//! fail loudly at boot instead of silently running a misconfigured node.

use crate::env;
use rill_wire::Mode;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("invalid mode: {0}")]
    Mode(String),

    #[error("worker mode requires a master address")]
    MissingMaster,

    #[error("distributed mode {0} requires a node name with an address (name@host:port)")]
    MissingName(Mode),
}

/// `rilld.toml` contents.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Runtime role.
    #[serde(default = "default_mode")]
    pub mode: String,
    /// This node's name, `short@host:port` in distributed modes.
    #[serde(default)]
    pub name: Option<String>,
    /// TCP bind address for the protocol listener.
    #[serde(default)]
    pub listen: Option<String>,
    /// Bootstrap peer list for a master.
    #[serde(default)]
    pub workers: Vec<String>,
    /// Bootstrap target for a worker.
    #[serde(default)]
    pub master: Option<String>,
    /// Self-tags advertised to the master.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Enable instrumentation events.
    #[serde(default = "default_telemetry")]
    pub telemetry: bool,
    /// Name of a registered workflow to deploy at boot (master/local).
    #[serde(default)]
    pub deploy: Option<String>,
}

fn default_mode() -> String {
    "local".to_string()
}

fn default_telemetry() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            name: None,
            listen: None,
            workers: Vec::new(),
            master: None,
            tags: Vec::new(),
            telemetry: default_telemetry(),
            deploy: None,
        }
    }
}

impl Config {
    /// Load from a TOML file. A missing file yields the defaults, so a
    /// bare `rilld` boots a local runtime.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_str(&text)
    }

    /// Apply `RILL_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(mode) = env::mode() {
            self.mode = mode;
        }
        if let Some(name) = env::name() {
            self.name = Some(name);
        }
        if let Some(listen) = env::listen() {
            self.listen = Some(listen);
        }
        if let Some(master) = env::master() {
            self.master = Some(master);
        }
        self
    }

    pub fn mode(&self) -> Result<Mode, ConfigError> {
        Mode::from_str(&self.mode).map_err(ConfigError::Mode)
    }

    /// Cross-field checks that depend on the mode.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mode = self.mode()?;
        match mode {
            Mode::Worker => {
                if self.master.is_none() {
                    return Err(ConfigError::MissingMaster);
                }
                self.require_addressed_name(mode)
            }
            Mode::Master => self.require_addressed_name(mode),
            Mode::Local | Mode::Test => Ok(()),
        }
    }

    fn require_addressed_name(&self, mode: Mode) -> Result<(), ConfigError> {
        let named = self
            .name
            .as_deref()
            .map(|n| rill_core::NodeName::new(n).addr().is_some())
            .unwrap_or(false);
        if named {
            Ok(())
        } else {
            Err(ConfigError::MissingName(mode))
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
