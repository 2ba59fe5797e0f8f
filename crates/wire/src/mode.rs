// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role a runtime plays in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Coordinates the cluster; holds authoritative membership. One per
    /// application.
    Master,
    /// Hosts workers; authenticates a single master.
    Worker,
    /// Master and worker in one process, no distribution.
    Local,
    /// Like local, but accepts any peer. Used by test harnesses.
    Test,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Worker => "worker",
            Self::Local => "local",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(Self::Master),
            "worker" => Ok(Self::Worker),
            "local" => Ok(Self::Local),
            "test" => Ok(Self::Test),
            other => Err(format!("unknown mode {other:?}")),
        }
    }
}
