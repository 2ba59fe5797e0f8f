// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Responses exchanged between runtimes.

use crate::mode::Mode;
use rill_core::{NodeName, WorkerId, WorkflowRef};
use serde::{Deserialize, Serialize};

/// Status snapshot of a runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub node: NodeName,
    pub mode: Mode,
    pub workflows: Vec<WorkflowRef>,
    pub workers: usize,
}

/// Response to a [`Request`].
///
/// [`Request`]: crate::request::Request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Ok,

    Beacon {
        mode: Mode,
        version: String,
        /// Versions this runtime will interoperate with.
        compatible: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tags: Vec<rill_core::Tag>,
    },

    /// Result of `CreateWorker`. The caller pairs it with the node it
    /// called to form a `WorkerRef`.
    Worker { worker: WorkerId },

    Status { status: StatusReport },

    Error { reason: String },
}

impl Response {
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error { reason: reason.into() }
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }
}
