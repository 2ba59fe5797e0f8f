// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime-level errors.

use rill_core::{StrategyError, WorkerId, WorkflowRef};
use rill_wire::Mode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("workflow {0} is not deployed here")]
    UnknownWorkflow(WorkflowRef),

    #[error("workflow {workflow} has no node {node}")]
    UnknownNode { workflow: WorkflowRef, node: usize },

    #[error("no worker {0} on this runtime")]
    UnknownWorker(WorkerId),

    #[error("operation not permitted in mode {0}")]
    WrongMode(Mode),

    #[error(transparent)]
    Strategy(#[from] StrategyError),
}
