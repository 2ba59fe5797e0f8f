// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests exchanged between runtimes.

use crate::mode::Mode;
use rill_core::{ContextSpec, NodeName, PortName, Tag, WorkerId, WorkflowRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-node link table in wire form: out-port → `(downstream node index,
/// in-port index)` pairs. Downstream contexts are referenced by index into
/// the workflow's published context list.
pub type LinksSpec = Vec<(PortName, Vec<(usize, usize)>)>;

/// Payload of a constant-store publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum StorePayload {
    /// `deploy` results, indexed by node.
    Deployments { deployments: Vec<Value> },
    /// Node-scoped contexts, indexed by node.
    Contexts { contexts: Vec<ContextSpec> },
    /// Link tables, indexed by node. Requires contexts to be published
    /// first.
    Links { links: Vec<LinksSpec> },
}

/// Request from one runtime to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Probe a runtime's identity without joining.
    Beacon,

    /// Handshake: the caller asks to be accepted as a member.
    Hello {
        node: NodeName,
        mode: Mode,
        version: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tags: Vec<Tag>,
    },

    /// Membership removal (rollback or orderly leave).
    Goodbye { node: NodeName },

    /// Publish a constant-store entry for a workflow.
    StorePut { workflow: WorkflowRef, payload: StorePayload },

    /// Create the supervision tree for a workflow: one worker supervisor
    /// per node index.
    SpawnNodeSup { workflow: WorkflowRef, nodes: usize },

    /// Spawn a worker under the supervisor of `(workflow, node_index)`.
    CreateWorker {
        workflow: WorkflowRef,
        node_index: usize,
        context: ContextSpec,
        state: Value,
        tag: Tag,
    },

    /// Release the deploy barrier: initialising workers flip to ready.
    DeployComplete { workflow: WorkflowRef },

    /// Tear down a workflow's supervisors and store entries.
    StopWorkflow { workflow: WorkflowRef },

    /// Route a value to a worker mailbox.
    WorkerSend {
        worker: WorkerId,
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invocation: Option<Value>,
    },

    /// Orderly worker stop.
    WorkerStop { worker: WorkerId },

    /// Runtime status snapshot.
    Status,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
