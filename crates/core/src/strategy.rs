// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The strategy contract.
//!
//! A strategy decides how an operation is distributed: `deploy` runs once
//! per node at deploy time and may spawn workers, `deliver` runs whenever an
//! upstream value arrives for the node, and `process` runs inside a worker
//! for each mailbox message. `deliver` and `process` are synchronous and
//! must not block; `deploy` may await cluster RPCs.

use crate::context::Context;
use crate::emit::{Emit, EmitWithInvocation};
use crate::node::{NodeName, Tag, WorkerRef};
use crate::operation::{OperationError, StateInit};
use crate::port::PortIndex;
use crate::registry::RegistryError;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Partial record returned by `process`. Absent fields mean "no change" /
/// "nothing to emit".
#[derive(Debug, Default)]
pub struct ProcessResult {
    /// Replacement worker state.
    pub state: Option<Value>,
    /// Values to route downstream with the current invocation.
    pub emit: Option<Emit>,
    /// Values to route downstream with per-value invocations.
    pub emit_invocation: Option<EmitWithInvocation>,
}

impl ProcessResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn emit(emit: Emit) -> Self {
        Self { emit: Some(emit), ..Self::default() }
    }

    pub fn state(state: Value) -> Self {
        Self { state: Some(state), ..Self::default() }
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }
}

/// Errors raised by strategy hooks and the services they call.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// `emit` is forbidden while a workflow is still deploying.
    #[error("emit during deploy of node {node}")]
    EmitDuringDeploy { node: usize },

    /// A callback returned a state without `writes_state` permission.
    #[error("callback {callback} of {operation} returned state without writes_state")]
    StateNotAllowed { operation: String, callback: String },

    /// A callback emitted without `emits` permission.
    #[error("callback {callback} of {operation} emitted without emits")]
    EmitNotAllowed { operation: String, callback: String },

    /// A hook needed `ctx.deployment` before the deploy barrier released.
    #[error("deployment not resolved for node {node}")]
    MissingDeployment { node: usize },

    /// Placement could not produce a node.
    #[error("no node satisfies placement {placement}")]
    Placement { placement: String },

    /// No supervisor for the node on this runtime; the workflow is not
    /// (or no longer) set up here.
    #[error("no supervisor for node {node} of {workflow}")]
    NoSupervisor { workflow: String, node: usize },

    /// `Placement::Local` on a master runtime.
    #[error("local placement invoked on the master")]
    LocalOnMaster,

    #[error("remote spawn on {node} failed: {reason}")]
    Remote { node: NodeName, reason: String },

    /// Malformed deployment value or message payload.
    #[error("strategy {strategy}: {reason}")]
    Malformed { strategy: String, reason: String },

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Worker placement policy for `create_remote`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Any worker node, picked uniformly.
    Any,
    /// Exactly that node.
    On(NodeName),
    /// Same node as an existing worker.
    With(WorkerRef),
    /// Uniformly among other nodes; falls back to any with a warning.
    Avoid(NodeName),
    /// Uniformly among nodes carrying the tag; falls back to any worker.
    Tagged(Tag),
    /// The current node. An error when invoked on the master.
    Local,
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::On(node) => write!(f, "on {node}"),
            Self::With(worker) => write!(f, "with {worker}"),
            Self::Avoid(node) => write!(f, "avoid {node}"),
            Self::Tagged(tag) => write!(f, "tagged {tag}"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Runtime services injected into every [`Context`].
///
/// This is the dependency-injection seam between strategy code and the
/// engine: spawning workers under the node's supervisor and routing values
/// to worker mailboxes, local or remote. `send` and `stop_worker` are
/// fire-and-forget so `deliver` never blocks.
#[async_trait]
pub trait StrategyServices: Send + Sync {
    fn local_node(&self) -> NodeName;

    /// Names of the current worker nodes, for strategies that spawn one
    /// worker per runtime.
    fn cluster_workers(&self) -> Vec<NodeName>;

    /// Spawn a worker on this runtime under the supervisor of the context's
    /// node.
    fn create_local(
        &self,
        ctx: &Context,
        state: StateInit,
        tag: Tag,
    ) -> Result<WorkerRef, StrategyError>;

    /// Spawn a worker on a node chosen by `placement`.
    async fn create_remote(
        &self,
        ctx: &Context,
        state: StateInit,
        tag: Tag,
        placement: Placement,
    ) -> Result<WorkerRef, StrategyError>;

    /// Route a value to a worker mailbox. Per-pair FIFO; fire-and-forget.
    fn send(&self, worker: &WorkerRef, value: Value, invocation: Option<Value>);

    /// Emit directly from a hook, for strategies that forward without
    /// workers. Forbidden during `deploy`.
    fn emit(&self, ctx: &Context, emit: Emit) -> Result<(), StrategyError>;

    /// Request an orderly worker stop.
    fn stop_worker(&self, worker: &WorkerRef);
}

/// The distributed behaviour of an operation.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Runs once per node at deploy time. The returned value becomes the
    /// node's immutable `deployment`, visible to every later hook.
    async fn deploy(&self, ctx: &Context) -> Result<Value, StrategyError>;

    /// Runs when an upstream value arrives for this node. Must not block:
    /// forward to a worker or compute in constant time.
    fn deliver(&self, ctx: &Context, value: Value, port: PortIndex) -> Result<(), StrategyError>;

    /// Runs inside a worker for each mailbox message.
    fn process(
        &self,
        ctx: &Context,
        message: Value,
        state: Value,
        tag: &Tag,
    ) -> Result<ProcessResult, StrategyError>;
}
