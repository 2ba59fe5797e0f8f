// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rill-core: data model and contracts for the rill runtime.
//!
//! Everything the engine, the cluster layer, and user code agree on lives
//! here: port and node identifiers, the workflow graph and its flattened
//! form, the `Operation` and `Strategy` contracts, the `Context` threaded
//! through every strategy hook, and the registry that resolves
//! operation/strategy names into implementations.

pub mod clock;
pub mod context;
pub mod emit;
pub mod id;
pub mod node;
pub mod operation;
pub mod port;
pub mod registry;
pub mod strategy;
pub mod workflow;

pub use clock::{Clock, FakeClock, SystemClock};
pub use context::{Context, ContextSpec, Scope};
pub use emit::{Emit, EmitWithInvocation, ValueSeq};
pub use id::{WorkerId, WorkflowRef};
pub use node::{NodeName, Tag, WorkerRef};
pub use operation::{
    checked_call, CallbackInfo, CallbackResult, Operation, OperationError, StateInit,
};
pub use port::{PortIndex, PortName};
pub use registry::{Registry, RegistryError};
pub use strategy::{Placement, ProcessResult, Strategy, StrategyError, StrategyServices};
pub use workflow::{FlatNode, FlatWorkflow, Link, Workflow, WorkflowError, WorkflowNode};
