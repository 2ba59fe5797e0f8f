// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker actors.
//!
//! A worker is a tokio task owning one operation instance's state and an
//! unbounded mailbox. It starts **initialising**: user values queue up
//! until the deploy barrier releases, at which point the worker resolves
//! its node's deployment into its context, forces its initial state, and
//! drains the queue. In the **ready** state each value runs the strategy's
//! `process` hook; emits hand off to the router. An error from `process`
//! crashes the worker and its supervisor restarts it with the initial
//! state.

use crate::router;
use crate::services::RuntimeCore;
use crate::supervisor::{ChildEvent, WorkerSpec};
use rill_core::{Context, Strategy, StrategyError, Tag, WorkerId};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, trace};

/// Mailbox messages.
#[derive(Debug)]
pub enum WorkerMsg {
    /// A user value, with optional invocation metadata.
    Value { value: Value, invocation: Option<Value> },
    /// Deploy barrier release.
    DeployComplete,
    /// Orderly shutdown.
    Stop,
}

/// Reports the worker's end of life to its supervisor, including on panic
/// unwinds, so a crash is never silent.
struct ExitGuard {
    events: UnboundedSender<ChildEvent>,
    worker: WorkerId,
    crashed: bool,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let _ = self.events.send(ChildEvent::Exited { worker: self.worker, crashed: self.crashed });
    }
}

pub(crate) fn spawn(
    core: Weak<RuntimeCore>,
    events: UnboundedSender<ChildEvent>,
    worker: WorkerId,
    spec: WorkerSpec,
    rx: UnboundedReceiver<WorkerMsg>,
) {
    tokio::spawn(async move {
        let mut guard = ExitGuard { events, worker, crashed: true };
        let crashed = run(core, worker, spec, rx).await;
        guard.crashed = crashed;
    });
}

/// Worker body. Returns whether the worker crashed.
async fn run(
    core: Weak<RuntimeCore>,
    worker: WorkerId,
    spec: WorkerSpec,
    mut rx: UnboundedReceiver<WorkerMsg>,
) -> bool {
    let mut pending: VecDeque<(Value, Option<Value>)> = VecDeque::new();

    // Initialising: queue values until the barrier releases.
    let (ctx, mut state) = loop {
        match rx.recv().await {
            None | Some(WorkerMsg::Stop) => return false,
            Some(WorkerMsg::Value { value, invocation }) => {
                pending.push_back((value, invocation));
            }
            Some(WorkerMsg::DeployComplete) => {
                let Some(core) = core.upgrade() else { return false };
                let scope = spec.ctx.scope;
                let Some(deployment) =
                    core.store().deployment(scope.workflow(), scope.node_index())
                else {
                    error!(%worker, workflow = %scope.workflow(), "barrier released before deployment publish");
                    return true;
                };
                let ctx = spec.ctx.clone().with_deployment(deployment);
                let state = spec.init.resolve();
                break (ctx, state);
            }
        }
    };
    debug!(%worker, node = ctx.scope.node_index(), tag = %spec.tag, "worker ready");

    // Drain values queued during initialisation, in arrival order.
    while let Some((value, invocation)) = pending.pop_front() {
        if let Err(e) = handle(&core, &ctx, &mut state, &spec.tag, value, invocation) {
            error!(%worker, error = %e, "worker crashed");
            return true;
        }
    }

    // Ready.
    while let Some(msg) = rx.recv().await {
        match msg {
            WorkerMsg::Stop => return false,
            WorkerMsg::DeployComplete => {} // replayed barrier, ignore
            WorkerMsg::Value { value, invocation } => {
                if let Err(e) = handle(&core, &ctx, &mut state, &spec.tag, value, invocation) {
                    error!(%worker, error = %e, "worker crashed");
                    return true;
                }
            }
        }
    }
    false
}

fn handle(
    core: &Weak<RuntimeCore>,
    ctx: &Context,
    state: &mut Value,
    tag: &Tag,
    value: Value,
    invocation: Option<Value>,
) -> Result<(), StrategyError> {
    let Some(core) = core.upgrade() else { return Ok(()) };
    let ctx = ctx.with_invocation(invocation);
    trace!(node = ctx.scope.node_index(), "processing value");

    let strategy = Arc::clone(&ctx.strategy);
    let result = strategy.process(&ctx, value, state.clone(), tag)?;

    if let Some(next) = result.state {
        *state = next;
    }
    if let Some(emit) = result.emit {
        router::route(&core, &ctx, emit)?;
    }
    if let Some(emit) = result.emit_invocation {
        router::route_with_invocations(&core, &ctx, emit)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
