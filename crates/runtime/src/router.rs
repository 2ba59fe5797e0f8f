// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Emit routing.
//!
//! Maps an emit map produced at node `(workflow, idx)` onto the node's
//! pre-built link table and invokes the downstream strategies' `deliver`
//! hooks. Stateless and re-entrant. Values emitted on a port with no
//! outgoing link are dropped: sinks whose only effect is a side-effectful
//! `process` are legal. Emitting from deploy scope is a contract
//! violation.

use crate::services::RuntimeCore;
use rill_core::{Context, Emit, EmitWithInvocation, Strategy, StrategyError};
use std::sync::Arc;
use tracing::trace;

/// Route a plain emit map. Every value inherits the emitting context's
/// invocation.
pub(crate) fn route(
    core: &Arc<RuntimeCore>,
    ctx: &Context,
    emit: Emit,
) -> Result<(), StrategyError> {
    let scope = ctx.scope;
    if scope.is_deploy() {
        return Err(StrategyError::EmitDuringDeploy { node: scope.node_index() });
    }
    let Some(tables) = core.store().links(scope.workflow()) else {
        // Workflow already torn down; nothing downstream to reach.
        return Ok(());
    };
    let Some(table) = tables.get(scope.node_index()) else { return Ok(()) };

    for (port, seq) in emit.into_entries() {
        let Some(dsts) = table.get(&port) else {
            trace!(%port, "no link, dropping");
            continue;
        };
        for value in seq {
            deliver_all(dsts, value, ctx.invocation.clone())?;
        }
    }
    Ok(())
}

/// Route an emit map whose values carry their own invocations.
pub(crate) fn route_with_invocations(
    core: &Arc<RuntimeCore>,
    ctx: &Context,
    emit: EmitWithInvocation,
) -> Result<(), StrategyError> {
    let scope = ctx.scope;
    if scope.is_deploy() {
        return Err(StrategyError::EmitDuringDeploy { node: scope.node_index() });
    }
    let Some(tables) = core.store().links(scope.workflow()) else { return Ok(()) };
    let Some(table) = tables.get(scope.node_index()) else { return Ok(()) };

    for (port, values) in emit.into_entries() {
        let Some(dsts) = table.get(&port) else { continue };
        for (value, invocation) in values {
            deliver_all(dsts, value, invocation)?;
        }
    }
    Ok(())
}

fn deliver_all(
    dsts: &[(Context, usize)],
    value: serde_json::Value,
    invocation: Option<serde_json::Value>,
) -> Result<(), StrategyError> {
    for (downstream, in_port) in dsts {
        let downstream = downstream.with_invocation(invocation.clone());
        let strategy = Arc::clone(&downstream.strategy);
        strategy.deliver(&downstream, value.clone(), *in_port)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
