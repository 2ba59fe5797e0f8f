// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow deployment.
//!
//! Deploy order: flatten and validate, create supervisors on every
//! runtime, run each node's `deploy` hook, publish deployments, node
//! contexts and link tables everywhere, then release the barrier. Any
//! failure unwinds by stopping the workflow on every runtime that might
//! have received state; the teardown is idempotent so partial progress
//! never leaks.

use crate::services::RuntimeCore;
use rill_core::{
    Context, NodeName, PortName, Registry, RegistryError, Scope, StrategyError, WorkflowError,
    WorkflowRef,
};
use rill_core::{FlatWorkflow, Operation, Strategy, Workflow};
use rill_cluster::RpcError;
use rill_wire::{LinksSpec, Request, Response, StorePayload};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("node {node} has no strategy and its operation declares no default")]
    MissingStrategy { node: String },

    #[error("node {node} links from unknown out-port {port}")]
    UnknownOutPort { node: String, port: PortName },

    #[error("node {node} links to {target}, which has no in-port {port}")]
    UnknownInPort { node: String, target: String, port: PortName },

    #[error("deploy of node {node} failed: {source}")]
    Strategy { node: String, source: StrategyError },

    #[error("runtime {node} failed during deploy: {reason}")]
    Rpc { node: NodeName, reason: String },

    #[error("deploy not permitted in mode {0}")]
    WrongMode(rill_wire::Mode),

    #[error("{0}")]
    Internal(String),
}

struct ResolvedNode {
    name: String,
    operation: Arc<dyn Operation>,
    strategy: Arc<dyn Strategy>,
    args: Value,
    links: LinksSpec,
}

/// Resolve operations and strategies and rewrite links to port indices.
/// All static validation happens here, before anything is spawned.
fn resolve(registry: &Registry, flat: &FlatWorkflow) -> Result<Vec<ResolvedNode>, DeployError> {
    let mut operations = Vec::with_capacity(flat.len());
    for node in &flat.nodes {
        operations.push(registry.operation(&node.operation)?);
    }

    let mut resolved = Vec::with_capacity(flat.len());
    for (i, node) in flat.nodes.iter().enumerate() {
        let operation = Arc::clone(&operations[i]);
        let strategy_name = node
            .strategy
            .as_deref()
            .or_else(|| operation.default_strategy())
            .ok_or_else(|| DeployError::MissingStrategy { node: node.name.clone() })?;
        let strategy = registry.strategy(strategy_name)?;

        let mut links: LinksSpec = Vec::new();
        for (out_port, dsts) in &node.links {
            if operation.out_port_index(out_port).is_none() {
                return Err(DeployError::UnknownOutPort {
                    node: node.name.clone(),
                    port: out_port.clone(),
                });
            }
            let mut pairs = Vec::with_capacity(dsts.len());
            for (target, in_port) in dsts {
                let index = operations[*target].in_port_index(in_port).ok_or_else(|| {
                    DeployError::UnknownInPort {
                        node: node.name.clone(),
                        target: flat.nodes[*target].name.clone(),
                        port: in_port.clone(),
                    }
                })?;
                pairs.push((*target, index));
            }
            links.push((out_port.clone(), pairs));
        }

        resolved.push(ResolvedNode {
            name: node.name.clone(),
            operation,
            strategy,
            args: node.args.clone(),
            links,
        });
    }
    Ok(resolved)
}

/// Deploy a workflow across the current cluster. On success every runtime
/// holds the full deployment record and all workers are ready.
pub(crate) async fn deploy(
    core: &Arc<RuntimeCore>,
    workflow: &Workflow,
) -> Result<WorkflowRef, DeployError> {
    let flat = workflow.flatten()?;
    let resolved = resolve(core.registry(), &flat)?;
    let workflow_ref = WorkflowRef::new();
    let peers = core.cluster().workers();

    info!(workflow = %workflow.name, %workflow_ref, nodes = resolved.len(), "deploying");
    let result = deploy_inner(core, workflow_ref, &resolved, &peers).await;
    match result {
        Ok(()) => {
            info!(%workflow_ref, "deploy complete");
            Ok(workflow_ref)
        }
        Err(e) => {
            warn!(%workflow_ref, error = %e, "deploy failed, rolling back");
            rollback(core, workflow_ref, &peers).await;
            Err(e)
        }
    }
}

async fn deploy_inner(
    core: &Arc<RuntimeCore>,
    workflow_ref: WorkflowRef,
    resolved: &[ResolvedNode],
    peers: &[NodeName],
) -> Result<(), DeployError> {
    let k = resolved.len();

    // Supervision trees on every runtime, local first.
    core.spawn_node_sup(workflow_ref, k).map_err(DeployError::Internal)?;
    check_all(
        core.cluster()
            .on_many(peers, Request::SpawnNodeSup { workflow: workflow_ref, nodes: k })
            .await,
    )?;

    // Run the deploy hooks. Workers spawned here hold in initialising
    // until the barrier below.
    let services = core.services().ok_or_else(|| DeployError::Internal("shutting down".into()))?;
    let mut deployments = Vec::with_capacity(k);
    for (i, node) in resolved.iter().enumerate() {
        let ctx = Context::new(
            Arc::clone(&node.operation),
            Arc::clone(&node.strategy),
            node.args.clone(),
            Scope::Deploy { workflow: workflow_ref, node: i },
            Arc::clone(&services),
        );
        let deployment = node
            .strategy
            .deploy(&ctx)
            .await
            .map_err(|source| DeployError::Strategy { node: node.name.clone(), source })?;
        deployments.push(deployment);
    }

    // Publish deployments, node contexts, and link tables everywhere.
    put_everywhere(
        core,
        peers,
        workflow_ref,
        StorePayload::Deployments { deployments: deployments.clone() },
    )
    .await?;

    let contexts: Vec<Context> = resolved
        .iter()
        .enumerate()
        .map(|(i, node)| {
            Context::new(
                Arc::clone(&node.operation),
                Arc::clone(&node.strategy),
                node.args.clone(),
                Scope::Node { workflow: workflow_ref, node: i },
                Arc::clone(&services),
            )
            .with_deployment(deployments[i].clone())
        })
        .collect();
    put_everywhere(
        core,
        peers,
        workflow_ref,
        StorePayload::Contexts { contexts: contexts.iter().map(Context::spec).collect() },
    )
    .await?;

    let links: Vec<LinksSpec> = resolved.iter().map(|node| node.links.clone()).collect();
    put_everywhere(core, peers, workflow_ref, StorePayload::Links { links }).await?;

    // Barrier: flip every spawned worker to ready.
    core.deploy_complete_local(workflow_ref);
    check_all(
        core.cluster().on_many(peers, Request::DeployComplete { workflow: workflow_ref }).await,
    )?;
    Ok(())
}

/// Publish a store payload locally and to every peer.
async fn put_everywhere(
    core: &Arc<RuntimeCore>,
    peers: &[NodeName],
    workflow_ref: WorkflowRef,
    payload: StorePayload,
) -> Result<(), DeployError> {
    core.apply_store_put(workflow_ref, payload.clone()).map_err(DeployError::Internal)?;
    check_all(
        core.cluster()
            .on_many(peers, Request::StorePut { workflow: workflow_ref, payload })
            .await,
    )
}

fn check_all(results: Vec<(NodeName, Result<Response, RpcError>)>) -> Result<(), DeployError> {
    for (node, result) in results {
        if let Err(e) = result {
            return Err(DeployError::Rpc { node, reason: e.to_string() });
        }
    }
    Ok(())
}

/// Best-effort teardown on every runtime. `stop_workflow` is idempotent,
/// so unwinding a partially-applied deploy is safe.
async fn rollback(core: &Arc<RuntimeCore>, workflow_ref: WorkflowRef, peers: &[NodeName]) {
    core.stop_workflow(workflow_ref);
    let results = core
        .cluster()
        .on_many(peers, Request::StopWorkflow { workflow: workflow_ref })
        .await;
    for (node, result) in results {
        if let Err(e) = result {
            warn!(node = %node, error = %e, "rollback incomplete on node");
        }
    }
}

#[cfg(test)]
#[path = "deployer_tests.rs"]
mod tests;
