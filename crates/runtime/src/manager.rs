// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-workflow manager.
//!
//! Keeps a deployment alive after the deployer returns: subscribes to
//! membership events and mirrors the full deployment record (supervisor
//! tree, deployments, contexts, links, barrier) to every late-joining
//! worker node. The manager is the only component that touches
//! per-workflow topology after deploy.

use crate::services::RuntimeCore;
use rill_cluster::MemberEvent;
use rill_core::{Context, NodeName, WorkflowRef};
use rill_wire::{LinksSpec, Request, StorePayload};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub(crate) struct WorkflowManager {
    shutdown: CancellationToken,
}

impl WorkflowManager {
    /// Start managing a deployed workflow. Subscribes before returning so
    /// no join between deploy and manager start is missed.
    pub(crate) fn spawn(core: &Arc<RuntimeCore>, workflow: WorkflowRef) -> Self {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let mut events = core.cluster().subscribe();
        let weak = Arc::downgrade(core);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(MemberEvent::Up { node, .. }) => {
                            let Some(core) = weak.upgrade() else { break };
                            if let Err(reason) = replay(&core, workflow, &node).await {
                                warn!(%workflow, node = %node, %reason, "late-join replay failed");
                            } else {
                                info!(%workflow, node = %node, "deployment replayed to late joiner");
                            }
                        }
                        Ok(MemberEvent::Down { node }) => {
                            debug!(%workflow, node = %node, "worker left");
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(%workflow, skipped, "manager lagged behind membership events");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });
        Self { shutdown }
    }

    pub(crate) fn stop(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for WorkflowManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Mirror the workflow's full deployment record to one node. The wire
/// forms are rebuilt from the local store, so the replica matches what
/// the deployer originally published.
async fn replay(
    core: &Arc<RuntimeCore>,
    workflow: WorkflowRef,
    node: &NodeName,
) -> Result<(), String> {
    let store = core.store();
    let deployments = store.deployments(workflow).ok_or("no deployments in store")?;
    let contexts = store.contexts(workflow).ok_or("no contexts in store")?;
    let links = store.links(workflow).ok_or("no links in store")?;

    let cluster = core.cluster();
    let spawn = Request::SpawnNodeSup { workflow, nodes: deployments.len() };
    cluster.on(node, spawn).await.map_err(|e| e.to_string())?;

    let puts = [
        StorePayload::Deployments { deployments: (*deployments).clone() },
        StorePayload::Contexts { contexts: contexts.iter().map(Context::spec).collect() },
        StorePayload::Links { links: links_spec(&links) },
    ];
    for payload in puts {
        cluster
            .on(node, Request::StorePut { workflow, payload })
            .await
            .map_err(|e| e.to_string())?;
    }

    cluster
        .on(node, Request::DeployComplete { workflow })
        .await
        .map_err(|e| e.to_string())?;
    Ok(())
}

/// Recover the wire form of link tables from the rehydrated store entry.
fn links_spec(tables: &[crate::store::LinkTable]) -> Vec<LinksSpec> {
    tables
        .iter()
        .map(|table| {
            table
                .iter()
                .map(|(port, dsts)| {
                    let pairs = dsts
                        .iter()
                        .map(|(ctx, in_port)| (ctx.scope.node_index(), *in_port))
                        .collect();
                    (port.clone(), pairs)
                })
                .collect()
        })
        .collect()
}
