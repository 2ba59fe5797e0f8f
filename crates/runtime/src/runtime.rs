// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runtime façade.
//!
//! One `Runtime` per process: wraps the engine core with the public
//! deploy/undeploy/send surface and owns the per-workflow managers.

use crate::deployer::{self, DeployError};
use crate::error::RuntimeError;
use crate::manager::WorkflowManager;
use crate::services::RuntimeCore;
use parking_lot::Mutex;
use rill_cluster::{Cluster, RequestHandler};
use rill_core::{Clock, Registry, Strategy, Workflow, WorkflowRef};
use rill_wire::{Mode, Request, StatusReport};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub struct Runtime {
    core: Arc<RuntimeCore>,
    managers: Mutex<HashMap<WorkflowRef, WorkflowManager>>,
}

impl Runtime {
    pub fn new(cluster: Arc<Cluster>, registry: Arc<Registry>) -> Self {
        Self { core: RuntimeCore::new(cluster, registry), managers: Mutex::new(HashMap::new()) }
    }

    pub fn with_clock(
        cluster: Arc<Cluster>,
        registry: Arc<Registry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            core: RuntimeCore::with_clock(cluster, registry, clock),
            managers: Mutex::new(HashMap::new()),
        }
    }

    pub fn core(&self) -> &Arc<RuntimeCore> {
        &self.core
    }

    pub fn cluster(&self) -> &Arc<Cluster> {
        self.core.cluster()
    }

    /// This runtime's server side, for wiring into a listener or a
    /// loopback net.
    pub fn handler(&self) -> Arc<dyn RequestHandler> {
        Arc::clone(&self.core) as Arc<dyn RequestHandler>
    }

    /// Deploy a workflow across the current cluster and keep it alive.
    pub async fn deploy(&self, workflow: &Workflow) -> Result<WorkflowRef, DeployError> {
        match self.core.cluster().mode() {
            Mode::Master | Mode::Local | Mode::Test => {}
            mode => return Err(DeployError::WrongMode(mode)),
        }
        let workflow_ref = deployer::deploy(&self.core, workflow).await?;
        self.managers
            .lock()
            .insert(workflow_ref, WorkflowManager::spawn(&self.core, workflow_ref));
        Ok(workflow_ref)
    }

    /// Tear a workflow down on every runtime. Idempotent: undeploying an
    /// unknown or already-undeployed ref is a no-op.
    pub async fn undeploy(&self, workflow: WorkflowRef) {
        if let Some(manager) = self.managers.lock().remove(&workflow) {
            manager.stop();
        }
        self.core.stop_workflow(workflow);
        let results =
            self.core.cluster().on_all_workers(Request::StopWorkflow { workflow }).await;
        for (node, result) in results {
            if let Err(e) = result {
                warn!(node = %node, error = %e, "undeploy incomplete on node");
            }
        }
    }

    /// Inject a value into a deployed workflow from outside the graph,
    /// through the node's `deliver` hook (in-port 0).
    pub fn send(
        &self,
        workflow: WorkflowRef,
        node: usize,
        value: Value,
        invocation: Option<Value>,
    ) -> Result<(), RuntimeError> {
        if !self.core.store().has(workflow) {
            return Err(RuntimeError::UnknownWorkflow(workflow));
        }
        let ctx = self
            .core
            .store()
            .context(workflow, node)
            .ok_or(RuntimeError::UnknownNode { workflow, node })?;
        let ctx = ctx.with_invocation(invocation);
        let strategy = Arc::clone(&ctx.strategy);
        strategy.deliver(&ctx, value, 0)?;
        Ok(())
    }

    pub fn status(&self) -> StatusReport {
        self.core.status()
    }

    pub fn is_deployed(&self, workflow: WorkflowRef) -> bool {
        self.core.store().has(workflow)
    }
}
