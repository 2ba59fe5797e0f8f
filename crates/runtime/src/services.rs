// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runtime core: shared engine state and the services strategies use.
//!
//! One `RuntimeCore` exists per runtime process. It owns the constant
//! store, the local worker table, and the per-workflow supervision trees,
//! and implements [`StrategyServices`], the seam through which strategy
//! hooks spawn workers and route values without seeing the engine.

use crate::store::ConstantStore;
use crate::supervisor::{NodeWorkerSup, RestartPolicy, WorkerSpec};
use crate::worker::WorkerMsg;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rill_cluster::Cluster;
use rill_core::{
    Clock, Context, NodeName, Placement, Registry, StateInit, StrategyError, StrategyServices,
    SystemClock, Tag, WorkerId, WorkerRef, WorkflowRef,
};
use rill_wire::{Mode, Request, Response, StatusReport, StorePayload};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

/// Per-destination outbound queues. A single pump task per peer keeps
/// worker sends FIFO over the transport without blocking `deliver`.
struct RemoteSender {
    cluster: Arc<Cluster>,
    queues: Mutex<HashMap<NodeName, UnboundedSender<Request>>>,
}

impl RemoteSender {
    fn new(cluster: Arc<Cluster>) -> Self {
        Self { cluster, queues: Mutex::new(HashMap::new()) }
    }

    fn enqueue(&self, node: NodeName, request: Request) {
        let tx = self
            .queues
            .lock()
            .entry(node.clone())
            .or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(pump(Arc::clone(&self.cluster), node.clone(), rx));
                tx
            })
            .clone();
        if tx.send(request).is_err() {
            warn!(node = %node, "outbound pump gone, message dropped");
        }
    }
}

async fn pump(cluster: Arc<Cluster>, node: NodeName, mut rx: UnboundedReceiver<Request>) {
    while let Some(request) = rx.recv().await {
        if let Err(e) = cluster.on(&node, request).await {
            // Fire-and-forget delivery: losses surface as warnings only.
            warn!(node = %node, error = %e, "remote send failed");
        }
    }
}

/// Shared engine state for one runtime.
pub struct RuntimeCore {
    self_ref: Weak<RuntimeCore>,
    cluster: Arc<Cluster>,
    registry: Arc<Registry>,
    store: ConstantStore,
    clock: Arc<dyn Clock>,
    workers: Mutex<HashMap<WorkerId, UnboundedSender<WorkerMsg>>>,
    workflows: Mutex<HashMap<WorkflowRef, NodeWorkerSup>>,
    remote: RemoteSender,
}

impl RuntimeCore {
    pub fn new(cluster: Arc<Cluster>, registry: Arc<Registry>) -> Arc<Self> {
        Self::with_clock(cluster, registry, Arc::new(SystemClock))
    }

    pub fn with_clock(
        cluster: Arc<Cluster>,
        registry: Arc<Registry>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            cluster: Arc::clone(&cluster),
            registry,
            store: ConstantStore::new(),
            clock,
            workers: Mutex::new(HashMap::new()),
            workflows: Mutex::new(HashMap::new()),
            remote: RemoteSender::new(cluster),
        })
    }

    fn arc(&self) -> Option<Arc<Self>> {
        self.self_ref.upgrade()
    }

    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn store(&self) -> &ConstantStore {
        &self.store
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// This core as the services handle injected into contexts.
    pub fn services(&self) -> Option<Arc<dyn StrategyServices>> {
        self.arc().map(|core| core as Arc<dyn StrategyServices>)
    }

    pub(crate) fn register_worker(&self, worker: WorkerId, mailbox: UnboundedSender<WorkerMsg>) {
        self.workers.lock().insert(worker, mailbox);
    }

    pub(crate) fn unregister_worker(&self, worker: &WorkerId) {
        self.workers.lock().remove(worker);
    }

    pub(crate) fn worker_mailbox(&self, worker: &WorkerId) -> Option<UnboundedSender<WorkerMsg>> {
        self.workers.lock().get(worker).cloned()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Create the supervision tree for a workflow on this runtime.
    /// Idempotent: replays from the workflow manager are no-ops.
    pub(crate) fn spawn_node_sup(&self, workflow: WorkflowRef, nodes: usize) -> Result<(), String> {
        if self.workflows.lock().contains_key(&workflow) {
            return Ok(());
        }
        let core = self.arc().ok_or("runtime shutting down")?;
        let sup = NodeWorkerSup::spawn(&core, workflow, nodes);
        self.store.put_supervisors(workflow, sup.sups().to_vec());
        self.workflows.lock().insert(workflow, sup);
        Ok(())
    }

    /// Release the deploy barrier for a workflow's local workers.
    pub(crate) fn deploy_complete_local(&self, workflow: WorkflowRef) {
        if let Some(sup) = self.workflows.lock().get(&workflow).cloned() {
            sup.deploy_complete();
        }
    }

    /// Tear down a workflow on this runtime: supervisors, workers, and
    /// store entries. Idempotent.
    pub(crate) fn stop_workflow(&self, workflow: WorkflowRef) {
        if let Some(sup) = self.workflows.lock().remove(&workflow) {
            sup.stop_all(self);
        }
        self.store.remove(workflow);
    }

    /// A node supervisor exhausted its restart budget: drop the whole
    /// supervision subtree here, keep published constants for the manager.
    pub(crate) fn collapse_workflow(&self, workflow: WorkflowRef) {
        if let Some(sup) = self.workflows.lock().remove(&workflow) {
            sup.stop_all(self);
        }
        self.store.remove_supervisors(workflow);
    }

    /// Apply a store publish, rehydrating wire forms against the local
    /// registry.
    pub(crate) fn apply_store_put(
        &self,
        workflow: WorkflowRef,
        payload: StorePayload,
    ) -> Result<(), String> {
        match payload {
            StorePayload::Deployments { deployments } => {
                self.store.put_deployments(workflow, deployments);
                Ok(())
            }
            StorePayload::Contexts { contexts } => {
                let services = self.services().ok_or("runtime shutting down")?;
                let mut rehydrated = Vec::with_capacity(contexts.len());
                for spec in &contexts {
                    let ctx = spec
                        .rehydrate(&self.registry, Arc::clone(&services))
                        .map_err(|e| e.to_string())?;
                    rehydrated.push(ctx);
                }
                self.store.put_contexts(workflow, rehydrated);
                Ok(())
            }
            StorePayload::Links { links } => {
                let contexts = self
                    .store
                    .contexts(workflow)
                    .ok_or("links published before contexts")?;
                let mut tables = Vec::with_capacity(links.len());
                for node_links in links {
                    let mut table = crate::store::LinkTable::new();
                    for (port, pairs) in node_links {
                        let mut dsts = Vec::with_capacity(pairs.len());
                        for (target, in_port) in pairs {
                            let ctx = contexts
                                .get(target)
                                .cloned()
                                .ok_or("link target out of range")?;
                            dsts.push((ctx, in_port));
                        }
                        table.insert(port, dsts);
                    }
                    tables.push(table);
                }
                self.store.put_links(workflow, tables);
                Ok(())
            }
        }
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            node: self.local_node(),
            mode: self.cluster.mode(),
            workflows: self.store.workflows(),
            workers: self.worker_count(),
        }
    }

    fn any_worker_node(&self) -> Result<NodeName, StrategyError> {
        let workers = self.cluster.workers();
        if let Some(node) = workers.choose(&mut rand::thread_rng()) {
            return Ok(node.clone());
        }
        match self.cluster.mode() {
            // A local or test runtime is its own worker pool.
            Mode::Local | Mode::Test => Ok(self.local_node()),
            _ => Err(StrategyError::Placement { placement: "any".into() }),
        }
    }

    fn pick_node(&self, placement: &Placement) -> Result<NodeName, StrategyError> {
        match placement {
            Placement::Local => {
                if self.cluster.mode() == Mode::Master {
                    Err(StrategyError::LocalOnMaster)
                } else {
                    Ok(self.local_node())
                }
            }
            Placement::On(node) => Ok(node.clone()),
            Placement::With(worker) => Ok(worker.node.clone()),
            Placement::Any => self.any_worker_node(),
            Placement::Avoid(avoid) => {
                let mut nodes = self.cluster.workers();
                nodes.retain(|n| n != avoid);
                match nodes.choose(&mut rand::thread_rng()) {
                    Some(node) => Ok(node.clone()),
                    None => {
                        warn!(avoid = %avoid, "no other node available, falling back to any");
                        self.any_worker_node()
                    }
                }
            }
            Placement::Tagged(tag) => {
                let nodes = self.cluster.tagged(tag);
                match nodes.choose(&mut rand::thread_rng()) {
                    Some(node) => Ok(node.clone()),
                    None => {
                        warn!(%tag, "no node carries tag, falling back to any worker");
                        self.any_worker_node()
                    }
                }
            }
        }
    }
}

#[async_trait]
impl StrategyServices for RuntimeCore {
    fn local_node(&self) -> NodeName {
        self.cluster.local().clone()
    }

    fn cluster_workers(&self) -> Vec<NodeName> {
        self.cluster.workers()
    }

    fn create_local(
        &self,
        ctx: &Context,
        state: StateInit,
        tag: Tag,
    ) -> Result<WorkerRef, StrategyError> {
        let scope = ctx.scope;
        let sup = self.store.supervisor(scope.workflow(), scope.node_index()).ok_or_else(|| {
            StrategyError::NoSupervisor {
                workflow: scope.workflow().to_string(),
                node: scope.node_index(),
            }
        })?;
        let core = self.arc().ok_or_else(|| StrategyError::NoSupervisor {
            workflow: scope.workflow().to_string(),
            node: scope.node_index(),
        })?;
        let spec = WorkerSpec { ctx: ctx.to_node_scope(), init: state, tag };
        sup.spawn_child(&core, spec, RestartPolicy::Transient)
    }

    async fn create_remote(
        &self,
        ctx: &Context,
        state: StateInit,
        tag: Tag,
        placement: Placement,
    ) -> Result<WorkerRef, StrategyError> {
        let node = self.pick_node(&placement)?;
        if node == self.local_node() {
            return self.create_local(ctx, state, tag);
        }
        let request = Request::CreateWorker {
            workflow: ctx.scope.workflow(),
            node_index: ctx.scope.node_index(),
            context: ctx.to_node_scope().spec(),
            // Thunks cannot cross the wire; resolve before shipping.
            state: state.resolve(),
            tag,
        };
        match self.cluster.on(&node, request).await {
            Ok(Response::Worker { worker }) => Ok(WorkerRef::new(node, worker)),
            Ok(other) => Err(StrategyError::Remote {
                node,
                reason: format!("unexpected response {other:?}"),
            }),
            Err(e) => Err(StrategyError::Remote { node, reason: e.to_string() }),
        }
    }

    fn send(&self, worker: &WorkerRef, value: Value, invocation: Option<Value>) {
        if worker.node == *self.cluster.local() {
            match self.worker_mailbox(&worker.worker) {
                Some(mailbox) => {
                    let _ = mailbox.send(WorkerMsg::Value { value, invocation });
                }
                None => warn!(worker = %worker, "send to unknown worker dropped"),
            }
        } else {
            self.remote.enqueue(
                worker.node.clone(),
                Request::WorkerSend { worker: worker.worker, value, invocation },
            );
        }
    }

    fn emit(&self, ctx: &Context, emit: rill_core::Emit) -> Result<(), StrategyError> {
        let core = self.arc().ok_or_else(|| StrategyError::NoSupervisor {
            workflow: ctx.scope.workflow().to_string(),
            node: ctx.scope.node_index(),
        })?;
        crate::router::route(&core, ctx, emit)
    }

    fn stop_worker(&self, worker: &WorkerRef) {
        if worker.node == *self.cluster.local() {
            if let Some(mailbox) = self.worker_mailbox(&worker.worker) {
                let _ = mailbox.send(WorkerMsg::Stop);
            }
        } else {
            self.remote.enqueue(worker.node.clone(), Request::WorkerStop { worker: worker.worker });
        }
    }
}
