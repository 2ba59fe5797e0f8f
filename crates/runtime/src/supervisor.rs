// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker supervision.
//!
//! Hierarchy, leaves first: a `WorkerSup` owns the worker actors of one
//! node index; a `NodeWorkerSup` owns one `WorkerSup` per node of a
//! workflow; the runtime's workflow table plays the process-wide role.
//! Workers restart transient: a crash respawns them with their initial
//! state under the same worker id, so refs held in deployments stay
//! routable. A `WorkerSup` that exhausts its restart budget escalates, and
//! the `NodeWorkerSup` (restart budget zero) collapses the whole workflow
//! subtree on this runtime.

use crate::services::RuntimeCore;
use crate::worker::{self, WorkerMsg};
use parking_lot::Mutex;
use rill_core::{
    Context, StateInit, StrategyError, StrategyServices, Tag, WorkerId, WorkerRef, WorkflowRef,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

/// Restarts tolerated per worker supervisor within [`RESTART_WINDOW`].
const MAX_RESTARTS: usize = 3;
const RESTART_WINDOW: Duration = Duration::from_secs(5);

/// When to respawn a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Always respawn.
    Permanent,
    /// Respawn after a crash, not after an orderly stop.
    Transient,
    /// Never respawn.
    Temporary,
}

impl RestartPolicy {
    fn restarts(&self, crashed: bool) -> bool {
        match self {
            Self::Permanent => true,
            Self::Transient => crashed,
            Self::Temporary => false,
        }
    }
}

/// Everything needed to (re)spawn one worker.
#[derive(Clone)]
pub(crate) struct WorkerSpec {
    /// Node-scoped context; `deployment` resolves at the barrier.
    pub ctx: Context,
    pub init: StateInit,
    pub tag: Tag,
}

pub(crate) enum ChildEvent {
    Exited { worker: WorkerId, crashed: bool },
    Shutdown,
}

struct ChildEntry {
    mailbox: UnboundedSender<WorkerMsg>,
    spec: WorkerSpec,
    policy: RestartPolicy,
}

struct SupInner {
    workflow: WorkflowRef,
    node_index: usize,
    children: Mutex<HashMap<WorkerId, ChildEntry>>,
    events: UnboundedSender<ChildEvent>,
    /// Deploy barrier state: spawns after release initialise immediately.
    released: AtomicBool,
    stopped: AtomicBool,
}

/// Dynamic supervisor for the workers of one node index.
#[derive(Clone)]
pub struct WorkerSup {
    inner: Arc<SupInner>,
}

impl WorkerSup {
    fn spawn(
        core: &Arc<RuntimeCore>,
        workflow: WorkflowRef,
        node_index: usize,
        collapse: UnboundedSender<usize>,
    ) -> Self {
        let (events, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(SupInner {
            workflow,
            node_index,
            children: Mutex::new(HashMap::new()),
            events,
            released: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        });
        let sup = Self { inner: Arc::clone(&inner) };
        tokio::spawn(supervise(Arc::downgrade(core), inner, rx, collapse));
        sup
    }

    /// Spawn a worker under this supervisor. The worker id stays stable
    /// across restarts.
    pub(crate) fn spawn_child(
        &self,
        core: &Arc<RuntimeCore>,
        spec: WorkerSpec,
        policy: RestartPolicy,
    ) -> Result<WorkerRef, StrategyError> {
        if self.inner.stopped.load(Ordering::Acquire) {
            return Err(StrategyError::NoSupervisor {
                workflow: self.inner.workflow.to_string(),
                node: self.inner.node_index,
            });
        }
        let worker = WorkerId::new();
        let (mailbox, rx) = mpsc::unbounded_channel();
        self.inner.children.lock().insert(
            worker,
            ChildEntry { mailbox: mailbox.clone(), spec: spec.clone(), policy },
        );
        core.register_worker(worker, mailbox.clone());
        worker::spawn(Arc::downgrade(core), self.inner.events.clone(), worker, spec, rx);
        if self.inner.released.load(Ordering::Acquire) {
            let _ = mailbox.send(WorkerMsg::DeployComplete);
        }
        debug!(workflow = %self.inner.workflow, node = self.inner.node_index, %worker, "worker spawned");
        Ok(WorkerRef::new(core.local_node(), worker))
    }

    /// Release the deploy barrier for this node's workers.
    pub(crate) fn deploy_complete(&self) {
        self.inner.released.store(true, Ordering::Release);
        for entry in self.inner.children.lock().values() {
            let _ = entry.mailbox.send(WorkerMsg::DeployComplete);
        }
    }

    /// Stop every child and refuse further spawns. Idempotent.
    pub(crate) fn stop(&self, core: &RuntimeCore) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let children: Vec<_> = self.inner.children.lock().drain().collect();
        for (worker, entry) in children {
            let _ = entry.mailbox.send(WorkerMsg::Stop);
            core.unregister_worker(&worker);
        }
        let _ = self.inner.events.send(ChildEvent::Shutdown);
    }

    pub fn worker_count(&self) -> usize {
        self.inner.children.lock().len()
    }
}

/// Supervision loop: restart crashed children with their initial state,
/// escalate when the restart budget is exhausted.
async fn supervise(
    core: Weak<RuntimeCore>,
    inner: Arc<SupInner>,
    mut rx: UnboundedReceiver<ChildEvent>,
    collapse: UnboundedSender<usize>,
) {
    let mut restarts: VecDeque<Instant> = VecDeque::new();
    while let Some(event) = rx.recv().await {
        let (worker, crashed) = match event {
            ChildEvent::Exited { worker, crashed } => (worker, crashed),
            ChildEvent::Shutdown => break,
        };
        if inner.stopped.load(Ordering::Acquire) {
            break;
        }
        let Some(core) = core.upgrade() else { break };

        let entry = inner.children.lock().remove(&worker);
        core.unregister_worker(&worker);
        let Some(entry) = entry else { continue };

        if !entry.policy.restarts(crashed) {
            debug!(%worker, crashed, "worker exited, no restart");
            continue;
        }

        let now = core.clock().now();
        restarts.push_back(now);
        while let Some(front) = restarts.front() {
            if now.duration_since(*front) > RESTART_WINDOW {
                restarts.pop_front();
            } else {
                break;
            }
        }
        if restarts.len() > MAX_RESTARTS {
            error!(
                workflow = %inner.workflow,
                node = inner.node_index,
                "restart budget exhausted, escalating"
            );
            inner.stopped.store(true, Ordering::Release);
            let remaining: Vec<_> = inner.children.lock().drain().collect();
            for (id, child) in remaining {
                let _ = child.mailbox.send(WorkerMsg::Stop);
                core.unregister_worker(&id);
            }
            let _ = collapse.send(inner.node_index);
            break;
        }

        info!(workflow = %inner.workflow, node = inner.node_index, %worker, "restarting worker");
        let (mailbox, worker_rx) = mpsc::unbounded_channel();
        inner.children.lock().insert(
            worker,
            ChildEntry { mailbox: mailbox.clone(), spec: entry.spec.clone(), policy: entry.policy },
        );
        core.register_worker(worker, mailbox.clone());
        worker::spawn(
            Arc::downgrade(&core),
            inner.events.clone(),
            worker,
            entry.spec,
            worker_rx,
        );
        if inner.released.load(Ordering::Acquire) {
            let _ = mailbox.send(WorkerMsg::DeployComplete);
        }
    }
}

struct NodeSupInner {
    workflow: WorkflowRef,
    sups: Vec<WorkerSup>,
}

/// Per-workflow supervisor: one [`WorkerSup`] per node index, restart
/// budget zero. Any escalating child collapses the subtree.
#[derive(Clone)]
pub(crate) struct NodeWorkerSup {
    inner: Arc<NodeSupInner>,
}

impl NodeWorkerSup {
    pub(crate) fn spawn(core: &Arc<RuntimeCore>, workflow: WorkflowRef, nodes: usize) -> Self {
        let (collapse_tx, mut collapse_rx) = mpsc::unbounded_channel();
        let sups = (0..nodes)
            .map(|i| WorkerSup::spawn(core, workflow, i, collapse_tx.clone()))
            .collect();
        let node_sup = Self { inner: Arc::new(NodeSupInner { workflow, sups }) };

        let weak = Arc::downgrade(core);
        tokio::spawn(async move {
            if let Some(node) = collapse_rx.recv().await {
                if let Some(core) = weak.upgrade() {
                    error!(workflow = %workflow, node, "collapsing workflow on this runtime");
                    core.collapse_workflow(workflow);
                }
            }
        });
        node_sup
    }

    pub(crate) fn sups(&self) -> &[WorkerSup] {
        &self.inner.sups
    }

    pub(crate) fn deploy_complete(&self) {
        for sup in &self.inner.sups {
            sup.deploy_complete();
        }
    }

    pub(crate) fn stop_all(&self, core: &RuntimeCore) {
        for sup in &self.inner.sups {
            sup.stop(core);
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
