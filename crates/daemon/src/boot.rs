// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boot lifecycle.
//!
//! Builds the runtime for the configured mode, starts the protocol
//! listener in distributed modes, bootstraps cluster connections, and
//! auto-deploys a registered workflow when the config names one.

use crate::config::{Config, ConfigError};
use crate::listener::Listener;
use rill_cluster::{Cluster, ConnectError, TcpTransport, Transport};
use rill_core::{NodeName, Registry, Tag, Workflow};
use rill_runtime::{strategies, DeployError, Runtime};
use rill_wire::Mode;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot bind listener on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("deploy target {0} is not a registered workflow")]
    UnknownWorkflow(String),
}

/// A configured but not-yet-booted daemon: the registry of operations and
/// strategies plus named workflows available for auto-deploy.
pub struct Daemon {
    registry: Arc<Registry>,
    workflows: HashMap<String, Workflow>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// A daemon with the built-in strategies and no operations.
    pub fn new() -> Self {
        let mut registry = Registry::new();
        strategies::register_builtin(&mut registry);
        Self { registry: Arc::new(registry), workflows: HashMap::new() }
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self { registry, workflows: HashMap::new() }
    }

    /// Register a workflow for `deploy = "<name>"` in the config.
    pub fn workflow(mut self, name: impl Into<String>, workflow: Workflow) -> Self {
        self.workflows.insert(name.into(), workflow);
        self
    }

    /// Boot per the config: build the cluster view, serve the protocol,
    /// connect bootstrap peers, auto-deploy.
    pub async fn boot(self, config: Config) -> Result<DaemonHandle, LifecycleError> {
        config.validate()?;
        let mode = config.mode()?;
        let distributed = matches!(mode, Mode::Master | Mode::Worker);

        let name = NodeName::new(config.name.clone().unwrap_or_else(|| "local".to_string()));
        let tags: Vec<Tag> = config.tags.iter().map(Tag::new).collect();
        let transport: Option<Arc<dyn Transport>> =
            distributed.then(|| TcpTransport::new() as Arc<dyn Transport>);

        let cluster = Cluster::new(name.clone(), mode, tags, transport);
        let runtime = Runtime::new(Arc::clone(&cluster), Arc::clone(&self.registry));
        let shutdown = CancellationToken::new();

        if distributed {
            let addr = config
                .listen
                .clone()
                .or_else(|| name.addr().map(str::to_string))
                .unwrap_or_default();
            let listener = Listener::bind(&addr, runtime.handler(), shutdown.clone())
                .await
                .map_err(|e| LifecycleError::Bind { addr: addr.clone(), reason: e.to_string() })?;
            info!(mode = %mode, node = %name, %addr, "listening");
            tokio::spawn(listener.run());
        }

        match mode {
            Mode::Master => {
                for worker in &config.workers {
                    cluster.connect(&NodeName::new(worker.clone()), Some(Mode::Worker)).await?;
                }
            }
            Mode::Worker => {
                // Validated above: worker mode always has a master.
                if let Some(master) = &config.master {
                    cluster.connect(&NodeName::new(master.clone()), Some(Mode::Master)).await?;
                }
            }
            Mode::Local | Mode::Test => {}
        }

        if let Some(target) = &config.deploy {
            if matches!(mode, Mode::Master | Mode::Local | Mode::Test) {
                let workflow = self
                    .workflows
                    .get(target)
                    .ok_or_else(|| LifecycleError::UnknownWorkflow(target.clone()))?;
                let workflow_ref = runtime.deploy(workflow).await?;
                info!(workflow = %target, %workflow_ref, "auto-deployed");
            }
        }

        info!(mode = %mode, node = %name, "runtime up");
        Ok(DaemonHandle { cluster, runtime, shutdown })
    }
}

/// A booted daemon: the live runtime plus its shutdown token.
pub struct DaemonHandle {
    cluster: Arc<Cluster>,
    runtime: Runtime,
    shutdown: CancellationToken,
}

impl DaemonHandle {
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Stop the listener and let in-process workers wind down. A worker
    /// says goodbye to its master so membership does not hold a ghost.
    pub fn shutdown(&self) {
        if let Some(master) = self.cluster.master() {
            let cluster = Arc::clone(&self.cluster);
            let node = cluster.local().clone();
            tokio::spawn(async move {
                let _ = cluster.on(&master, rill_wire::Request::Goodbye { node }).await;
            });
        }
        self.shutdown.cancel();
    }
}

#[cfg(test)]
#[path = "boot_tests.rs"]
mod tests;
