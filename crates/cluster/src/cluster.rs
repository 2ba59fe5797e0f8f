// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster membership state and mode pairing rules.

use crate::beacon::Beacon;
use crate::transport::Transport;
use parking_lot::RwLock;
use rill_core::{NodeName, Tag};
use rill_wire::Mode;
use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Membership change published on the cluster bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberEvent {
    Up { node: NodeName, tags: Vec<Tag> },
    Down { node: NodeName },
}

/// Connect-time failures. Membership is unchanged after any of these.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// This runtime has no transport; it cannot join anything.
    #[error("local runtime is not distributed")]
    NotDistributed,

    #[error("could not connect to {0}")]
    NotConnected(NodeName),

    /// The peer answered, but it is not a rill runtime.
    #[error("{0} is not a rill runtime")]
    NotRill(NodeName),

    #[error("{node} runs incompatible version {version}")]
    Incompatible { node: NodeName, version: String },

    #[error("{node} is in mode {actual}, expected {expected}")]
    ModeMismatch { node: NodeName, expected: Mode, actual: Mode },

    /// The local mode has no pairing rule for the remote's mode.
    #[error("mode {local} does not accept mode {remote}")]
    UnknownMode { local: Mode, remote: Mode },

    /// A worker already authenticated a different master.
    #[error("already connected to master {current}")]
    MasterConflict { current: NodeName },

    /// The remote's accept handler refused us; local state was rolled back.
    #[error("{node} rejected the connection: {reason}")]
    Rejected { node: NodeName, reason: String },
}

/// One runtime's view of the cluster.
///
/// The master's `members` map is authoritative: it holds every worker and
/// its tags. A worker tracks only its master. All mutation goes through
/// the accept/remove paths so the bus always mirrors the map.
pub struct Cluster {
    local: NodeName,
    beacon: Beacon,
    transport: Option<Arc<dyn Transport>>,
    members: RwLock<HashMap<NodeName, Vec<Tag>>>,
    master: RwLock<Option<NodeName>>,
    bus: broadcast::Sender<MemberEvent>,
    pub(crate) spray: AtomicUsize,
}

impl Cluster {
    pub fn new(
        local: NodeName,
        mode: Mode,
        tags: Vec<Tag>,
        transport: Option<Arc<dyn Transport>>,
    ) -> Arc<Self> {
        let (bus, _) = broadcast::channel(64);
        Arc::new(Self {
            local,
            beacon: Beacon::new(mode, tags),
            transport,
            members: RwLock::new(HashMap::new()),
            master: RwLock::new(None),
            bus,
            spray: AtomicUsize::new(0),
        })
    }

    pub fn local(&self) -> &NodeName {
        &self.local
    }

    pub fn mode(&self) -> Mode {
        self.beacon.mode
    }

    pub fn beacon(&self) -> &Beacon {
        &self.beacon
    }

    pub(crate) fn transport(&self) -> Result<&Arc<dyn Transport>, ConnectError> {
        self.transport.as_ref().ok_or(ConnectError::NotDistributed)
    }

    /// Subscribe to membership events.
    pub fn subscribe(&self) -> broadcast::Receiver<MemberEvent> {
        self.bus.subscribe()
    }

    /// Current worker nodes, unordered.
    pub fn workers(&self) -> Vec<NodeName> {
        self.members.read().keys().cloned().collect()
    }

    /// Worker nodes carrying `tag`.
    pub fn tagged(&self, tag: &Tag) -> Vec<NodeName> {
        self.members
            .read()
            .iter()
            .filter(|(_, tags)| tags.contains(tag))
            .map(|(node, _)| node.clone())
            .collect()
    }

    pub fn is_member(&self, node: &NodeName) -> bool {
        self.members.read().contains_key(node)
    }

    pub fn master(&self) -> Option<NodeName> {
        self.master.read().clone()
    }

    /// Apply the local pairing rules to a peer. Used both by `connect`
    /// (accepting the node we dialled) and by the Hello handler (accepting
    /// the node that dialled us).
    pub fn accept(
        &self,
        remote: &NodeName,
        remote_mode: Mode,
        tags: Vec<Tag>,
    ) -> Result<(), ConnectError> {
        match (self.mode(), remote_mode) {
            (Mode::Master, Mode::Worker) | (Mode::Test, Mode::Worker) | (Mode::Test, Mode::Test) => {
                self.add_member(remote.clone(), tags);
                Ok(())
            }
            (Mode::Worker, Mode::Master) | (Mode::Test, Mode::Master) => {
                let mut master = self.master.write();
                match master.as_ref() {
                    Some(current) if current != remote => {
                        Err(ConnectError::MasterConflict { current: current.clone() })
                    }
                    _ => {
                        *master = Some(remote.clone());
                        info!(master = %remote, "master accepted");
                        Ok(())
                    }
                }
            }
            (local, remote) => Err(ConnectError::UnknownMode { local, remote }),
        }
    }

    /// Drop a node from membership. Idempotent; fires `Down` only when the
    /// node was actually present.
    pub fn remove(&self, node: &NodeName) {
        let was_member = self.members.write().remove(node).is_some();
        {
            let mut master = self.master.write();
            if master.as_ref() == Some(node) {
                *master = None;
            }
        }
        if was_member {
            info!(node = %node, "worker down");
            let _ = self.bus.send(MemberEvent::Down { node: node.clone() });
        }
    }

    fn add_member(&self, node: NodeName, tags: Vec<Tag>) {
        let fresh = self.members.write().insert(node.clone(), tags.clone()).is_none();
        if fresh {
            info!(node = %node, ?tags, "worker up");
            let _ = self.bus.send(MemberEvent::Up { node, tags });
        } else {
            debug!(node = %node, "member re-announced");
        }
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
