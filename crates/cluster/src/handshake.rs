// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The connect handshake.
//!
//! `connect` runs three stages: fetch the peer's beacon (liveness +
//! protocol + version + mode checks), accept the peer locally (pairing
//! rules), then ask the peer to accept us. If the remote side refuses, the
//! local acceptance is rolled back so membership ends where it started.

use crate::cluster::{Cluster, ConnectError};
use crate::transport::TransportError;
use rill_core::NodeName;
use rill_wire::{Mode, Request, Response, PROTOCOL_VERSION};
use tracing::{info, warn};

impl Cluster {
    /// Join `remote` to this runtime's cluster view, verifying its mode
    /// against `expected` when given. Returns the remote's mode.
    pub async fn connect(
        &self,
        remote: &NodeName,
        expected: Option<Mode>,
    ) -> Result<Mode, ConnectError> {
        let transport = self.transport()?;

        // Stage 1: liveness + beacon.
        let response = transport.call(remote, Request::Beacon).await.map_err(|e| match e {
            TransportError::Protocol { .. } => ConnectError::NotRill(remote.clone()),
            _ => ConnectError::NotConnected(remote.clone()),
        })?;
        let (remote_mode, version, tags) = match response {
            Response::Beacon { mode, version, tags, .. } => (mode, version, tags),
            _ => return Err(ConnectError::NotRill(remote.clone())),
        };
        if !self.beacon().accepts(&version) {
            return Err(ConnectError::Incompatible { node: remote.clone(), version });
        }
        if let Some(expected) = expected {
            if remote_mode != expected {
                return Err(ConnectError::ModeMismatch {
                    node: remote.clone(),
                    expected,
                    actual: remote_mode,
                });
            }
        }

        // Stage 2: accept locally.
        self.accept(remote, remote_mode, tags)?;

        // Stage 3: ask the remote to accept us; roll back on refusal.
        let hello = Request::Hello {
            node: self.local().clone(),
            mode: self.mode(),
            version: PROTOCOL_VERSION.to_string(),
            tags: self.beacon().tags.clone(),
        };
        match transport.call(remote, hello).await {
            Ok(Response::Ok) => {
                info!(node = %remote, mode = %remote_mode, "connected");
                Ok(remote_mode)
            }
            Ok(Response::Error { reason }) => {
                warn!(node = %remote, %reason, "remote rejected handshake, rolling back");
                self.remove(remote);
                Err(ConnectError::Rejected { node: remote.clone(), reason })
            }
            Ok(_) | Err(_) => {
                self.remove(remote);
                Err(ConnectError::NotConnected(remote.clone()))
            }
        }
    }

    /// Server half of the handshake: a peer asked to be accepted.
    pub fn handle_hello(
        &self,
        node: &NodeName,
        mode: Mode,
        version: &str,
        tags: Vec<rill_core::Tag>,
    ) -> Result<(), ConnectError> {
        if !self.beacon().accepts(version) {
            return Err(ConnectError::Incompatible {
                node: node.clone(),
                version: version.to_string(),
            });
        }
        self.accept(node, mode, tags)
    }
}

#[cfg(test)]
#[path = "handshake_tests.rs"]
mod tests;
