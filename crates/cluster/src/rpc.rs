// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC primitives over the cluster.
//!
//! `on` targets one node; `on_many` fans out in parallel and waits for
//! every reply. Failures surface as per-node `Err` entries; callers decide
//! whether to abort. Nothing here retries.

use crate::cluster::Cluster;
use crate::transport::TransportError;
use futures_util::future::join_all;
use rill_core::{NodeName, Tag};
use rill_wire::{Request, Response};
use std::sync::atomic::Ordering;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The peer handled the request and reported a failure.
    #[error("remote error: {0}")]
    Remote(String),
}

impl Cluster {
    /// Call one node and wait for its reply.
    pub async fn on(&self, node: &NodeName, request: Request) -> Result<Response, RpcError> {
        let transport = self.transport().map_err(|_| {
            RpcError::Transport(TransportError::Unreachable(node.clone()))
        })?;
        match transport.call(node, request).await? {
            Response::Error { reason } => Err(RpcError::Remote(reason)),
            response => Ok(response),
        }
    }

    /// Call every node in `nodes` in parallel; collect `(node, result)` in
    /// input order.
    pub async fn on_many(
        &self,
        nodes: &[NodeName],
        request: Request,
    ) -> Vec<(NodeName, Result<Response, RpcError>)> {
        let calls = nodes.iter().map(|node| {
            let request = request.clone();
            async move { (node.clone(), self.on(node, request).await) }
        });
        join_all(calls).await
    }

    /// Fan a request out to every worker node.
    pub async fn on_all_workers(
        &self,
        request: Request,
    ) -> Vec<(NodeName, Result<Response, RpcError>)> {
        self.on_many(&self.workers(), request).await
    }

    /// Fan a request out to workers carrying `tag`; falls back to all
    /// workers with a warning when none carry it.
    pub async fn on_tagged_workers(
        &self,
        tag: &Tag,
        request: Request,
    ) -> Vec<(NodeName, Result<Response, RpcError>)> {
        let mut nodes = self.tagged(tag);
        if nodes.is_empty() {
            warn!(%tag, "no workers carry tag, falling back to all workers");
            nodes = self.workers();
        }
        self.on_many(&nodes, request).await
    }

    /// Spray `n` calls round-robin across the worker nodes. Nodes repeat
    /// when `n` exceeds the cluster size; the result has exactly `n`
    /// entries unless there are no workers at all.
    pub async fn on_n(
        &self,
        n: usize,
        request: Request,
    ) -> Vec<(NodeName, Result<Response, RpcError>)> {
        let mut workers = self.workers();
        workers.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
        if workers.is_empty() {
            return Vec::new();
        }
        let nodes: Vec<NodeName> = (0..n)
            .map(|_| {
                let i = self.spray.fetch_add(1, Ordering::Relaxed);
                workers[i % workers.len()].clone()
            })
            .collect();
        self.on_many(&nodes, request).await
    }
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
