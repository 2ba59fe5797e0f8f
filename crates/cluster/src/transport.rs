// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction: how one runtime calls another.

use async_trait::async_trait;
use rill_core::NodeName;
use rill_wire::{Request, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("node {0} is unreachable")]
    Unreachable(NodeName),

    #[error("I/O error talking to {node}: {reason}")]
    Io { node: NodeName, reason: String },

    /// The peer answered, but not with this protocol.
    #[error("node {node} does not speak the rill protocol: {reason}")]
    Protocol { node: NodeName, reason: String },
}

/// Carries a request to a peer runtime and returns its response.
///
/// Implementations: [`TcpTransport`] for real clusters,
/// [`LoopbackTransport`] for in-process ones.
///
/// [`TcpTransport`]: crate::tcp::TcpTransport
/// [`LoopbackTransport`]: crate::loopback::LoopbackTransport
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, node: &NodeName, request: Request) -> Result<Response, TransportError>;
}

/// The server side: a runtime's handler for incoming requests.
///
/// Implemented by the engine; the TCP listener and the loopback net both
/// dispatch into it.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: Request) -> Response;
}
