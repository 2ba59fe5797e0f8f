// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process transport for local and test clusters.
//!
//! A `LoopbackNet` is a registry of request handlers keyed by node name;
//! a `LoopbackTransport` routes calls straight into the target handler.
//! Multiple runtimes share one net to form an in-process cluster, and
//! tests unregister a handler to simulate a dead node.

use crate::transport::{RequestHandler, Transport, TransportError};
use async_trait::async_trait;
use parking_lot::RwLock;
use rill_core::NodeName;
use rill_wire::{Request, Response};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of in-process runtimes.
#[derive(Default)]
pub struct LoopbackNet {
    handlers: RwLock<HashMap<NodeName, Arc<dyn RequestHandler>>>,
}

impl LoopbackNet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, node: NodeName, handler: Arc<dyn RequestHandler>) {
        self.handlers.write().insert(node, handler);
    }

    /// Remove a node from the net; calls to it fail as unreachable.
    pub fn unregister(&self, node: &NodeName) {
        self.handlers.write().remove(node);
    }

    fn handler(&self, node: &NodeName) -> Option<Arc<dyn RequestHandler>> {
        self.handlers.read().get(node).cloned()
    }
}

/// Transport over a shared [`LoopbackNet`].
pub struct LoopbackTransport {
    net: Arc<LoopbackNet>,
}

impl LoopbackTransport {
    pub fn new(net: Arc<LoopbackNet>) -> Arc<Self> {
        Arc::new(Self { net })
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn call(&self, node: &NodeName, request: Request) -> Result<Response, TransportError> {
        let handler =
            self.net.handler(node).ok_or_else(|| TransportError::Unreachable(node.clone()))?;
        Ok(handler.handle(request).await)
    }
}
