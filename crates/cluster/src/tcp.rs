// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP transport: one persistent connection per peer.
//!
//! A node name carries its dial address after the `@`. Connections are
//! opened lazily, reused, and dropped on any error so the next call
//! redials. One request is in flight per connection; the per-node lock
//! also gives per-pair ordering over the wire.

use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use rill_core::NodeName;
use rill_wire::{decode, encode, read_message, write_message, Request, Response};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::debug;

type Conn = Arc<tokio::sync::Mutex<Option<TcpStream>>>;

#[derive(Default)]
pub struct TcpTransport {
    conns: Mutex<HashMap<NodeName, Conn>>,
}

impl TcpTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn conn(&self, node: &NodeName) -> Conn {
        self.conns.lock().entry(node.clone()).or_default().clone()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn call(&self, node: &NodeName, request: Request) -> Result<Response, TransportError> {
        let addr = node
            .addr()
            .ok_or_else(|| TransportError::Unreachable(node.clone()))?
            .to_string();

        let conn = self.conn(node);
        let mut guard = conn.lock().await;

        if guard.is_none() {
            debug!(node = %node, %addr, "dialing");
            let stream = TcpStream::connect(&addr)
                .await
                .map_err(|_| TransportError::Unreachable(node.clone()))?;
            *guard = Some(stream);
        }

        let result = async {
            let stream = match guard.as_mut() {
                Some(stream) => stream,
                None => return Err(TransportError::Unreachable(node.clone())),
            };
            let payload = encode(&request).map_err(|e| TransportError::Protocol {
                node: node.clone(),
                reason: e.to_string(),
            })?;
            write_message(stream, &payload).await.map_err(|e| TransportError::Io {
                node: node.clone(),
                reason: e.to_string(),
            })?;
            let bytes = read_message(stream).await.map_err(|e| TransportError::Io {
                node: node.clone(),
                reason: e.to_string(),
            })?;
            decode::<Response>(&bytes).map_err(|e| TransportError::Protocol {
                node: node.clone(),
                reason: e.to_string(),
            })
        }
        .await;

        if result.is_err() {
            // Drop the broken connection; the next call redials.
            *guard = None;
        }
        result
    }
}
