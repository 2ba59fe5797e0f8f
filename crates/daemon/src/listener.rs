// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP listener for the inter-node protocol.
//!
//! Accepts connections and handles them in spawned tasks without blocking
//! the runtime; each connection carries a sequence of length-prefixed
//! request/response frames dispatched into the runtime's handler.

use rill_cluster::RequestHandler;
use rill_wire::{decode, encode, read_message, write_message, Request, Response};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub struct Listener {
    tcp: TcpListener,
    handler: Arc<dyn RequestHandler>,
    shutdown: CancellationToken,
}

impl Listener {
    pub async fn bind(
        addr: &str,
        handler: Arc<dyn RequestHandler>,
        shutdown: CancellationToken,
    ) -> std::io::Result<Self> {
        let tcp = TcpListener::bind(addr).await?;
        Ok(Self { tcp, handler, shutdown })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.tcp.local_addr()
    }

    /// Accept connections until shutdown.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = self.tcp.accept() => match result {
                    Ok((stream, addr)) => {
                        debug!(%addr, "connection accepted");
                        let handler = Arc::clone(&self.handler);
                        let shutdown = self.shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, handler, shutdown).await {
                                warn!(%addr, error = %e, "connection closed with error");
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "accept failed"),
                },
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    handler: Arc<dyn RequestHandler>,
    shutdown: CancellationToken,
) -> Result<(), rill_wire::ProtocolError> {
    loop {
        let bytes = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            read = read_message(&mut stream) => match read {
                Ok(bytes) => bytes,
                // Peer hung up between frames: a normal close.
                Err(rill_wire::ProtocolError::Io(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(())
                }
                Err(e) => return Err(e),
            },
        };
        let response = match decode::<Request>(&bytes) {
            Ok(request) => handler.handle(request).await,
            Err(e) => Response::error(format!("malformed request: {e}")),
        };
        write_message(&mut stream, &encode(&response)?).await?;
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
