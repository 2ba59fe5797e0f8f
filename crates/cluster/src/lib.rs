// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rill-cluster: membership, handshake, and RPC between runtimes.
//!
//! A cluster has one master and many workers. Runtimes find each other with
//! `connect`, which probes the peer's beacon, applies the mode pairing
//! rules on both sides, and rolls back on rejection. Membership changes are
//! published on a broadcast bus; the rest of the system reaches peers with
//! the `on`/`on_many` RPC primitives over a pluggable transport.

mod beacon;
mod cluster;
mod handshake;
mod loopback;
mod rpc;
mod tcp;
mod transport;

pub use beacon::Beacon;
pub use cluster::{Cluster, ConnectError, MemberEvent};
pub use loopback::{LoopbackNet, LoopbackTransport};
pub use rpc::RpcError;
pub use tcp::TcpTransport;
pub use transport::{RequestHandler, Transport, TransportError};
