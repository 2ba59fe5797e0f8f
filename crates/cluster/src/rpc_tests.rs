// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC primitive tests

use super::*;
use crate::loopback::{LoopbackNet, LoopbackTransport};
use crate::transport::{RequestHandler, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use rill_wire::Mode;
use std::sync::Arc;

/// Handler that records how many requests it saw.
struct Counter {
    hits: Arc<Mutex<usize>>,
    fail: bool,
}

#[async_trait]
impl RequestHandler for Counter {
    async fn handle(&self, _request: Request) -> Response {
        *self.hits.lock() += 1;
        if self.fail {
            Response::error("induced failure")
        } else {
            Response::Ok
        }
    }
}

struct Fixture {
    master: Arc<Cluster>,
    hits: Vec<Arc<Mutex<usize>>>,
}

fn cluster_of(net: &Arc<LoopbackNet>, workers: &[(&str, bool)]) -> Fixture {
    let transport: Arc<dyn Transport> = LoopbackTransport::new(Arc::clone(net));
    let master = Cluster::new(NodeName::new("m@h:1"), Mode::Master, vec![], Some(transport));
    let mut hits = Vec::new();
    for (name, fail) in workers {
        let count = Arc::new(Mutex::new(0));
        net.register(
            NodeName::new(*name),
            Arc::new(Counter { hits: Arc::clone(&count), fail: *fail }),
        );
        master.accept(&NodeName::new(*name), Mode::Worker, vec![]).unwrap();
        hits.push(count);
    }
    Fixture { master, hits }
}

#[tokio::test]
async fn on_returns_remote_errors_as_rpc_errors() {
    let net = LoopbackNet::new();
    let fixture = cluster_of(&net, &[("w1@h:2", true)]);

    let err = fixture.master.on(&NodeName::new("w1@h:2"), Request::Status).await.unwrap_err();
    assert!(matches!(err, RpcError::Remote(reason) if reason.contains("induced")));
}

#[tokio::test]
async fn on_many_reports_per_node_results() {
    let net = LoopbackNet::new();
    let fixture = cluster_of(&net, &[("w1@h:2", false), ("w2@h:3", true)]);

    let results = fixture
        .master
        .on_many(&[NodeName::new("w1@h:2"), NodeName::new("w2@h:3")], Request::Status)
        .await;

    assert_eq!(results.len(), 2);
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err(), "failed node surfaces as Err entry");
}

#[tokio::test]
async fn on_many_tolerates_unreachable_nodes() {
    let net = LoopbackNet::new();
    let fixture = cluster_of(&net, &[("w1@h:2", false)]);

    let results = fixture
        .master
        .on_many(&[NodeName::new("w1@h:2"), NodeName::new("gone@h:9")], Request::Status)
        .await;
    assert!(results[0].1.is_ok());
    assert!(matches!(
        results[1].1.as_ref().unwrap_err(),
        RpcError::Transport(TransportError::Unreachable(_))
    ));
}

#[tokio::test]
async fn on_n_sprays_round_robin_across_workers() {
    let net = LoopbackNet::new();
    let fixture = cluster_of(&net, &[("w1@h:2", false), ("w2@h:3", false)]);

    let results = fixture.master.on_n(4, Request::Status).await;
    assert_eq!(results.len(), 4);
    // Two workers, four calls: each worker hit exactly twice.
    assert_eq!(*fixture.hits[0].lock(), 2);
    assert_eq!(*fixture.hits[1].lock(), 2);
}

#[tokio::test]
async fn on_n_with_no_workers_is_empty() {
    let net = LoopbackNet::new();
    let fixture = cluster_of(&net, &[]);
    assert!(fixture.master.on_n(3, Request::Status).await.is_empty());
}

#[tokio::test]
async fn on_tagged_workers_falls_back_to_all() {
    let net = LoopbackNet::new();
    let fixture = cluster_of(&net, &[("w1@h:2", false)]);

    let results = fixture.master.on_tagged_workers(&Tag::new("gpu"), Request::Status).await;
    assert_eq!(results.len(), 1, "fallback hits every worker");
}
