// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-node placement: an active source spawns one worker per runtime.

use rill_core::{Workflow, WorkflowNode};
use rill_runtime::test_support::{collector, harness, registry_with, SharedSink};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn active_source_covers_every_runtime() {
    let sink = SharedSink::new();
    let poll = rill_runtime::test_support::FnOperation::new("beat")
        .ports(&[], &["out"])
        .with_default_strategy("active_source")
        .callback("poll", 0, rill_core::CallbackInfo::pure().emits(), |_s, _c, _a| {
            Ok(rill_core::CallbackResult::result(serde_json::Value::Null)
                .with_emit(rill_core::Emit::value("out", json!("beat"))))
        })
        .build();
    let registry = registry_with(vec![poll, collector(&sink)]);
    let cluster = harness(registry, 2).await;

    let workflow = Workflow::new("fanout")
        .node("src", WorkflowNode::new("beat").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    let workflow_ref = cluster.master.deploy(&workflow).await.expect("deploy");

    // Deployment lists one worker per runtime: master + two workers.
    let deployment = cluster.master.core().store().deployment(workflow_ref, 0).expect("deployed");
    let refs: Vec<rill_core::WorkerRef> =
        serde_json::from_value(deployment).expect("worker list");
    assert_eq!(refs.len(), 3, "one poller per runtime");

    let mut nodes: Vec<String> = refs.iter().map(|r| r.node.to_string()).collect();
    nodes.sort();
    nodes.dedup();
    assert_eq!(nodes.len(), 3, "every runtime hosts exactly one poller");

    // Each poller fired once at the barrier; every beat reaches the sink
    // on the deploying runtime.
    assert!(sink.wait_len(3, Duration::from_secs(2)).await);
    assert_eq!(sink.snapshot(), vec![json!("beat"); 3]);
}

#[tokio::test]
async fn keyed_partitions_spread_across_the_cluster() {
    let sink = SharedSink::new();
    let registry = registry_with(vec![
        rill_runtime::test_support::keyed_sum(),
        collector(&sink),
    ]);
    let cluster = harness(registry, 2).await;

    let workflow = Workflow::new("spread")
        .node("sum", WorkflowNode::new("keyed_sum").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    let workflow_ref = cluster.master.deploy(&workflow).await.expect("deploy");

    let deployment = cluster.master.core().store().deployment(workflow_ref, 0).expect("deployed");
    let refs: Vec<rill_core::WorkerRef> =
        serde_json::from_value(deployment).expect("worker list");
    assert_eq!(refs.len(), 3, "one partition worker per runtime");

    // Values keyed 0/1 land on their partitions wherever those live.
    for v in [1, 2, 3, 4] {
        cluster.master.send(workflow_ref, 0, json!(v), None).expect("send");
    }
    assert!(sink.wait_len(4, Duration::from_secs(2)).await);
}
