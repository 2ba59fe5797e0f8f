// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity pipeline: stream source → identity → sink, values arrive in
//! order.

use rill_core::{Workflow, WorkflowNode};
use rill_runtime::test_support::{
    collector, identity, numbers, registry_with, SharedSink, TestHarness,
};
use serde_json::json;
use std::time::Duration;

fn pipeline() -> Workflow {
    Workflow::new("identity-pipeline")
        .node("src", WorkflowNode::new("numbers").link("out", "id.in"))
        .node("id", WorkflowNode::new("identity").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"))
}

#[tokio::test]
async fn values_flow_in_order_through_the_pipeline() {
    let sink = SharedSink::new();
    let registry = registry_with(vec![numbers(vec![1, 2, 3]), identity(), collector(&sink)]);
    let harness = TestHarness::local(registry).await;

    let workflow = pipeline();
    let workflow_ref = harness.master.deploy(&workflow).await.expect("deploy");

    assert!(sink.wait_len(3, Duration::from_secs(2)).await, "all values arrive");
    assert_eq!(sink.snapshot(), vec![json!(1), json!(2), json!(3)], "in emit order");

    // Deploy completeness: every node has a deployment and a link table.
    let core = harness.master.core();
    for node in 0..3 {
        assert!(core.store().deployment(workflow_ref, node).is_some(), "node {node} deployed");
    }
    assert_eq!(core.store().links(workflow_ref).expect("links").len(), 3);
}

#[tokio::test]
async fn pipeline_works_on_a_master_worker_cluster() {
    let sink = SharedSink::new();
    let registry = registry_with(vec![numbers(vec![4, 5]), identity(), collector(&sink)]);
    let harness = rill_runtime::test_support::harness(registry, 2).await;
    let workflow = pipeline();
    let workflow_ref = harness.master.deploy(&workflow).await.expect("deploy");

    assert!(sink.wait_len(2, Duration::from_secs(2)).await);
    assert_eq!(sink.snapshot(), vec![json!(4), json!(5)]);

    // Deploy completeness holds on every runtime in the cluster.
    for worker in &harness.workers {
        let store = worker.core().store();
        for node in 0..3 {
            assert!(store.deployment(workflow_ref, node).is_some());
        }
        assert!(store.links(workflow_ref).is_some());
    }
}
