// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deploy barrier: no worker processes a value before the deployer's
//! `deploy_complete` broadcast.

use rill_core::{Workflow, WorkflowNode};
use rill_runtime::test_support::{
    collector, numbers, registry_with, SharedSink, TestHarness,
};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn source_kicks_wait_for_the_barrier() {
    let sink = SharedSink::new();
    // The stream source queues its kick during deploy; the sink node
    // deploys slowly afterwards. Without the barrier the source would
    // stream into a half-built workflow.
    let registry = registry_with(vec![numbers(vec![1, 2, 3]), collector(&sink)]);
    let harness = TestHarness::local(registry).await;

    let workflow = Workflow::new("barrier")
        .node("src", WorkflowNode::new("numbers").link("out", "sink.in"))
        .node(
            "sink",
            WorkflowNode::new("collect")
                .strategy("slow_deploy")
                .args(json!({"delay_ms": 200})),
        );

    let deploy = harness.master.deploy(&workflow);
    tokio::pin!(deploy);

    // While the slow node is still deploying, nothing may be processed.
    let early = tokio::time::timeout(Duration::from_millis(120), &mut deploy).await;
    assert!(early.is_err(), "deploy still in progress");
    assert!(sink.is_empty(), "no value processed before deploy_complete");

    deploy.await.expect("deploy");
    assert!(sink.wait_len(3, Duration::from_secs(2)).await, "values flow after the barrier");
    assert_eq!(sink.snapshot(), vec![json!(1), json!(2), json!(3)], "nothing was lost");
}
