// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle tests

use crate::test_support::{
    collector, counter, identity, registry_with, wait_until, SharedSink, TestHarness,
};
use rill_core::{Workflow, WorkflowNode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn state_patches_accumulate_across_messages() {
    let sink = SharedSink::new();
    let registry = registry_with(vec![counter(), collector(&sink)]);
    let workflow = Workflow::new("count")
        .node("count", WorkflowNode::new("counter").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    let harness = TestHarness::local(registry).await;
    let workflow_ref = harness.master.deploy(&workflow).await.unwrap();

    for _ in 0..4 {
        harness.master.send(workflow_ref, 0, json!(1), None).unwrap();
    }
    assert!(sink.wait_len(4, Duration::from_secs(2)).await);
    assert_eq!(sink.snapshot(), vec![json!(1), json!(2), json!(3), json!(4)]);
}

#[tokio::test]
async fn per_sender_order_is_preserved() {
    let sink = SharedSink::new();
    let registry = registry_with(vec![identity(), collector(&sink)]);
    let workflow = Workflow::new("fifo")
        .node("id", WorkflowNode::new("identity").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    let harness = TestHarness::local(registry).await;
    let workflow_ref = harness.master.deploy(&workflow).await.unwrap();

    let expected: Vec<_> = (0..100).map(|i| json!(i)).collect();
    for value in &expected {
        harness.master.send(workflow_ref, 0, value.clone(), None).unwrap();
    }
    assert!(sink.wait_len(expected.len(), Duration::from_secs(2)).await);
    assert_eq!(sink.snapshot(), expected, "single-sender FIFO");
}

#[tokio::test]
async fn undeploy_stops_workers_and_clears_state() {
    let sink = SharedSink::new();
    let registry = registry_with(vec![identity(), collector(&sink)]);
    let workflow = Workflow::new("stop")
        .node("id", WorkflowNode::new("identity").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    let harness = TestHarness::local(registry).await;
    let workflow_ref = harness.master.deploy(&workflow).await.unwrap();
    let core = Arc::clone(harness.master.core());
    assert_eq!(core.worker_count(), 2);

    harness.master.undeploy(workflow_ref).await;
    assert!(wait_until(|| core.worker_count() == 0, Duration::from_secs(2)).await);
    assert!(!harness.master.is_deployed(workflow_ref));
    assert!(
        harness.master.send(workflow_ref, 0, json!(1), None).is_err(),
        "sends to an undeployed workflow fail"
    );

    // Idempotent: a second undeploy changes nothing.
    harness.master.undeploy(workflow_ref).await;
    assert!(!harness.master.is_deployed(workflow_ref));
}

#[tokio::test]
async fn passive_source_reacts_to_outside_values() {
    let sink = SharedSink::new();
    let registry =
        registry_with(vec![crate::test_support::reader(), collector(&sink)]);
    let workflow = Workflow::new("passive")
        .node("src", WorkflowNode::new("reader").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    let harness = TestHarness::local(registry).await;
    let workflow_ref = harness.master.deploy(&workflow).await.unwrap();

    for v in [1, 2, 3] {
        harness.master.send(workflow_ref, 0, json!(v), None).unwrap();
    }
    assert!(sink.wait_len(3, Duration::from_secs(2)).await);
    assert_eq!(sink.snapshot(), vec![json!(2), json!(4), json!(6)], "read callback ran");
}

#[tokio::test]
async fn invocation_metadata_reaches_downstream_contexts() {
    // The identity operation does not touch invocations; delivery through
    // the router must carry them untouched into the sink's strategy. The
    // observable effect: nothing breaks and values still arrive. (Context
    // propagation itself is covered by the router unit tests.)
    let sink = SharedSink::new();
    let registry = registry_with(vec![identity(), collector(&sink)]);
    let workflow = Workflow::new("inv")
        .node("id", WorkflowNode::new("identity").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    let harness = TestHarness::local(registry).await;
    let workflow_ref = harness.master.deploy(&workflow).await.unwrap();

    harness
        .master
        .send(workflow_ref, 0, json!(7), Some(json!({"trace": "t1"})))
        .unwrap();
    assert!(sink.wait_len(1, Duration::from_secs(2)).await);
    assert_eq!(sink.snapshot(), vec![json!(7)]);
}
