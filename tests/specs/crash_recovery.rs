// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash recovery: a stateful counter restarts from its initial state.

use rill_core::{Workflow, WorkflowNode};
use rill_runtime::test_support::{collector, counter, registry_with, SharedSink, TestHarness};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn counter_restarts_from_zero_after_a_crash() {
    let sink = SharedSink::new();
    let registry = registry_with(vec![counter(), collector(&sink)]);
    let harness = TestHarness::local(registry).await;

    let workflow = Workflow::new("crash-recovery")
        .node("count", WorkflowNode::new("counter").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    let workflow_ref = harness.master.deploy(&workflow).await.expect("deploy");

    for _ in 0..3 {
        harness.master.send(workflow_ref, 0, json!(1), None).expect("send");
    }
    assert!(sink.wait_len(3, Duration::from_secs(2)).await);

    // Kill the worker: the callback error crashes it, the supervisor
    // restarts it with the initial state. Accumulated state is lost, and
    // so is any mail still queued behind the crash, so wait for the
    // restart before sending again.
    harness.master.send(workflow_ref, 0, json!("boom"), None).expect("crash send");
    tokio::time::sleep(Duration::from_millis(100)).await;
    for _ in 0..2 {
        harness.master.send(workflow_ref, 0, json!(1), None).expect("send after crash");
    }

    assert!(sink.wait_len(5, Duration::from_secs(2)).await);
    assert_eq!(
        sink.snapshot(),
        vec![json!(1), json!(2), json!(3), json!(1), json!(2)],
        "published sequence is 1,2,3 then 1,2"
    );
}
