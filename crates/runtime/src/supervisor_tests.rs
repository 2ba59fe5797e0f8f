// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervision tests: restart with initial state, budget exhaustion.

use crate::test_support::{collector, counter, registry_with, wait_until, SharedSink, TestHarness};
use rill_core::{Workflow, WorkflowNode};
use serde_json::json;
use std::time::Duration;

fn counter_pipeline(sink: &SharedSink) -> (Workflow, std::sync::Arc<rill_core::Registry>) {
    let registry = registry_with(vec![counter(), collector(sink)]);
    let workflow = Workflow::new("counting")
        .node("count", WorkflowNode::new("counter").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    (workflow, registry)
}

#[tokio::test]
async fn crashed_worker_restarts_with_initial_state() {
    let sink = SharedSink::new();
    let (workflow, registry) = counter_pipeline(&sink);
    let harness = TestHarness::local(registry).await;
    let workflow_ref = harness.master.deploy(&workflow).await.unwrap();

    for _ in 0..3 {
        harness.master.send(workflow_ref, 0, json!(1), None).unwrap();
    }
    assert!(sink.wait_len(3, Duration::from_secs(2)).await);
    assert_eq!(sink.snapshot(), vec![json!(1), json!(2), json!(3)]);

    // Crash the counter worker; the supervisor restarts it from zero.
    // Mail queued behind the crash dies with the mailbox, so let the
    // restart land before sending again.
    harness.master.send(workflow_ref, 0, json!("boom"), None).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    harness.master.send(workflow_ref, 0, json!(1), None).unwrap();
    harness.master.send(workflow_ref, 0, json!(1), None).unwrap();

    assert!(sink.wait_len(5, Duration::from_secs(2)).await);
    assert_eq!(
        sink.snapshot(),
        vec![json!(1), json!(2), json!(3), json!(1), json!(2)],
        "state resets to initial after the crash"
    );
}

#[tokio::test]
async fn exhausted_restart_budget_collapses_the_workflow_locally() {
    let sink = SharedSink::new();
    let (workflow, registry) = counter_pipeline(&sink);
    let harness = TestHarness::local(registry).await;
    let workflow_ref = harness.master.deploy(&workflow).await.unwrap();
    let core = std::sync::Arc::clone(harness.master.core());

    // Two workers exist: counter and sink.
    assert_eq!(core.worker_count(), 2);

    // More crashes than the restart budget tolerates in its window.
    for _ in 0..10 {
        // Sends race the restarts; ignore sends that hit a dead worker.
        let _ = harness.master.send(workflow_ref, 0, json!("boom"), None);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(
        wait_until(|| core.worker_count() == 0, Duration::from_secs(2)).await,
        "collapse stops every worker of the workflow on this runtime"
    );
    assert!(
        core.store().supervisor(workflow_ref, 0).is_none(),
        "collapse drops the supervisor handles"
    );
}

#[tokio::test]
async fn restarted_worker_keeps_its_ref() {
    let sink = SharedSink::new();
    let (workflow, registry) = counter_pipeline(&sink);
    let harness = TestHarness::local(registry).await;
    let workflow_ref = harness.master.deploy(&workflow).await.unwrap();

    harness.master.send(workflow_ref, 0, json!("boom"), None).unwrap();
    // Give the supervisor a moment to respawn.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The deployment's worker ref still routes: the counter counts again.
    harness.master.send(workflow_ref, 0, json!(1), None).unwrap();
    assert!(sink.wait_len(1, Duration::from_secs(2)).await);
    assert_eq!(sink.snapshot(), vec![json!(1)]);
}
