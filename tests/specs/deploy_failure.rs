// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deploy-time failure: a raising deploy hook rolls everything back on
//! every runtime.

use rill_core::{Workflow, WorkflowNode};
use rill_runtime::test_support::{
    collector, harness, identity, registry_with, wait_until, SharedSink,
};
use rill_runtime::DeployError;
use std::time::Duration;

#[tokio::test]
async fn failing_deploy_leaves_no_trace_on_any_runtime() {
    let sink = SharedSink::new();
    let registry = registry_with(vec![identity(), collector(&sink)]);
    let cluster = harness(registry, 2).await;

    // Node 2 of 3 fails its deploy hook; nodes 0 and 1 already spawned
    // workers by then.
    let workflow = Workflow::new("doomed")
        .node("a", WorkflowNode::new("identity").link("out", "b.in"))
        .node("b", WorkflowNode::new("identity").strategy("failing_deploy").link("out", "c.in"))
        .node("c", WorkflowNode::new("collect"));

    let err = cluster.master.deploy(&workflow).await.expect_err("deploy must fail");
    assert!(
        matches!(&err, DeployError::Strategy { node, .. } if node == "b"),
        "failure names the offending node: {err}"
    );

    // No supervisors, workers, or store entries remain anywhere.
    let master_core = cluster.master.core();
    assert!(
        wait_until(|| master_core.worker_count() == 0, Duration::from_secs(2)).await,
        "workers spawned before the failure are torn down"
    );
    assert!(master_core.store().is_empty(), "master store is clean");

    for worker in &cluster.workers {
        assert!(worker.core().store().is_empty(), "worker stores are clean");
        assert_eq!(worker.core().worker_count(), 0);
    }
}
