// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Undeploy: cluster-wide teardown, idempotent.

use rill_core::{Workflow, WorkflowNode};
use rill_runtime::test_support::{
    collector, harness, identity, registry_with, wait_until, SharedSink,
};
use std::time::Duration;

#[tokio::test]
async fn undeploy_tears_down_every_runtime() {
    let sink = SharedSink::new();
    let registry = registry_with(vec![identity(), collector(&sink)]);
    let cluster = harness(registry, 2).await;

    let workflow = Workflow::new("teardown")
        .node("id", WorkflowNode::new("identity").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    let workflow_ref = cluster.master.deploy(&workflow).await.expect("deploy");

    for worker in &cluster.workers {
        assert!(worker.core().store().has(workflow_ref), "deployed everywhere");
    }

    cluster.master.undeploy(workflow_ref).await;

    assert!(
        wait_until(|| cluster.master.core().worker_count() == 0, Duration::from_secs(2)).await
    );
    assert!(cluster.master.core().store().is_empty());
    for worker in &cluster.workers {
        assert!(worker.core().store().is_empty(), "store cleared on workers");
    }
}

#[tokio::test]
async fn undeploy_twice_is_observably_identical() {
    let sink = SharedSink::new();
    let registry = registry_with(vec![identity(), collector(&sink)]);
    let cluster = harness(registry, 1).await;

    let workflow = Workflow::new("twice")
        .node("id", WorkflowNode::new("identity").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    let workflow_ref = cluster.master.deploy(&workflow).await.expect("deploy");

    cluster.master.undeploy(workflow_ref).await;
    let after_first = (
        cluster.master.core().store().len(),
        cluster.master.core().worker_count(),
        cluster.workers[0].core().store().len(),
    );

    cluster.master.undeploy(workflow_ref).await;
    let after_second = (
        cluster.master.core().store().len(),
        cluster.master.core().worker_count(),
        cluster.workers[0].core().store().len(),
    );

    assert_eq!(after_first, after_second);
    assert_eq!(after_first, (0, 0, 0));
}
