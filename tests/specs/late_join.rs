// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Late join: the workflow manager replays deployments to runtimes that
//! connect after deploy.

use rill_core::{Workflow, WorkflowNode};
use rill_runtime::test_support::{
    collector, harness, identity, registry_with, wait_until, SharedSink,
};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn late_joiner_receives_the_full_deployment_record() {
    let sink = SharedSink::new();
    let registry = registry_with(vec![identity(), collector(&sink)]);
    let mut cluster = harness(registry, 1).await;

    let workflow = Workflow::new("late-join")
        .node("id", WorkflowNode::new("identity").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    let workflow_ref = cluster.master.deploy(&workflow).await.expect("deploy");

    cluster.master.send(workflow_ref, 0, json!(1), None).expect("send");
    assert!(sink.wait_len(1, Duration::from_secs(2)).await);

    // A second worker connects after deploy; the manager replays.
    cluster.add_worker("late@loop").await;
    let late = cluster.workers.last().expect("late worker").core();

    assert!(
        wait_until(|| late.store().has(workflow_ref), Duration::from_secs(2)).await,
        "late joiner received deployments"
    );

    // Replayed state matches the master byte for byte.
    let master_store = cluster.master.core().store();
    assert_eq!(
        *late.store().deployments(workflow_ref).expect("deployments"),
        *master_store.deployments(workflow_ref).expect("deployments"),
    );
    assert_eq!(
        late.store().links(workflow_ref).expect("links").len(),
        master_store.links(workflow_ref).expect("links").len(),
    );
    assert!(
        wait_until(|| late.store().supervisor(workflow_ref, 0).is_some(), Duration::from_secs(2))
            .await,
        "supervision tree exists on the late joiner"
    );

    // The pipeline still works after the join.
    cluster.master.send(workflow_ref, 0, json!(2), None).expect("send after join");
    assert!(sink.wait_len(2, Duration::from_secs(2)).await);
    assert_eq!(sink.snapshot(), vec![json!(1), json!(2)]);
}
