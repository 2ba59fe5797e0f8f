// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Emit routing tests

use crate::test_support::{collector, identity, numbers, registry_with, SharedSink, TestHarness};
use rill_core::{Emit, StrategyError, StrategyServices, Workflow, WorkflowNode};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn values_on_unlinked_ports_are_silently_dropped() {
    // The identity node has no outgoing link: its emits vanish and
    // nothing crashes.
    let registry = registry_with(vec![identity()]);
    let workflow = Workflow::new("sinkless").node("id", WorkflowNode::new("identity"));
    let harness = TestHarness::local(registry).await;
    let workflow_ref = harness.master.deploy(&workflow).await.unwrap();

    for i in 0..5 {
        harness.master.send(workflow_ref, 0, json!(i), None).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The worker survived the drops.
    assert_eq!(harness.master.core().worker_count(), 1);
}

#[tokio::test]
async fn each_link_sees_each_value_exactly_once() {
    // One out-port fanning out to two sinks: both receive every value.
    let a = SharedSink::new();
    let b = SharedSink::new();
    let collect_a = collector(&a);
    // Distinct operation names so both can live in one registry.
    let collect_b = crate::test_support::FnOperation::new("collect_b")
        .ports(&["in"], &[])
        .with_default_strategy("immutable_local")
        .callback("in", 1, rill_core::CallbackInfo::pure(), {
            let b = b.clone();
            move |_state, _cfg, args| {
                b.push(args.first().cloned().unwrap_or(serde_json::Value::Null));
                Ok(rill_core::CallbackResult::result(serde_json::Value::Null))
            }
        })
        .build();

    let registry = registry_with(vec![numbers(vec![1, 2, 3]), collect_a, collect_b]);
    let workflow = Workflow::new("fanout")
        .node(
            "src",
            WorkflowNode::new("numbers").link("out", "a.in").link("out", "b.in"),
        )
        .node("a", WorkflowNode::new("collect"))
        .node("b", WorkflowNode::new("collect_b"));
    let harness = TestHarness::local(registry).await;
    harness.master.deploy(&workflow).await.unwrap();

    assert!(a.wait_len(3, Duration::from_secs(2)).await);
    assert!(b.wait_len(3, Duration::from_secs(2)).await);
    assert_eq!(a.snapshot(), vec![json!(1), json!(2), json!(3)]);
    assert_eq!(b.snapshot(), vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn emitting_from_deploy_scope_is_a_contract_violation() {
    let registry = registry_with(vec![identity()]);
    let harness = TestHarness::local(registry).await;
    let core = harness.master.core();

    // Forge a deploy-scoped context the way a misbehaving deploy hook
    // would see it.
    let services = core.services().unwrap();
    let ctx = rill_core::Context::new(
        identity(),
        core.registry().strategy("immutable_local").unwrap(),
        serde_json::Value::Null,
        rill_core::Scope::Deploy { workflow: rill_core::WorkflowRef::new(), node: 1 },
        std::sync::Arc::clone(&services),
    );

    let err = services.emit(&ctx, Emit::value("out", json!(1))).unwrap_err();
    assert!(matches!(err, StrategyError::EmitDuringDeploy { node: 1 }));
}
