// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed state: sums partitioned by `x mod 2`.

use rill_core::{Workflow, WorkflowNode};
use rill_runtime::test_support::{
    collector, keyed_sum, numbers, registry_with, SharedSink, TestHarness,
};
use serde_json::{json, Value};
use std::time::Duration;

#[tokio::test]
async fn sums_accumulate_per_key() {
    let sink = SharedSink::new();
    let registry =
        registry_with(vec![numbers(vec![1, 2, 3, 4, 5]), keyed_sum(), collector(&sink)]);
    let harness = TestHarness::local(registry).await;

    let workflow = Workflow::new("keyed")
        .node("src", WorkflowNode::new("numbers").link("out", "sum.in"))
        .node("sum", WorkflowNode::new("keyed_sum").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    harness.master.deploy(&workflow).await.expect("deploy");

    // One record per input value; the final record per key carries the
    // key's total. Ordering between keys is unconstrained.
    assert!(sink.wait_len(5, Duration::from_secs(2)).await);
    let records = sink.snapshot();

    let final_sum = |key: i64| -> Option<i64> {
        records
            .iter()
            .filter(|r| r["key"] == json!(key))
            .next_back()
            .and_then(|r| r["sum"].as_i64())
    };
    assert_eq!(final_sum(0), Some(6), "2 + 4");
    assert_eq!(final_sum(1), Some(9), "1 + 3 + 5");
}

#[tokio::test]
async fn keys_never_share_state() {
    let sink = SharedSink::new();
    let registry = registry_with(vec![numbers(vec![1, 1, 2]), keyed_sum(), collector(&sink)]);
    let harness = TestHarness::local(registry).await;

    let workflow = Workflow::new("keyed-isolated")
        .node("src", WorkflowNode::new("numbers").link("out", "sum.in"))
        .node("sum", WorkflowNode::new("keyed_sum").link("out", "sink.in"))
        .node("sink", WorkflowNode::new("collect"));
    harness.master.deploy(&workflow).await.expect("deploy");

    assert!(sink.wait_len(3, Duration::from_secs(2)).await);
    let records = sink.snapshot();
    let sums_for = |key: i64| -> Vec<Value> {
        records.iter().filter(|r| r["key"] == json!(key)).map(|r| r["sum"].clone()).collect()
    };
    assert_eq!(sums_for(1), vec![json!(1), json!(2)], "odd key sums only odd values");
    assert_eq!(sums_for(0), vec![json!(2)], "even key untouched by odd traffic");
}
