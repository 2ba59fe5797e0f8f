// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Emit map tests

use super::*;
use serde_json::json;

#[test]
fn push_preserves_port_insertion_order() {
    let mut emit = Emit::new();
    emit.push("out", json!(1));
    emit.push("errors", json!("e"));
    emit.push("out", json!(2));

    let entries: Vec<_> = emit
        .into_entries()
        .map(|(port, seq)| (port, seq.into_iter().collect::<Vec<_>>()))
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, "out");
    assert_eq!(entries[0].1, vec![json!(1), json!(2)]);
    assert_eq!(entries[1].0, "errors");
}

#[test]
fn lazy_sequences_are_pulled_on_iteration() {
    let mut emit = Emit::new();
    emit.insert("out", ValueSeq::lazy((0..3).map(|i| json!(i))));

    let (_, seq) = emit.into_entries().next().unwrap();
    assert_eq!(seq.known_len(), None);
    let values: Vec<_> = seq.into_iter().collect();
    assert_eq!(values, vec![json!(0), json!(1), json!(2)]);
}

#[test]
fn from_iterator_builds_eager_map() {
    let emit: Emit = [("out", vec![json!("a")])].into_iter().collect();
    assert_eq!(emit.len(), 1);
}

#[test]
fn emit_with_invocation_keeps_per_value_metadata() {
    let mut emit = EmitWithInvocation::new();
    emit.push("out", json!(1), Some(json!({"seq": 1})));
    emit.push("out", json!(2), None);

    let entries: Vec<_> = emit.into_entries().collect();
    assert_eq!(entries[0].1.len(), 2);
    assert_eq!(entries[0].1[0].1, Some(json!({"seq": 1})));
    assert_eq!(entries[0].1[1].1, None);
}
