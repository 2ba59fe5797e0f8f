// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol serialization tests

use super::*;
use crate::{Mode, Response, StatusReport};
use rill_core::{NodeName, Scope, WorkerId, WorkflowRef};
use serde_json::json;

#[test]
fn requests_serialize_with_type_tags() {
    let json = serde_json::to_value(Request::Beacon).unwrap();
    assert_eq!(json, json!({"type": "beacon"}));

    let json = serde_json::to_value(Request::Hello {
        node: NodeName::new("w1@h:1"),
        mode: Mode::Worker,
        version: "0.1.0".into(),
        tags: vec![],
    })
    .unwrap();
    assert_eq!(json["type"], "hello");
    assert_eq!(json["mode"], "worker");
    assert!(json.get("tags").is_none(), "empty tags are omitted");
}

#[test]
fn worker_send_omits_absent_invocation() {
    let request = Request::WorkerSend {
        worker: WorkerId::from_string("wkr-x"),
        value: json!(42),
        invocation: None,
    };
    let json = serde_json::to_value(&request).unwrap();
    assert!(json.get("invocation").is_none());

    let back: Request = serde_json::from_value(json).unwrap();
    assert_eq!(back, request);
}

#[test]
fn store_payload_roundtrips() {
    let workflow = WorkflowRef::new();
    let payload = StorePayload::Contexts {
        contexts: vec![rill_core::ContextSpec {
            operation: "identity".into(),
            strategy: "immutable_local".into(),
            args: json!(null),
            deployment: Some(json!(["ref"])),
            scope: Scope::Node { workflow, node: 0 },
        }],
    };
    let request = Request::StorePut { workflow, payload };
    let json = serde_json::to_string(&request).unwrap();
    let back: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(back, request);
}

#[test]
fn links_spec_roundtrips() {
    let workflow = WorkflowRef::new();
    let links: Vec<LinksSpec> =
        vec![vec![("out".into(), vec![(1, 0)])], vec![]];
    let request = Request::StorePut { workflow, payload: StorePayload::Links { links } };
    let json = serde_json::to_string(&request).unwrap();
    let back: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(back, request);
}

#[test]
fn status_response_roundtrips() {
    let response = Response::Status {
        status: StatusReport {
            node: NodeName::new("m@h:1"),
            mode: Mode::Master,
            workflows: vec![WorkflowRef::new()],
            workers: 3,
        },
    };
    let json = serde_json::to_string(&response).unwrap();
    let back: Response = serde_json::from_str(&json).unwrap();
    assert_eq!(back, response);
}

#[test]
fn error_response_helper() {
    let response = Response::error("boom");
    assert!(!response.is_ok());
    assert!(Response::Ok.is_ok());
}
