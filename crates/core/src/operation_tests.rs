// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callback contract tests

use super::*;
use crate::emit::Emit;
use crate::port::ports;
use serde_json::json;

/// Operation whose single callback misbehaves on demand.
struct Probe {
    ins: Vec<PortName>,
    outs: Vec<PortName>,
    info: CallbackInfo,
}

impl Probe {
    fn with_info(info: CallbackInfo) -> Arc<dyn Operation> {
        Arc::new(Self { ins: ports(&["in"]), outs: ports(&["out"]), info })
    }
}

impl Operation for Probe {
    fn name(&self) -> &str {
        "probe"
    }

    fn in_ports(&self) -> &[PortName] {
        &self.ins
    }

    fn out_ports(&self) -> &[PortName] {
        &self.outs
    }

    fn callback_info(&self, name: &str, arity: usize) -> Option<CallbackInfo> {
        (name == "in" && arity == 1).then_some(self.info)
    }

    fn call(
        &self,
        _name: &str,
        _state: Value,
        _config: &Value,
        args: &[Value],
    ) -> Result<CallbackResult, OperationError> {
        let arg = args.first().cloned().unwrap_or(Value::Null);
        let mut result = CallbackResult::result(Value::Null);
        if arg == json!("write") {
            result.state = Some(json!(1));
        }
        if arg == json!("emit") {
            result.emit = Emit::value("out", json!(1));
        }
        Ok(result)
    }
}

#[test]
fn unknown_callback_is_an_error() {
    let op = Probe::with_info(CallbackInfo::pure());
    let err = checked_call(&op, "nope", Value::Null, &Value::Null, &[json!(1)]).unwrap_err();
    assert!(matches!(
        err,
        StrategyError::Operation(OperationError::UnknownCallback { arity: 1, .. })
    ));
}

#[test]
fn state_write_without_permission_is_rejected() {
    let op = Probe::with_info(CallbackInfo::pure());
    let err = checked_call(&op, "in", Value::Null, &Value::Null, &[json!("write")]).unwrap_err();
    assert!(matches!(err, StrategyError::StateNotAllowed { .. }));
}

#[test]
fn emit_without_permission_is_rejected() {
    let op = Probe::with_info(CallbackInfo::pure());
    let err = checked_call(&op, "in", Value::Null, &Value::Null, &[json!("emit")]).unwrap_err();
    assert!(matches!(err, StrategyError::EmitNotAllowed { .. }));
}

#[test]
fn permitted_writes_and_emits_pass() {
    let op = Probe::with_info(CallbackInfo::reads_writes().emits());
    let res = checked_call(&op, "in", Value::Null, &Value::Null, &[json!("write")]).unwrap();
    assert_eq!(res.state, Some(json!(1)));

    let res = checked_call(&op, "in", Value::Null, &Value::Null, &[json!("emit")]).unwrap();
    assert_eq!(res.emit.len(), 1);
}

#[test]
fn port_indices_follow_declaration_order() {
    let op = Probe::with_info(CallbackInfo::pure());
    assert_eq!(op.in_port_index(&PortName::new("in")), Some(0));
    assert_eq!(op.out_port_index(&PortName::new("out")), Some(0));
    assert_eq!(op.in_port_index(&PortName::new("ghost")), None);
}

#[test]
fn state_init_thunk_is_deferred() {
    let init = StateInit::Thunk(Arc::new(|| json!([1, 2])));
    assert_eq!(init.resolve(), json!([1, 2]));
    let eager: StateInit = json!(0).into();
    assert_eq!(eager.resolve(), json!(0));
}
