// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The operation contract.
//!
//! An operation is the data-processing unit of a workflow node: ordered
//! in/out ports, an initial state, and a table of named callbacks. The
//! runtime never inspects an operation beyond this trait; strategies invoke
//! callbacks through [`checked_call`], which enforces the declared
//! state/emit permissions.

use crate::emit::Emit;
use crate::port::{PortIndex, PortName};
use crate::strategy::StrategyError;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Declared capabilities of a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallbackInfo {
    pub reads_state: bool,
    pub writes_state: bool,
    pub emits: bool,
}

impl CallbackInfo {
    /// Callback that only computes a result.
    pub fn pure() -> Self {
        Self::default()
    }

    pub fn reads() -> Self {
        Self { reads_state: true, ..Self::default() }
    }

    pub fn reads_writes() -> Self {
        Self { reads_state: true, writes_state: true, emits: false }
    }

    pub fn emits(mut self) -> Self {
        self.emits = true;
        self
    }
}

/// Value returned by a callback invocation.
#[derive(Debug, Default)]
pub struct CallbackResult {
    /// Replacement state, when the callback writes state.
    pub state: Option<Value>,
    /// Values to emit on out-ports.
    pub emit: Emit,
    /// The callback's own return value.
    pub result: Value,
}

impl CallbackResult {
    pub fn result(value: Value) -> Self {
        Self { result: value, ..Self::default() }
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_emit(mut self, emit: Emit) -> Self {
        self.emit = emit;
        self
    }
}

/// Initial state of a worker: an eager value or a thunk forced when the
/// worker finishes initialising.
#[derive(Clone)]
pub enum StateInit {
    Value(Value),
    Thunk(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl StateInit {
    pub fn resolve(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Thunk(f) => f(),
        }
    }
}

impl Default for StateInit {
    fn default() -> Self {
        Self::Value(Value::Null)
    }
}

impl From<Value> for StateInit {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl std::fmt::Debug for StateInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Thunk(_) => f.write_str("Thunk(..)"),
        }
    }
}

/// Errors surfaced by operation callbacks.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("operation {operation} has no callback {callback}/{arity}")]
    UnknownCallback { operation: String, callback: String, arity: usize },

    #[error("callback {callback} failed: {reason}")]
    Failed { callback: String, reason: String },
}

/// A handle to a module-like data-processing unit.
pub trait Operation: Send + Sync {
    fn name(&self) -> &str;

    /// Ordered in-ports. The index of a port here is its [`PortIndex`].
    fn in_ports(&self) -> &[PortName];

    /// Ordered out-ports.
    fn out_ports(&self) -> &[PortName];

    /// Registry name of the strategy to use when the workflow node does not
    /// provide one.
    fn default_strategy(&self) -> Option<&str> {
        None
    }

    fn initial_state(&self) -> StateInit {
        StateInit::default()
    }

    /// Declared flags for a callback, or `None` if the operation has no such
    /// callback at that arity.
    fn callback_info(&self, name: &str, arity: usize) -> Option<CallbackInfo>;

    /// Invoke a callback. `config` is the node's deploy-time arguments.
    fn call(
        &self,
        name: &str,
        state: Value,
        config: &Value,
        args: &[Value],
    ) -> Result<CallbackResult, OperationError>;

    fn in_port_index(&self, port: &PortName) -> Option<PortIndex> {
        self.in_ports().iter().position(|p| p == port)
    }

    fn out_port_index(&self, port: &PortName) -> Option<PortIndex> {
        self.out_ports().iter().position(|p| p == port)
    }
}

/// Invoke a callback and enforce its declared permissions.
///
/// A callback that returns a state while declaring `writes_state: false`,
/// or emits while declaring `emits: false`, violated its own contract; the
/// violation surfaces synchronously instead of corrupting worker state.
pub fn checked_call(
    operation: &Arc<dyn Operation>,
    name: &str,
    state: Value,
    config: &Value,
    args: &[Value],
) -> Result<CallbackResult, StrategyError> {
    let info = operation.callback_info(name, args.len()).ok_or_else(|| {
        StrategyError::Operation(OperationError::UnknownCallback {
            operation: operation.name().to_string(),
            callback: name.to_string(),
            arity: args.len(),
        })
    })?;

    let result = operation.call(name, state, config, args)?;

    if result.state.is_some() && !info.writes_state {
        return Err(StrategyError::StateNotAllowed {
            operation: operation.name().to_string(),
            callback: name.to_string(),
        });
    }
    if !result.emit.is_empty() && !info.emits {
        return Err(StrategyError::EmitNotAllowed {
            operation: operation.name().to_string(),
            callback: name.to_string(),
        });
    }
    Ok(result)
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
