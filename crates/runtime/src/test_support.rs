// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test support: canned operations, a collecting sink, and in-process
//! cluster builders used by this crate's tests and the workspace specs.

// Harness code is only ever driven by tests; panicking on broken setup is
// the point.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::runtime::Runtime;
use crate::strategies::{self, ImmutableLocal};
use async_trait::async_trait;
use parking_lot::Mutex;
use rill_cluster::{Cluster, LoopbackNet, LoopbackTransport};
use rill_core::{
    CallbackInfo, CallbackResult, Context, Emit, NodeName, Operation, OperationError, PortIndex,
    PortName, ProcessResult, Registry, StateInit, Strategy, StrategyError, Tag, ValueSeq,
};
use rill_wire::Mode;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

type CallbackFn =
    Arc<dyn Fn(Value, &Value, &[Value]) -> Result<CallbackResult, OperationError> + Send + Sync>;

/// Operation assembled from closures, for tests and examples.
pub struct FnOperation {
    name: String,
    ins: Vec<PortName>,
    outs: Vec<PortName>,
    default_strategy: Option<String>,
    initial: Value,
    callbacks: HashMap<String, (usize, CallbackInfo, CallbackFn)>,
}

impl FnOperation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ins: Vec::new(),
            outs: Vec::new(),
            default_strategy: None,
            initial: Value::Null,
            callbacks: HashMap::new(),
        }
    }

    pub fn ports(mut self, ins: &[&str], outs: &[&str]) -> Self {
        self.ins = ins.iter().map(|p| PortName::new(p)).collect();
        self.outs = outs.iter().map(|p| PortName::new(p)).collect();
        self
    }

    pub fn with_default_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.default_strategy = Some(strategy.into());
        self
    }

    pub fn initial(mut self, state: Value) -> Self {
        self.initial = state;
        self
    }

    pub fn callback<F>(mut self, name: &str, arity: usize, info: CallbackInfo, f: F) -> Self
    where
        F: Fn(Value, &Value, &[Value]) -> Result<CallbackResult, OperationError>
            + Send
            + Sync
            + 'static,
    {
        self.callbacks.insert(name.to_string(), (arity, info, Arc::new(f)));
        self
    }

    pub fn build(self) -> Arc<dyn Operation> {
        Arc::new(self)
    }
}

impl Operation for FnOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn in_ports(&self) -> &[PortName] {
        &self.ins
    }

    fn out_ports(&self) -> &[PortName] {
        &self.outs
    }

    fn default_strategy(&self) -> Option<&str> {
        self.default_strategy.as_deref()
    }

    fn initial_state(&self) -> StateInit {
        StateInit::Value(self.initial.clone())
    }

    fn callback_info(&self, name: &str, arity: usize) -> Option<CallbackInfo> {
        let (declared, info, _) = self.callbacks.get(name)?;
        (*declared == arity).then_some(*info)
    }

    fn call(
        &self,
        name: &str,
        state: Value,
        config: &Value,
        args: &[Value],
    ) -> Result<CallbackResult, OperationError> {
        let (_, _, f) = self.callbacks.get(name).ok_or_else(|| {
            OperationError::UnknownCallback {
                operation: self.name.clone(),
                callback: name.to_string(),
                arity: args.len(),
            }
        })?;
        f(state, config, args)
    }
}

/// Shared list a sink operation appends into.
#[derive(Clone, Default)]
pub struct SharedSink(Arc<Mutex<Vec<Value>>>);

impl SharedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, value: Value) {
        self.0.lock().push(value);
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Poll until the sink holds at least `n` values. Returns false on
    /// timeout.
    pub async fn wait_len(&self, n: usize, timeout: Duration) -> bool {
        wait_until(|| self.len() >= n, timeout).await
    }
}

/// Poll a condition every few milliseconds until it holds or the timeout
/// elapses.
pub async fn wait_until(condition: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Stream source emitting a fixed list of numbers, lazily.
pub fn numbers(values: Vec<i64>) -> Arc<dyn Operation> {
    FnOperation::new("numbers")
        .ports(&[], &["out"])
        .with_default_strategy("stream_source")
        .callback("stream", 0, CallbackInfo::pure().emits(), move |_state, _cfg, _args| {
            let values = values.clone();
            let mut emit = Emit::new();
            emit.insert("out", ValueSeq::lazy(values.into_iter().map(|v| json!(v))));
            Ok(CallbackResult::result(Value::Null).with_emit(emit))
        })
        .build()
}

/// Stateless one-in-one-out operation: emits its input unchanged.
pub fn identity() -> Arc<dyn Operation> {
    FnOperation::new("identity")
        .ports(&["in"], &["out"])
        .with_default_strategy("immutable_local")
        .callback("in", 1, CallbackInfo::pure().emits(), |_state, _cfg, args| {
            let value = args.first().cloned().unwrap_or(Value::Null);
            Ok(CallbackResult::result(Value::Null).with_emit(Emit::value("out", value)))
        })
        .build()
}

/// Passive source: doubles every value pushed in from outside.
pub fn reader() -> Arc<dyn Operation> {
    FnOperation::new("reader")
        .ports(&[], &["out"])
        .with_default_strategy("passive_source")
        .callback("read", 1, CallbackInfo::pure().emits(), |_state, _cfg, args| {
            let v = args.first().and_then(Value::as_i64).unwrap_or(0);
            Ok(CallbackResult::result(Value::Null).with_emit(Emit::value("out", json!(v * 2))))
        })
        .build()
}

/// Sink appending every value to a [`SharedSink`].
pub fn collector(sink: &SharedSink) -> Arc<dyn Operation> {
    let sink = sink.clone();
    FnOperation::new("collect")
        .ports(&["in"], &[])
        .with_default_strategy("immutable_local")
        .callback("in", 1, CallbackInfo::pure(), move |_state, _cfg, args| {
            sink.push(args.first().cloned().unwrap_or(Value::Null));
            Ok(CallbackResult::result(Value::Null))
        })
        .build()
}

/// Keyed running sum: keys by `x mod 2`, emits `{key, sum}` records.
pub fn keyed_sum() -> Arc<dyn Operation> {
    FnOperation::new("keyed_sum")
        .ports(&["in"], &["out"])
        .with_default_strategy("keyed_state")
        .initial(json!(0))
        .callback("key", 1, CallbackInfo::pure(), |_state, _cfg, args| {
            let v = args.first().and_then(Value::as_i64).unwrap_or(0);
            Ok(CallbackResult::result(json!(v % 2)))
        })
        .callback("in", 2, CallbackInfo::reads_writes().emits(), |state, _cfg, args| {
            let v = args.first().and_then(Value::as_i64).unwrap_or(0);
            let key = args.get(1).cloned().unwrap_or(Value::Null);
            let sum = state.as_i64().unwrap_or(0) + v;
            Ok(CallbackResult::result(Value::Null)
                .with_state(json!(sum))
                .with_emit(Emit::value("out", json!({ "key": key, "sum": sum }))))
        })
        .build()
}

/// Stateful counter: increments per value and emits the count. A value of
/// `"boom"` makes the callback fail, crashing the hosting worker.
pub fn counter() -> Arc<dyn Operation> {
    FnOperation::new("counter")
        .ports(&["in"], &["out"])
        .with_default_strategy("immutable_local")
        .initial(json!(0))
        .callback("in", 1, CallbackInfo::reads_writes().emits(), |state, _cfg, args| {
            if args.first() == Some(&json!("boom")) {
                return Err(OperationError::Failed {
                    callback: "in".into(),
                    reason: "boom".into(),
                });
            }
            let count = state.as_i64().unwrap_or(0) + 1;
            Ok(CallbackResult::result(Value::Null)
                .with_state(json!(count))
                .with_emit(Emit::value("out", json!(count))))
        })
        .build()
}

/// Like `ImmutableLocal`, with a configurable pause inside `deploy`.
/// Exercises the deploy barrier: values queued at workers must not be
/// processed while another node is still deploying.
pub struct SlowDeploy;

#[async_trait]
impl Strategy for SlowDeploy {
    fn name(&self) -> &str {
        "slow_deploy"
    }

    async fn deploy(&self, ctx: &Context) -> Result<Value, StrategyError> {
        let delay = ctx.args.get("delay_ms").and_then(Value::as_u64).unwrap_or(100);
        let deployment = ImmutableLocal.deploy(ctx).await?;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(deployment)
    }

    fn deliver(&self, ctx: &Context, value: Value, port: PortIndex) -> Result<(), StrategyError> {
        ImmutableLocal.deliver(ctx, value, port)
    }

    fn process(
        &self,
        ctx: &Context,
        message: Value,
        state: Value,
        tag: &Tag,
    ) -> Result<ProcessResult, StrategyError> {
        ImmutableLocal.process(ctx, message, state, tag)
    }
}

/// Strategy whose `deploy` always fails, for rollback tests.
pub struct FailingDeploy;

#[async_trait]
impl Strategy for FailingDeploy {
    fn name(&self) -> &str {
        "failing_deploy"
    }

    async fn deploy(&self, _ctx: &Context) -> Result<Value, StrategyError> {
        Err(StrategyError::Malformed {
            strategy: "failing_deploy".into(),
            reason: "induced deploy failure".into(),
        })
    }

    fn deliver(&self, _ctx: &Context, _value: Value, _port: PortIndex) -> Result<(), StrategyError> {
        Ok(())
    }

    fn process(
        &self,
        _ctx: &Context,
        _message: Value,
        _state: Value,
        _tag: &Tag,
    ) -> Result<ProcessResult, StrategyError> {
        Ok(ProcessResult::none())
    }
}

/// Registry with the built-in strategies plus the given operations.
pub fn registry_with(operations: Vec<Arc<dyn Operation>>) -> Arc<Registry> {
    let mut registry = Registry::new();
    strategies::register_builtin(&mut registry);
    registry.register_strategy(Arc::new(SlowDeploy));
    registry.register_strategy(Arc::new(FailingDeploy));
    for op in operations {
        registry.register_operation(op);
    }
    Arc::new(registry)
}

/// An in-process cluster: one master runtime plus workers, wired over a
/// shared loopback net.
pub struct TestHarness {
    pub net: Arc<LoopbackNet>,
    pub master: Runtime,
    pub workers: Vec<Runtime>,
    registry: Arc<Registry>,
}

/// Build a runtime and register it on the net.
pub fn runtime_on(
    net: &Arc<LoopbackNet>,
    name: &str,
    mode: Mode,
    registry: Arc<Registry>,
) -> Runtime {
    let transport: Arc<dyn rill_cluster::Transport> = LoopbackTransport::new(Arc::clone(net));
    let cluster = Cluster::new(NodeName::new(name), mode, vec![], Some(transport));
    let runtime = Runtime::new(cluster, registry);
    net.register(NodeName::new(name), runtime.handler());
    runtime
}

/// Build a master plus `workers` worker runtimes, all connected.
pub async fn harness(registry: Arc<Registry>, workers: usize) -> TestHarness {
    let net = LoopbackNet::new();
    let master = runtime_on(&net, "master@loop", Mode::Master, Arc::clone(&registry));
    let mut list = Vec::new();
    for i in 0..workers {
        let name = format!("w{i}@loop");
        let worker = runtime_on(&net, &name, Mode::Worker, Arc::clone(&registry));
        master
            .cluster()
            .connect(&NodeName::new(name), Some(Mode::Worker))
            .await
            .expect("worker connect");
        list.push(worker);
    }
    TestHarness { net, master, workers: list, registry }
}

impl TestHarness {
    /// A single-runtime "cluster" in local mode.
    pub async fn local(registry: Arc<Registry>) -> Self {
        let net = LoopbackNet::new();
        let master = runtime_on(&net, "local@loop", Mode::Local, Arc::clone(&registry));
        Self { net, master, workers: Vec::new(), registry }
    }

    /// Join another worker after deploy (late join).
    pub async fn add_worker(&mut self, name: &str) -> &Runtime {
        let worker = runtime_on(&self.net, name, Mode::Worker, Arc::clone(&self.registry));
        self.master
            .cluster()
            .connect(&NodeName::new(name), Some(Mode::Worker))
            .await
            .expect("late worker connect");
        self.workers.push(worker);
        self.workers.last().expect("just pushed")
    }
}
