// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One worker on the deploying runtime; every in-port forwards to it.

use super::{deployment_value, worker_from};
use async_trait::async_trait;
use rill_core::{
    checked_call, Context, PortIndex, ProcessResult, Strategy, StrategyError, StrategyServices,
    Tag,
};
use serde_json::{json, Value};

/// The workhorse strategy: a single worker holding the operation's state,
/// created at deploy on the deploying runtime. Values arriving on in-port
/// `i` invoke the operation callback named after that in-port.
pub struct ImmutableLocal;

pub(crate) const NAME: &str = "immutable_local";

#[async_trait]
impl Strategy for ImmutableLocal {
    fn name(&self) -> &str {
        NAME
    }

    async fn deploy(&self, ctx: &Context) -> Result<Value, StrategyError> {
        let worker = ctx.services().create_local(
            ctx,
            ctx.operation.initial_state(),
            Tag::new("worker"),
        )?;
        deployment_value(NAME, &worker)
    }

    fn deliver(&self, ctx: &Context, value: Value, port: PortIndex) -> Result<(), StrategyError> {
        let worker = worker_from(NAME, ctx.deployment()?)?;
        let message = json!({ "port": port, "data": value });
        ctx.services().send(&worker, message, ctx.invocation.clone());
        Ok(())
    }

    fn process(
        &self,
        ctx: &Context,
        message: Value,
        state: Value,
        _tag: &Tag,
    ) -> Result<ProcessResult, StrategyError> {
        let port = message
            .get("port")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("message has no port"))? as usize;
        let data = message.get("data").cloned().ok_or_else(|| malformed("message has no data"))?;
        let callback = ctx
            .operation
            .in_ports()
            .get(port)
            .ok_or_else(|| malformed("port out of range"))?
            .as_str()
            .to_string();

        let result = checked_call(&ctx.operation, &callback, state, &ctx.args, &[data])?;
        Ok(ProcessResult { state: result.state, emit: Some(result.emit), emit_invocation: None })
    }
}

fn malformed(reason: &str) -> StrategyError {
    StrategyError::Malformed { strategy: NAME.to_string(), reason: reason.to_string() }
}
