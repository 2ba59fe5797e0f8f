// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source that streams an enumerable as soon as the workflow is live.

use super::{deployment_value, worker_from};
use async_trait::async_trait;
use rill_core::{
    checked_call, Context, PortIndex, ProcessResult, Strategy, StrategyError, StrategyServices,
    Tag,
};
use serde_json::{json, Value};

/// Stream source: one worker on the deploying runtime, kicked with a
/// start message at deploy. The kick waits in the worker's pending queue
/// until the barrier releases, so the operation's `stream` callback runs
/// exactly when the workflow goes live. The callback may return a lazy
/// sequence; the router pulls it value by value.
pub struct StreamSource;

pub(crate) const NAME: &str = "stream_source";

#[async_trait]
impl Strategy for StreamSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn deploy(&self, ctx: &Context) -> Result<Value, StrategyError> {
        let worker = ctx.services().create_local(
            ctx,
            ctx.operation.initial_state(),
            Tag::new("source"),
        )?;
        ctx.services().send(&worker, json!("start"), None);
        deployment_value(NAME, &worker)
    }

    fn deliver(&self, ctx: &Context, _value: Value, _port: PortIndex) -> Result<(), StrategyError> {
        // A delivered value re-kicks the stream.
        let worker = worker_from(NAME, ctx.deployment()?)?;
        ctx.services().send(&worker, json!("start"), ctx.invocation.clone());
        Ok(())
    }

    fn process(
        &self,
        ctx: &Context,
        _message: Value,
        state: Value,
        _tag: &Tag,
    ) -> Result<ProcessResult, StrategyError> {
        let result = checked_call(&ctx.operation, "stream", state, &ctx.args, &[])?;
        Ok(ProcessResult { state: result.state, emit: Some(result.emit), emit_invocation: None })
    }
}
