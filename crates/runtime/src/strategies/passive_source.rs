// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source driven by values pushed in from outside the workflow.

use super::{deployment_value, worker_from};
use async_trait::async_trait;
use rill_core::{
    checked_call, Context, PortIndex, ProcessResult, Strategy, StrategyError, StrategyServices,
    Tag,
};
use serde_json::{json, Value};

/// Passive source: one worker on the deploying runtime. Every value sent
/// to the node from outside (`Runtime::send`) invokes the operation's
/// `read` callback, whose emits feed the workflow.
pub struct PassiveSource;

pub(crate) const NAME: &str = "passive_source";

#[async_trait]
impl Strategy for PassiveSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn deploy(&self, ctx: &Context) -> Result<Value, StrategyError> {
        let worker = ctx.services().create_local(
            ctx,
            ctx.operation.initial_state(),
            Tag::new("source"),
        )?;
        deployment_value(NAME, &worker)
    }

    fn deliver(&self, ctx: &Context, value: Value, _port: PortIndex) -> Result<(), StrategyError> {
        let worker = worker_from(NAME, ctx.deployment()?)?;
        ctx.services().send(&worker, json!({ "data": value }), ctx.invocation.clone());
        Ok(())
    }

    fn process(
        &self,
        ctx: &Context,
        message: Value,
        state: Value,
        _tag: &Tag,
    ) -> Result<ProcessResult, StrategyError> {
        let data = message.get("data").cloned().ok_or_else(|| StrategyError::Malformed {
            strategy: NAME.to_string(),
            reason: "message has no data".to_string(),
        })?;
        let result = checked_call(&ctx.operation, "read", state, &ctx.args, &[data])?;
        Ok(ProcessResult { state: result.state, emit: Some(result.emit), emit_invocation: None })
    }
}
