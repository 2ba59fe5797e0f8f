// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rill-runtime: the engine.
//!
//! Deploys workflows across the cluster (deployer), hosts long-lived
//! per-operation workers with message-driven state (worker + supervisor),
//! routes emitted values along graph links (router), keeps per-workflow
//! constants readable without locks (store), and mirrors deployments to
//! late-joining nodes (manager). Built-in strategies live under
//! [`strategies`].

mod deployer;
mod error;
mod handler;
mod manager;
mod router;
mod runtime;
mod services;
mod store;
pub mod strategies;
mod supervisor;
mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use deployer::DeployError;
pub use error::RuntimeError;
pub use runtime::Runtime;
pub use services::RuntimeCore;
pub use store::{ConstantStore, LinkTable};
pub use supervisor::RestartPolicy;
pub use worker::WorkerMsg;
