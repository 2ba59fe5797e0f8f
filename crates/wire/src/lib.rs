// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inter-node protocol for rill runtimes.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod frame;
mod mode;
mod request;
mod response;

pub use frame::{decode, encode, read_message, write_message, ProtocolError, MAX_FRAME};
pub use mode::Mode;
pub use request::{LinksSpec, Request, StorePayload};
pub use response::{Response, StatusReport};

/// Protocol version advertised in the beacon (from Cargo.toml).
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");
