// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port identifiers.
//!
//! A port name labels an operation's in- or out-port; a port index is its
//! ordinal position in the operation's port list, used on hot paths so the
//! router never compares strings per value.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Borrow;
use std::fmt;

/// Ordinal position of a port in an operation's port list.
pub type PortIndex = usize;

/// Name of an in- or out-port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortName(SmolStr);

impl PortName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(SmolStr::new(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PortName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PortName {
    fn from(s: String) -> Self {
        Self(SmolStr::new(&s))
    }
}

impl PartialEq<str> for PortName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PortName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for PortName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Build a port list from string literals.
pub fn ports(names: &[&str]) -> Vec<PortName> {
    names.iter().map(|n| PortName::new(n)).collect()
}
