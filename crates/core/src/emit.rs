// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Emit maps: values produced on named out-ports.
//!
//! A callback or `process` hook hands the router an [`Emit`]: an ordered
//! mapping from out-port name to a sequence of values. Sequences may be
//! eager vectors or lazy iterators; the router pulls lazily, so a source
//! can stream a large enumerable without materialising it.

use crate::port::PortName;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// A sequence of values bound for one out-port.
pub enum ValueSeq {
    /// Already-materialised values.
    Values(Vec<Value>),
    /// Lazily-produced values, pulled one at a time by the router.
    Lazy(Box<dyn Iterator<Item = Value> + Send>),
}

impl ValueSeq {
    pub fn single(value: Value) -> Self {
        Self::Values(vec![value])
    }

    pub fn lazy<I>(iter: I) -> Self
    where
        I: Iterator<Item = Value> + Send + 'static,
    {
        Self::Lazy(Box::new(iter))
    }

    /// Eager length, when known without pulling.
    pub fn known_len(&self) -> Option<usize> {
        match self {
            Self::Values(v) => Some(v.len()),
            Self::Lazy(_) => None,
        }
    }
}

impl From<Vec<Value>> for ValueSeq {
    fn from(values: Vec<Value>) -> Self {
        Self::Values(values)
    }
}

impl IntoIterator for ValueSeq {
    type Item = Value;
    type IntoIter = Box<dyn Iterator<Item = Value> + Send>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            Self::Values(v) => Box::new(v.into_iter()),
            Self::Lazy(it) => it,
        }
    }
}

impl fmt::Debug for ValueSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Values(v) => f.debug_tuple("Values").field(v).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Ordered out-port → value-sequence map.
#[derive(Debug, Default)]
pub struct Emit(IndexMap<PortName, ValueSeq>);

impl Emit {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Single value on a single port.
    pub fn value(port: impl Into<PortName>, value: Value) -> Self {
        let mut emit = Self::new();
        emit.push(port, value);
        emit
    }

    /// Append one value to a port, preserving port order.
    pub fn push(&mut self, port: impl Into<PortName>, value: Value) {
        match self.0.entry(port.into()).or_insert_with(|| ValueSeq::Values(Vec::new())) {
            ValueSeq::Values(v) => v.push(value),
            ValueSeq::Lazy(_) => {
                // A port is either lazy or eager; mixing is a programmer
                // error on the operation side. Keep the lazy tail.
            }
        }
    }

    /// Bind a whole sequence to a port, replacing any previous binding.
    pub fn insert(&mut self, port: impl Into<PortName>, seq: ValueSeq) {
        self.0.insert(port.into(), seq);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (PortName, ValueSeq)> {
        self.0.into_iter()
    }
}

impl<P: Into<PortName>> FromIterator<(P, Vec<Value>)> for Emit {
    fn from_iter<T: IntoIterator<Item = (P, Vec<Value>)>>(iter: T) -> Self {
        let mut emit = Self::new();
        for (port, values) in iter {
            emit.insert(port, ValueSeq::Values(values));
        }
        emit
    }
}

/// Emit variant that carries a per-value invocation, used when a strategy
/// re-emits values whose metadata must survive unchanged.
#[derive(Debug, Default)]
pub struct EmitWithInvocation(IndexMap<PortName, Vec<(Value, Option<Value>)>>);

impl EmitWithInvocation {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn push(&mut self, port: impl Into<PortName>, value: Value, invocation: Option<Value>) {
        self.0.entry(port.into()).or_default().push((value, invocation));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (PortName, Vec<(Value, Option<Value>)>)> {
        self.0.into_iter()
    }
}

#[cfg(test)]
#[path = "emit_tests.rs"]
mod tests;
