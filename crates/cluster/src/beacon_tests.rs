// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Beacon tests

use super::*;

#[test]
fn beacon_accepts_own_version() {
    let beacon = Beacon::new(Mode::Master, vec![]);
    assert!(beacon.accepts(PROTOCOL_VERSION));
    assert!(!beacon.accepts("0.0.0-nope"));
}

#[test]
fn beacon_accepts_explicit_compatible_versions() {
    let mut beacon = Beacon::new(Mode::Worker, vec![]);
    beacon.compatible.push("9.9.9".into());
    assert!(beacon.accepts("9.9.9"));
}

#[test]
fn beacon_response_carries_mode_and_tags() {
    let beacon = Beacon::new(Mode::Worker, vec![Tag::new("gpu")]);
    match beacon.to_response() {
        Response::Beacon { mode, tags, .. } => {
            assert_eq!(mode, Mode::Worker);
            assert_eq!(tags, vec![Tag::new("gpu")]);
        }
        other => panic!("unexpected response {other:?}"),
    }
}
