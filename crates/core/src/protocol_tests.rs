// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;

#[test]
fn join_wire_format() {
    let json = ClientMessage::join(7, "r-46").to_json().unwrap();
    let value: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value, json!({"type": "join_queue_updates", "id": 7, "routeId": "r-46"}));
}

#[test]
fn ping_wire_format() {
    let json = ClientMessage::ping(3).to_json().unwrap();
    assert_eq!(json, r#"{"type":"ping","id":3}"#);
}

#[test]
fn client_message_roundtrip() {
    let msg = ClientMessage::leave(9, "r-12");
    let parsed = ClientMessage::from_json(&msg.to_json().unwrap()).unwrap();
    assert_eq!(parsed, msg);
    assert_eq!(parsed.id(), 9);
}

#[test]
fn completion_without_error_omits_field() {
    let json = ServerMessage::completion(4).to_json().unwrap();
    assert_eq!(json, r#"{"type":"completion","id":4}"#);
}

#[test]
fn completion_error_parses() {
    let msg = ServerMessage::from_json(r#"{"type":"completion","id":4,"error":"no such route"}"#)
        .unwrap();
    assert_eq!(msg, ServerMessage::completion_error(4, "no such route"));
}

#[test]
fn push_keeps_payload_raw() {
    let raw = r#"{"type":"push","target":"VehicleQueueUpdate","payload":{"routeId":42}}"#;
    let msg = ServerMessage::from_json(raw).unwrap();
    match msg {
        ServerMessage::Push { target, payload } => {
            assert_eq!(target, "VehicleQueueUpdate");
            assert_eq!(payload["routeId"], 42);
        }
        ServerMessage::Completion { .. } => unreachable!(),
    }
}

#[test]
fn unknown_message_type_fails() {
    assert!(ServerMessage::from_json(r#"{"type":"snapshot"}"#).is_err());
}
