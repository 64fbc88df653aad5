// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use yare::parameterized;

fn queue_update_payload() -> Value {
    json!({
        "routeId": "r-46",
        "vehicleId": "v-1",
        "vehicleRegistration": "KDA 123X",
        "queuePosition": 2,
        "estimatedDepartureMinutes": 7,
        "availableSeats": 5,
        "totalSeats": 14,
        "saccoName": "Super Metro"
    })
}

#[test]
fn decodes_vehicle_queue_update() {
    let msg = PushMessage::decode("VehicleQueueUpdate", queue_update_payload()).unwrap();
    match msg {
        PushMessage::VehicleQueueUpdate(update) => {
            assert_eq!(update.route_id, "r-46");
            assert_eq!(update.queue_position, 2);
            assert_eq!(update.sacco_name.as_deref(), Some("Super Metro"));
            assert!(update.driver_name.is_none());
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn decodes_vehicle_position_update() {
    let payload = json!({
        "vehicleId": "v-1",
        "latitude": -1.2921,
        "longitude": 36.8219,
        "heading": 90.0,
        "speed": 32.5,
        "timestamp": "2026-03-01T08:00:00Z"
    });
    let msg = PushMessage::decode("VehiclePositionUpdate", payload).unwrap();
    assert_eq!(msg.target(), PushTarget::VehiclePositionUpdate);
}

#[parameterized(
    in_transit = { "inTransit", TripStatus::InTransit },
    boarding = { "boarding", TripStatus::Boarding },
    unknown = { "unknown", TripStatus::Unknown },
    future_value = { "teleported", TripStatus::Unknown },
)]
fn decodes_trip_status(raw: &str, expected: TripStatus) {
    let payload = json!({
        "tripId": "t-1",
        "userId": "u-1",
        "status": raw,
        "timestamp": "2026-03-01T08:00:00Z"
    });
    match PushMessage::decode("TripStatusChange", payload).unwrap() {
        PushMessage::TripStatusChange(change) => assert_eq!(change.status, expected),
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn malformed_payload_is_deserialization_error() {
    let err = PushMessage::decode("VehicleQueueUpdate", json!({"routeId": 7})).unwrap_err();
    assert!(matches!(err, Error::Deserialization(_)));
    assert!(err.to_string().contains("VehicleQueueUpdate"));
}

#[test]
fn unknown_target_is_deserialization_error() {
    let err = PushMessage::decode("FareChange", json!({})).unwrap_err();
    assert!(matches!(err, Error::Deserialization(_)));
}

#[test]
fn target_names_round_trip() {
    for target in PushTarget::ALL {
        assert_eq!(PushTarget::parse(target.as_str()), Some(target));
    }
    assert_eq!(PushTarget::parse("vehiclequeueupdate"), None);
}
