// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed records carried by server push messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A vehicle's place in a route's boarding queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleQueueUpdate {
    pub route_id: String,
    pub vehicle_id: String,
    pub vehicle_registration: String,
    pub queue_position: u32,
    pub estimated_departure_minutes: u32,
    pub available_seats: u32,
    pub total_seats: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sacco_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
}

/// A GPS fix for a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePositionUpdate {
    pub vehicle_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: f64,
    pub speed: f64,
    pub timestamp: DateTime<Utc>,
}

/// Lifecycle of a passenger trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TripStatus {
    Booked,
    Boarding,
    InTransit,
    Approaching,
    Arrived,
    Completed,
    Cancelled,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

/// A change in a passenger trip's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStatusChange {
    pub trip_id: String,
    pub user_id: String,
    pub status: TripStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Names of the push targets the server calls on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushTarget {
    VehicleQueueUpdate,
    VehiclePositionUpdate,
    TripStatusChange,
}

impl PushTarget {
    pub const ALL: [PushTarget; 3] = [
        PushTarget::VehicleQueueUpdate,
        PushTarget::VehiclePositionUpdate,
        PushTarget::TripStatusChange,
    ];

    /// Returns the target name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            PushTarget::VehicleQueueUpdate => "VehicleQueueUpdate",
            PushTarget::VehiclePositionUpdate => "VehiclePositionUpdate",
            PushTarget::TripStatusChange => "TripStatusChange",
        }
    }

    /// Looks up a wire target name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

/// A decoded push message.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    VehicleQueueUpdate(VehicleQueueUpdate),
    VehiclePositionUpdate(VehiclePositionUpdate),
    TripStatusChange(TripStatusChange),
}

impl PushMessage {
    /// Maps a raw payload onto the record for `target`.
    ///
    /// Fails with [`Error::Deserialization`] when the target is unknown or the
    /// payload does not match the record.
    pub fn decode(target: &str, payload: Value) -> Result<Self> {
        let kind = PushTarget::parse(target)
            .ok_or_else(|| Error::Deserialization(format!("unknown push target '{target}'")))?;
        let malformed = |e: serde_json::Error| Error::Deserialization(format!("{target}: {e}"));
        Ok(match kind {
            PushTarget::VehicleQueueUpdate => {
                PushMessage::VehicleQueueUpdate(serde_json::from_value(payload).map_err(malformed)?)
            }
            PushTarget::VehiclePositionUpdate => PushMessage::VehiclePositionUpdate(
                serde_json::from_value(payload).map_err(malformed)?,
            ),
            PushTarget::TripStatusChange => {
                PushMessage::TripStatusChange(serde_json::from_value(payload).map_err(malformed)?)
            }
        })
    }

    pub fn target(&self) -> PushTarget {
        match self {
            PushMessage::VehicleQueueUpdate(_) => PushTarget::VehicleQueueUpdate,
            PushMessage::VehiclePositionUpdate(_) => PushTarget::VehiclePositionUpdate,
            PushMessage::TripStatusChange(_) => PushTarget::TripStatusChange,
        }
    }
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
