//! Messages exchanged with browser clients over the real-time transport.
//!
//! The transport layer itself lives outside this crate; these types fix the
//! JSON shape it sends so that frames produced by the pipeline can be
//! forwarded without reshaping.

use serde::{Deserialize, Serialize};

use super::TransportFrame;

/// Flight state reported in drone telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightState {
    Landed,
    Flying,
    Hovering,
    Error,
    Unknown,
}

/// Telemetry snapshot broadcast alongside video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneTelemetry {
    pub battery_percentage: u8,
    pub flight_state: FlightState,
    pub wifi_signal_strength: f64,
}

/// Envelope for every message pushed to clients.
///
/// `timestamp` is the send time in milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportMessage {
    Video {
        data: TransportFrame,
        timestamp: u64,
    },
    Telemetry {
        data: DroneTelemetry,
        timestamp: u64,
    },
    Connection {
        message: String,
        #[serde(rename = "droneConnected")]
        drone_connected: bool,
    },
    Ack {
        message: String,
    },
}

impl TransportMessage {
    /// Wrap a transcoded frame for sending
    pub fn video(data: TransportFrame, timestamp: u64) -> Self {
        TransportMessage::Video { data, timestamp }
    }

    /// Serialize to the JSON text sent over the socket
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
