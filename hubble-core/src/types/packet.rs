//! Captured and decrypted packet types.
//!
//! These are the values exchanged with the scanner (which produces
//! [`EncryptedPacket`]s) and with whatever consumes recovered telemetry
//! ([`DecryptedPacket`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::time::{SequenceCounter, TimeCounter};

/// Geographic fix attached to a capture.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude in meters
    #[serde(default)]
    pub altitude: f64,
    /// Horizontal accuracy in meters
    #[serde(default)]
    pub horizontal_accuracy: f64,
    /// Vertical accuracy in meters
    #[serde(default)]
    pub vertical_accuracy: f64,
    /// When the fix was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A raw advertisement captured by the scanner.
///
/// The payload is still encrypted; this is also the form uploaded for cloud
/// ingestion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EncryptedPacket {
    /// Raw advertisement bytes in wire format
    #[serde(with = "hex")]
    pub payload: Vec<u8>,
    /// Received signal strength in dBm
    #[serde(default)]
    pub rssi: i32,
    /// Receive time, used as the default expected time when decrypting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Where the packet was heard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl EncryptedPacket {
    /// Wraps raw advertisement bytes with no capture metadata.
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    /// Parses a hex-encoded payload.
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self::new(hex::decode(s.trim())?))
    }

    /// Sets the receive timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the received signal strength.
    pub fn with_rssi(mut self, rssi: i32) -> Self {
        self.rssi = rssi;
        self
    }

    /// Sets the capture location.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Returns the payload as lowercase hex.
    pub fn payload_hex(&self) -> String {
        hex::encode(&self.payload)
    }
}

/// A successfully decrypted packet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecryptedPacket {
    /// Device the key belongs to, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Recovered plaintext
    #[serde(with = "hex")]
    pub payload: Vec<u8>,
    /// Day whose key schedule authenticated the packet
    pub time_counter: TimeCounter,
    /// Sequence counter from the header
    pub sequence_number: SequenceCounter,
    /// Receive time of the source capture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Capture location of the source capture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl DecryptedPacket {
    /// Returns the plaintext as lowercase hex.
    pub fn payload_hex(&self) -> String {
        hex::encode(&self.payload)
    }
}
