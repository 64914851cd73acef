//! Batch decryption of captured packets.
//!
//! Each packet is decrypted independently with its own expected time, so a
//! capture log spanning several days needs no special handling.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use hubble_core::error::{HubbleError, Result};
use hubble_core::types::{DecryptedPacket, EncryptedPacket, MasterKey};

use crate::decrypt::{decrypt, DecryptOptions};

/// How often the progress callback fires, in packets.
const PROGRESS_INTERVAL: u64 = 100;

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(BatchProgress) + Send + Sync>;

/// Outcome for a single packet of a batch.
#[derive(Debug)]
pub enum PacketOutcome {
    /// The packet decrypted under this key
    Decrypted(DecryptedPacket),
    /// No day in the window authenticated
    NotForKey,
    /// The packet could not be parsed
    Malformed(HubbleError),
    /// Key derivation broke; should never happen
    Error(HubbleError),
}

/// Batch statistics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DecryptStats {
    /// Packets processed
    pub total: u64,
    /// Packets that decrypted
    pub decrypted: u64,
    /// Packets that exhausted their search window
    pub failed: u64,
    /// Packets rejected before the search
    pub malformed: u64,
    /// Packets that hit an internal error
    pub errors: u64,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl DecryptStats {
    /// Creates a new stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one packet outcome.
    pub fn record(&mut self, outcome: &PacketOutcome) {
        self.total += 1;
        match outcome {
            PacketOutcome::Decrypted(_) => self.decrypted += 1,
            PacketOutcome::NotForKey => self.failed += 1,
            PacketOutcome::Malformed(_) => self.malformed += 1,
            PacketOutcome::Error(_) => self.errors += 1,
        }
    }

    /// Packets per second.
    pub fn rate(&self) -> f64 {
        if self.duration_ms == 0 {
            0.0
        } else {
            (self.total as f64 / self.duration_ms as f64) * 1000.0
        }
    }

    /// Percentage of processed packets that decrypted.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.decrypted as f64 / self.total as f64) * 100.0
        }
    }
}

/// Progress snapshot passed to the callback.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Packets in the batch
    pub total: u64,
    /// Packets processed so far
    pub processed: u64,
    /// Packets decrypted so far
    pub decrypted: u64,
    /// Percentage complete (0-100)
    pub percent: f64,
}

impl BatchProgress {
    fn new(total: u64) -> Self {
        Self {
            total,
            processed: 0,
            decrypted: 0,
            percent: 0.0,
        }
    }

    fn update(&mut self, processed: u64, decrypted: u64) {
        self.processed = processed;
        self.decrypted = decrypted;
        if self.total > 0 {
            self.percent = (processed as f64 / self.total as f64) * 100.0;
        }
    }
}

/// Result of a batch run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Decrypted packets, in input order
    pub packets: Vec<DecryptedPacket>,
    /// Counters for the run
    pub stats: DecryptStats,
}

/// Decrypts many captured packets with one master key.
pub struct BatchDecryptor {
    key: MasterKey,
    options: DecryptOptions,
    device_id: Option<String>,
    stop_on_first: bool,
}

impl BatchDecryptor {
    /// Creates a decryptor for `key`.
    ///
    /// # Errors
    ///
    /// [`HubbleError::InvalidKeySize`] unless `key` is 16 or 32 bytes.
    pub fn new(key: &[u8], options: DecryptOptions) -> Result<Self> {
        Ok(Self::from_key(MasterKey::from_bytes(key)?, options))
    }

    /// Creates a decryptor from an already validated key.
    pub fn from_key(key: MasterKey, options: DecryptOptions) -> Self {
        Self {
            key,
            options,
            device_id: None,
            stop_on_first: false,
        }
    }

    /// Tags every decrypted packet with a device id.
    pub fn device_id(mut self, id: impl Into<String>) -> Self {
        self.device_id = Some(id.into());
        self
    }

    /// Stops after the first packet that decrypts.
    pub fn stop_on_first(mut self) -> Self {
        self.stop_on_first = true;
        self
    }

    /// Search options applied to every packet.
    pub fn options(&self) -> &DecryptOptions {
        &self.options
    }

    /// Decrypts a single packet.
    pub fn decrypt_one(&self, packet: &EncryptedPacket) -> PacketOutcome {
        match decrypt(self.key.as_bytes(), packet, &self.options) {
            Ok(result) => {
                let mut decrypted = result.into_decrypted_packet(packet);
                decrypted.device_id = self.device_id.clone();
                PacketOutcome::Decrypted(decrypted)
            }
            Err(HubbleError::DecryptionFailed) => PacketOutcome::NotForKey,
            Err(e) if e.is_validation_error() => PacketOutcome::Malformed(e),
            Err(e) => PacketOutcome::Error(e),
        }
    }

    /// Decrypts every packet.
    #[instrument(skip(self, packets), fields(count = packets.len()))]
    pub fn decrypt_all(&self, packets: &[EncryptedPacket]) -> BatchSummary {
        self.run(packets, None)
    }

    /// Decrypts every packet, reporting progress every 100 packets and at the
    /// end if the final count was not already reported.
    #[instrument(skip(self, packets, progress_callback), fields(count = packets.len()))]
    pub fn decrypt_with_progress(
        &self,
        packets: &[EncryptedPacket],
        progress_callback: ProgressCallback,
    ) -> BatchSummary {
        self.run(packets, Some(&progress_callback))
    }

    fn run(
        &self,
        packets: &[EncryptedPacket],
        progress_callback: Option<&ProgressCallback>,
    ) -> BatchSummary {
        let start = Instant::now();
        let mut stats = DecryptStats::new();
        let mut decrypted = Vec::new();
        let mut progress = BatchProgress::new(packets.len() as u64);
        let mut reported = None;

        info!(window = self.options.search_window_days, "Starting batch");

        for (index, packet) in packets.iter().enumerate() {
            let outcome = self.decrypt_one(packet);
            stats.record(&outcome);

            match outcome {
                PacketOutcome::Decrypted(found) => decrypted.push(found),
                PacketOutcome::NotForKey => debug!(index, "packet not for this key"),
                PacketOutcome::Malformed(e) => debug!(index, error = %e, "malformed packet"),
                PacketOutcome::Error(e) => warn!(index, error = %e, "decryption error"),
            }

            if let Some(callback) = progress_callback {
                if stats.total % PROGRESS_INTERVAL == 0 {
                    progress.update(stats.total, stats.decrypted);
                    callback(progress.clone());
                    reported = Some(stats.total);
                }
            }

            if self.stop_on_first && !decrypted.is_empty() {
                info!("Stopping on first decrypted packet");
                break;
            }
        }

        // The final state is reported once, even for an empty batch.
        if let Some(callback) = progress_callback {
            if reported != Some(stats.total) {
                progress.update(stats.total, stats.decrypted);
                callback(progress);
            }
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            decrypted = stats.decrypted,
            total = stats.total,
            failed = stats.failed,
            malformed = stats.malformed,
            duration_ms = stats.duration_ms,
            rate = format!("{:.2}/s", stats.rate()),
            "Batch complete"
        );

        BatchSummary {
            packets: decrypted,
            stats,
        }
    }
}

impl std::fmt::Debug for BatchDecryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDecryptor")
            .field("key", &self.key)
            .field("options", &self.options)
            .field("device_id", &self.device_id)
            .field("stop_on_first", &self.stop_on_first)
            .finish()
    }
}
