//! Two-stage key schedule.
//!
//! Both chains are rooted in the master key. The first stage is bound to the
//! day, the second to the message:
//!
//! ```text
//!                     ┌─ KDF("NonceKey", day) ──► nonce_key ─ KDF("Nonce", seq, 12) ──► nonce
//! master_key ─────────┤
//!                     └─ KDF("EncryptionKey", day) ─► enc_key_i ─ KDF("Key", seq) ──► enc_key
//! ```
//!
//! A verifier unsure of the day re-derives only the first stage per candidate
//! day ([`DaySchedule`]) and reuses it for every sequence number of that day.

use tracing::trace;
use zeroize::{Zeroize, ZeroizeOnDrop};

use hubble_core::constants::{
    LABEL_ENCRYPTION_KEY, LABEL_KEY, LABEL_NONCE, LABEL_NONCE_KEY, NONCE_SIZE,
};
use hubble_core::error::{HubbleError, Result};
use hubble_core::types::{check_key_size, SequenceCounter, TimeCounter};

use crate::kdf::derive_key;

// ═══════════════════════════════════════════════════════════════════════════════
// SINGLE STAGES
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the day-scoped nonce key. Same length as `master_key`.
pub fn derive_nonce_key(master_key: &[u8], time_counter: TimeCounter) -> Result<Vec<u8>> {
    derive_key(master_key, master_key.len(), LABEL_NONCE_KEY, time_counter)
}

/// Derives the 12-byte nonce from a nonce key and sequence counter.
pub fn derive_nonce(nonce_key: &[u8], seq: SequenceCounter) -> Result<[u8; NONCE_SIZE]> {
    let mut derived = derive_key(nonce_key, NONCE_SIZE, LABEL_NONCE, u32::from(seq))?;

    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&derived);
    derived.zeroize();
    Ok(nonce)
}

/// Derives the day-scoped intermediate encryption key. Same length as
/// `master_key`.
pub fn derive_encryption_key_intermediate(
    master_key: &[u8],
    time_counter: TimeCounter,
) -> Result<Vec<u8>> {
    derive_key(master_key, master_key.len(), LABEL_ENCRYPTION_KEY, time_counter)
}

/// Derives the message encryption key from the intermediate key.
pub fn derive_encryption_key(intermediate_key: &[u8], seq: SequenceCounter) -> Result<Vec<u8>> {
    derive_key(intermediate_key, intermediate_key.len(), LABEL_KEY, u32::from(seq))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DAY SCHEDULE
// ═══════════════════════════════════════════════════════════════════════════════

/// First-stage keys for one day.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DaySchedule {
    #[zeroize(skip)]
    time_counter: TimeCounter,
    nonce_key: Vec<u8>,
    encryption_key_intermediate: Vec<u8>,
}

impl DaySchedule {
    /// Runs the first stage of both chains for `time_counter`.
    ///
    /// # Errors
    ///
    /// [`HubbleError::InvalidKeySize`] if `master_key` is not 16 or 32 bytes.
    /// Any later failure is reported as [`HubbleError::KeyDerivation`].
    pub fn new(master_key: &[u8], time_counter: TimeCounter) -> Result<Self> {
        check_key_size(master_key)?;

        let nonce_key = derive_nonce_key(master_key, time_counter)
            .map_err(|e| HubbleError::derivation("nonce key", e))?;
        let encryption_key_intermediate =
            derive_encryption_key_intermediate(master_key, time_counter)
                .map_err(|e| HubbleError::derivation("intermediate encryption key", e))?;

        ensure_len("nonce key", &nonce_key, master_key.len())?;
        ensure_len(
            "intermediate encryption key",
            &encryption_key_intermediate,
            master_key.len(),
        )?;

        trace!(time_counter, "derived day schedule");
        Ok(Self {
            time_counter,
            nonce_key,
            encryption_key_intermediate,
        })
    }

    /// The day this schedule belongs to.
    pub fn time_counter(&self) -> TimeCounter {
        self.time_counter
    }

    /// Derives only the message encryption key. Enough to verify a tag.
    pub fn encryption_key(&self, seq: SequenceCounter) -> Result<Vec<u8>> {
        let key = derive_encryption_key(&self.encryption_key_intermediate, seq)
            .map_err(|e| HubbleError::derivation("encryption key", e))?;
        ensure_len("encryption key", &key, self.encryption_key_intermediate.len())?;
        Ok(key)
    }

    /// Derives only the message nonce.
    pub fn nonce(&self, seq: SequenceCounter) -> Result<[u8; NONCE_SIZE]> {
        derive_nonce(&self.nonce_key, seq).map_err(|e| HubbleError::derivation("nonce", e))
    }

    /// Derives the full message key material for `seq`.
    pub fn message_keys(&self, seq: SequenceCounter) -> Result<DerivedKeys> {
        Ok(DerivedKeys {
            time_counter: self.time_counter,
            seq,
            encryption_key: self.encryption_key(seq)?,
            nonce: self.nonce(seq)?,
        })
    }
}

fn ensure_len(what: &str, key: &[u8], expected: usize) -> Result<()> {
    if key.len() == expected {
        Ok(())
    } else {
        Err(HubbleError::KeyDerivation(format!(
            "{what} has {} bytes, expected {expected}",
            key.len()
        )))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MESSAGE KEYS
// ═══════════════════════════════════════════════════════════════════════════════

/// Encryption key and nonce for one `(master_key, day, seq)` triple.
///
/// Exists only for the duration of one verification or decryption attempt and
/// is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKeys {
    #[zeroize(skip)]
    time_counter: TimeCounter,
    #[zeroize(skip)]
    seq: SequenceCounter,
    encryption_key: Vec<u8>,
    nonce: [u8; NONCE_SIZE],
}

impl DerivedKeys {
    /// Runs both stages of both chains.
    pub fn derive(
        master_key: &[u8],
        time_counter: TimeCounter,
        seq: SequenceCounter,
    ) -> Result<Self> {
        DaySchedule::new(master_key, time_counter)?.message_keys(seq)
    }

    /// Message encryption key, same length as the master key.
    pub fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }

    /// 12-byte CTR nonce.
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Day the keys were derived for.
    pub fn time_counter(&self) -> TimeCounter {
        self.time_counter
    }

    /// Sequence counter the keys were derived for.
    pub fn seq(&self) -> SequenceCounter {
        self.seq
    }
}

impl std::fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeys")
            .field("time_counter", &self.time_counter)
            .field("seq", &self.seq)
            .field("encryption_key", &"[REDACTED]")
            .field("nonce", &"[REDACTED]")
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FULL CHAINS
// ═══════════════════════════════════════════════════════════════════════════════

/// Runs the complete two-stage nonce derivation.
pub fn full_nonce_derivation(
    master_key: &[u8],
    time_counter: TimeCounter,
    seq: SequenceCounter,
) -> Result<[u8; NONCE_SIZE]> {
    check_key_size(master_key)?;
    let nonce_key = derive_nonce_key(master_key, time_counter)
        .map_err(|e| HubbleError::derivation("nonce key", e))?;
    derive_nonce(&nonce_key, seq).map_err(|e| HubbleError::derivation("nonce", e))
}

/// Runs the complete two-stage encryption-key derivation.
pub fn full_encryption_key_derivation(
    master_key: &[u8],
    time_counter: TimeCounter,
    seq: SequenceCounter,
) -> Result<Vec<u8>> {
    check_key_size(master_key)?;
    let intermediate = derive_encryption_key_intermediate(master_key, time_counter)
        .map_err(|e| HubbleError::derivation("intermediate encryption key", e))?;
    derive_encryption_key(&intermediate, seq)
        .map_err(|e| HubbleError::derivation("encryption key", e))
}
