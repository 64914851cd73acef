//! Error types for the Hubble decoder.
//!
//! Three classes of failure exist:
//!
//! - **Input validation**: raised before any key derivation happens.
//! - **Authentication**: a single counter did not validate. Only surfaced when
//!   the caller pinned the counter; a windowed search folds it into
//!   [`HubbleError::DecryptionFailed`].
//! - **Derivation**: a key schedule step produced something it never should.

use thiserror::Error;

/// Result type alias using `HubbleError`.
pub type Result<T> = std::result::Result<T, HubbleError>;

/// Main error type for all Hubble decoding operations.
#[derive(Debug, Error)]
pub enum HubbleError {
    // ═══════════════════════════════════════════════════════════════════════════
    // INPUT VALIDATION
    // ═══════════════════════════════════════════════════════════════════════════
    /// Key is neither 16 nor 32 bytes.
    #[error("Invalid key size: expected 16 or 32 bytes, got {actual}")]
    InvalidKeySize {
        /// Length of the rejected key in bytes
        actual: usize,
    },

    /// Supplied auth tag has the wrong length.
    #[error("Invalid auth tag: expected {expected} bytes, got {actual}")]
    InvalidTagLength {
        /// Required tag length
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Supplied nonce has the wrong length.
    #[error("Invalid nonce: expected {expected} bytes, got {actual}")]
    InvalidNonceSize {
        /// Required nonce length
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Raw packet is shorter than header, reserved region and tag.
    #[error("Packet too short: got {actual} bytes, need at least {minimum}")]
    PacketTooShort {
        /// Smallest valid packet length
        minimum: usize,
        /// Length of the packet received
        actual: usize,
    },

    /// Sequence counter does not fit in 10 bits.
    #[error("Invalid sequence number {0}: must be at most 1023")]
    InvalidSequenceNumber(u32),

    /// Generic input validation failure.
    #[error("Validation error: {0}")]
    ValidationError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // AUTHENTICATION
    // ═══════════════════════════════════════════════════════════════════════════
    /// The tag did not verify for the given time counter.
    #[error("Authentication tag mismatch for time counter {time_counter}")]
    AuthenticationFailed {
        /// Day counter the tag was checked against
        time_counter: u32,
    },

    /// No counter in the search window produced a valid tag.
    #[error("Decryption failed: no valid time counter found")]
    DecryptionFailed,

    // ═══════════════════════════════════════════════════════════════════════════
    // DERIVATION
    // ═══════════════════════════════════════════════════════════════════════════
    /// Key schedule failure. Indicates a broken invariant, not bad input.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION
    // ═══════════════════════════════════════════════════════════════════════════
    /// Invalid hex encoding.
    #[error("Invalid hex encoding: {0}")]
    HexError(#[from] hex::FromHexError),
}

impl HubbleError {
    /// Returns true if the error was raised while validating inputs, before
    /// any key derivation.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            HubbleError::InvalidKeySize { .. }
                | HubbleError::InvalidTagLength { .. }
                | HubbleError::InvalidNonceSize { .. }
                | HubbleError::PacketTooShort { .. }
                | HubbleError::InvalidSequenceNumber(_)
                | HubbleError::ValidationError(_)
                | HubbleError::HexError(_)
        )
    }

    /// Returns true if this is a cryptographic failure.
    pub fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            HubbleError::AuthenticationFailed { .. }
                | HubbleError::DecryptionFailed
                | HubbleError::KeyDerivation(_)
        )
    }

    /// Wraps an error raised while deriving keys with a description of the
    /// step that failed.
    pub fn derivation(step: &str, source: HubbleError) -> Self {
        HubbleError::KeyDerivation(format!("{step}: {source}"))
    }
}
