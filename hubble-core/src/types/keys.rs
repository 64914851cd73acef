//! Master key type.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{AES128_KEY_SIZE, AES256_KEY_SIZE};
use crate::error::{HubbleError, Result};

/// Checks that `key` can key AES-128 or AES-256.
///
/// Every public entry point that accepts raw key bytes runs this before doing
/// any work.
pub fn check_key_size(key: &[u8]) -> Result<()> {
    match key.len() {
        AES128_KEY_SIZE | AES256_KEY_SIZE => Ok(()),
        actual => Err(HubbleError::InvalidKeySize { actual }),
    }
}

/// Per-device master key, 16 or 32 bytes.
///
/// The key is only ever consumed by the key schedule. It is zeroized when
/// dropped and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: Vec<u8>,
}

impl MasterKey {
    /// Creates a master key from raw bytes.
    ///
    /// # Errors
    /// Returns [`HubbleError::InvalidKeySize`] unless `bytes` is 16 or 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_key_size(bytes)?;
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Parses a hex-encoded master key.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = hex::decode(s.trim())?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a master key is never empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True for AES-256 keys.
    pub fn is_aes256(&self) -> bool {
        self.bytes.len() == AES256_KEY_SIZE
    }
}

impl AsRef<[u8]> for MasterKey {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MasterKey(AES-{}, [REDACTED])", self.bytes.len() * 8)
    }
}
