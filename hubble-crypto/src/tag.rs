//! AES-CMAC and the truncated authentication tag.
//!
//! Packets carry only the first [`AUTH_TAG_SIZE`] bytes of a 16-byte
//! AES-CMAC (RFC 4493). The same CMAC doubles as the PRF of the KDF, which is
//! why [`Prf`] accepts the message in several parts.
//!
//! ## Security
//!
//! A 4-byte tag gives a 2^-32 forgery probability per attempt and per
//! candidate day. Verification compares in constant time so an attacker cannot
//! learn the tag byte by byte.

use aes::{Aes128, Aes256};
use cmac::{Cmac, Mac};
use subtle::ConstantTimeEq;

use hubble_core::constants::{AES128_KEY_SIZE, AUTH_TAG_SIZE, CMAC_SIZE};
use hubble_core::error::{HubbleError, Result};
use hubble_core::types::check_key_size;

/// Keyed AES-CMAC, dispatched on key size.
///
/// Cloning is cheap relative to re-running the AES key expansion, so the KDF
/// keys one instance and clones it per output block.
#[derive(Clone)]
pub(crate) enum Prf {
    Aes128(Cmac<Aes128>),
    Aes256(Cmac<Aes256>),
}

impl Prf {
    /// Keys a CMAC instance. `key` must be 16 or 32 bytes.
    pub(crate) fn new(key: &[u8]) -> Result<Self> {
        check_key_size(key)?;

        let prf = if key.len() == AES128_KEY_SIZE {
            Cmac::<Aes128>::new_from_slice(key).map(Prf::Aes128)
        } else {
            Cmac::<Aes256>::new_from_slice(key).map(Prf::Aes256)
        };

        prf.map_err(|_| HubbleError::InvalidKeySize { actual: key.len() })
    }

    /// Computes the CMAC over the concatenation of `parts`.
    pub(crate) fn compute(&self, parts: &[&[u8]]) -> [u8; CMAC_SIZE] {
        match self {
            Prf::Aes128(mac) => finalize(mac.clone(), parts),
            Prf::Aes256(mac) => finalize(mac.clone(), parts),
        }
    }
}

fn finalize<M: Mac>(mut mac: M, parts: &[&[u8]]) -> [u8; CMAC_SIZE] {
    for part in parts {
        mac.update(part);
    }

    let mut out = [0u8; CMAC_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Computes the full 16-byte AES-CMAC over `data`.
///
/// Not used on the wire; exposed so the primitive can be checked against
/// RFC 4493 vectors.
pub fn compute_full_cmac(key: &[u8], data: &[u8]) -> Result<[u8; CMAC_SIZE]> {
    Ok(Prf::new(key)?.compute(&[data]))
}

/// Computes the 4-byte truncated AES-CMAC tag over `data`.
///
/// # Errors
///
/// [`HubbleError::InvalidKeySize`] unless `key` is 16 or 32 bytes.
pub fn compute_auth_tag(key: &[u8], data: &[u8]) -> Result<[u8; AUTH_TAG_SIZE]> {
    let full = compute_full_cmac(key, data)?;

    let mut tag = [0u8; AUTH_TAG_SIZE];
    tag.copy_from_slice(&full[..AUTH_TAG_SIZE]);
    Ok(tag)
}

/// Recomputes the tag over `data` and compares it with `tag` in constant time.
///
/// # Errors
///
/// - [`HubbleError::InvalidTagLength`] if `tag` is not exactly 4 bytes,
///   regardless of its content
/// - [`HubbleError::InvalidKeySize`] unless `key` is 16 or 32 bytes
pub fn verify_auth_tag(key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool> {
    if tag.len() != AUTH_TAG_SIZE {
        return Err(HubbleError::InvalidTagLength {
            expected: AUTH_TAG_SIZE,
            actual: tag.len(),
        });
    }

    let computed = compute_auth_tag(key, data)?;
    Ok(computed.as_slice().ct_eq(tag).into())
}
