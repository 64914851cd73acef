//! NIST SP 800-108 key derivation in counter mode, AES-CMAC as the PRF.
//!
//! ## Construction
//!
//! ```text
//! fixed  = label || 0x00 || context || [L]_32
//! K(i)   = CMAC(key, [i]_32 || fixed)        for i = 1, 2, ...
//! output = (K(1) || K(2) || ...)[..L / 8]
//! ```
//!
//! `[x]_32` is a 32-bit big-endian integer and `L` is the output length in
//! bits.
//!
//! ## Context Encoding
//!
//! Numeric contexts (day and sequence counters) are encoded as their base-10
//! ASCII string, e.g. `20000` becomes `b"20000"`. Companion encoders depend on
//! this exact convention.

use tracing::trace;

use hubble_core::constants::CMAC_SIZE;
use hubble_core::error::{HubbleError, Result};

use crate::tag::Prf;

/// Largest output, in bytes, whose bit length still fits in `[L]_32`.
const MAX_OUTPUT_LEN: usize = (u32::MAX / 8) as usize;

/// Derives `output_len` bytes from `key`, `label`, and `context`.
///
/// # Errors
///
/// - [`HubbleError::InvalidKeySize`] unless `key` is 16 or 32 bytes
/// - [`HubbleError::ValidationError`] if `output_len * 8` overflows 32 bits
pub fn sp800_108_counter_kdf(
    key: &[u8],
    label: &str,
    context: &str,
    output_len: usize,
) -> Result<Vec<u8>> {
    let prf = Prf::new(key)?;

    if output_len > MAX_OUTPUT_LEN {
        return Err(HubbleError::ValidationError(format!(
            "KDF output length {output_len} exceeds {MAX_OUTPUT_LEN} bytes"
        )));
    }

    let output_bits = (output_len as u32) * 8;

    let mut fixed_input = Vec::with_capacity(label.len() + 1 + context.len() + 4);
    fixed_input.extend_from_slice(label.as_bytes());
    fixed_input.push(0x00);
    fixed_input.extend_from_slice(context.as_bytes());
    fixed_input.extend_from_slice(&output_bits.to_be_bytes());

    let blocks = output_len.div_ceil(CMAC_SIZE);
    let mut output = Vec::with_capacity(blocks * CMAC_SIZE);

    for i in 1..=blocks as u32 {
        let counter = i.to_be_bytes();
        output.extend_from_slice(&prf.compute(&[counter.as_slice(), fixed_input.as_slice()]));
    }

    output.truncate(output_len);
    trace!(label, context, output_len, "derived key material");
    Ok(output)
}

/// Runs the KDF with a numeric counter rendered as a decimal string context.
pub fn derive_key(key: &[u8], output_len: usize, label: &str, counter: u32) -> Result<Vec<u8>> {
    sp800_108_counter_kdf(key, label, &counter.to_string(), output_len)
}
