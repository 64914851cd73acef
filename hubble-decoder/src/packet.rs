//! Wire codec for Hubble advertisements.
//!
//! ```text
//!  0      2                6           10
//!  ├──────┼────────────────┼───────────┼──────────────┤
//!  │ hdr  │ reserved (0)   │ auth tag  │ ciphertext   │
//!  └──────┴────────────────┴───────────┴──────────────┘
//! ```
//!
//! `hdr` is big-endian; its low 10 bits are the sequence counter and its high
//! 6 bits a format discriminator the decoder does not consult. The tag covers
//! bytes `[0, 6)` exactly as received.

use hubble_core::constants::{
    AUTH_TAG_OFFSET, AUTH_TAG_SIZE, HEADER_SIZE, MAX_SEQUENCE_NUMBER, MIN_PACKET_SIZE,
    PAYLOAD_OFFSET, SEQUENCE_NUMBER_MASK,
};
use hubble_core::error::{HubbleError, Result};
use hubble_core::types::{check_key_size, SequenceCounter, TimeCounter};
use hubble_crypto::{aes_ctr_encrypt, compute_auth_tag, DerivedKeys};

/// A packet split into its wire fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedPacket {
    /// Sequence counter, the low 10 bits of the header
    pub sequence_number: SequenceCounter,
    /// Truncated CMAC, bytes `[6, 10)`
    pub auth_tag: [u8; AUTH_TAG_SIZE],
    /// Ciphertext, possibly empty
    pub encrypted_payload: Vec<u8>,
    auth_data: [u8; AUTH_TAG_OFFSET],
}

impl ParsedPacket {
    /// Splits `raw` into its fields.
    ///
    /// High header bits are discarded from the sequence number, never
    /// rejected.
    ///
    /// # Errors
    ///
    /// [`HubbleError::PacketTooShort`] if `raw` is shorter than 10 bytes.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < MIN_PACKET_SIZE {
            return Err(HubbleError::PacketTooShort {
                minimum: MIN_PACKET_SIZE,
                actual: raw.len(),
            });
        }

        let header = u16::from_be_bytes([raw[0], raw[1]]);

        let mut auth_data = [0u8; AUTH_TAG_OFFSET];
        auth_data.copy_from_slice(&raw[..AUTH_TAG_OFFSET]);

        let mut auth_tag = [0u8; AUTH_TAG_SIZE];
        auth_tag.copy_from_slice(&raw[AUTH_TAG_OFFSET..PAYLOAD_OFFSET]);

        Ok(Self {
            sequence_number: header & SEQUENCE_NUMBER_MASK,
            auth_tag,
            encrypted_payload: raw[PAYLOAD_OFFSET..].to_vec(),
            auth_data,
        })
    }

    /// The authenticated bytes: header and reserved region as received.
    pub fn auth_data(&self) -> &[u8] {
        &self.auth_data
    }

    /// The upper 6 header bits. Parsed for inspection only.
    pub fn format_bits(&self) -> u8 {
        self.auth_data[0] >> 2
    }

    /// Reassembles the original wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(PAYLOAD_OFFSET + self.encrypted_payload.len());
        raw.extend_from_slice(&self.auth_data);
        raw.extend_from_slice(&self.auth_tag);
        raw.extend_from_slice(&self.encrypted_payload);
        raw
    }
}

/// Parses raw advertisement bytes. See [`ParsedPacket::parse`].
pub fn parse_packet(raw: &[u8]) -> Result<ParsedPacket> {
    ParsedPacket::parse(raw)
}

fn check_sequence_number(seq: SequenceCounter) -> Result<()> {
    if seq > MAX_SEQUENCE_NUMBER {
        return Err(HubbleError::InvalidSequenceNumber(u32::from(seq)));
    }
    Ok(())
}

/// Builds the 6-byte authenticated header for `seq`. Reserved bytes are zero.
fn encode_header(seq: SequenceCounter) -> [u8; AUTH_TAG_OFFSET] {
    let mut header = [0u8; AUTH_TAG_OFFSET];
    header[..HEADER_SIZE].copy_from_slice(&seq.to_be_bytes());
    header
}

/// Concatenates header, tag, and ciphertext into a wire packet.
///
/// # Errors
///
/// [`HubbleError::InvalidSequenceNumber`] if `seq` does not fit in 10 bits.
pub fn assemble_packet(
    seq: SequenceCounter,
    auth_tag: &[u8; AUTH_TAG_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    check_sequence_number(seq)?;

    let mut raw = Vec::with_capacity(PAYLOAD_OFFSET + ciphertext.len());
    raw.extend_from_slice(&encode_header(seq));
    raw.extend_from_slice(auth_tag);
    raw.extend_from_slice(ciphertext);
    Ok(raw)
}

/// Encrypts `plaintext` for `(time_counter, seq)` and returns the wire packet.
///
/// This is the producing side of the codec, used when a capture is forwarded
/// for ingestion and to build fixtures.
///
/// # Arguments
///
/// * `master_key` - 16 or 32 byte device key
/// * `time_counter` - day the packet is sent on
/// * `seq` - sequence counter, at most 1023
/// * `plaintext` - telemetry to encrypt
pub fn encrypt_packet(
    master_key: &[u8],
    time_counter: TimeCounter,
    seq: SequenceCounter,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    check_key_size(master_key)?;
    check_sequence_number(seq)?;

    let keys = DerivedKeys::derive(master_key, time_counter, seq)?;
    let ciphertext = aes_ctr_encrypt(keys.encryption_key(), keys.nonce(), plaintext)?;
    let auth_tag = compute_auth_tag(keys.encryption_key(), &encode_header(seq))?;

    assemble_packet(seq, &auth_tag, &ciphertext)
}
