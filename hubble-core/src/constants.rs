//! Protocol constants for Hubble BLE advertisements.
//!
//! The wire layout is fixed:
//!
//! ```text
//! offset  0      2                6            10
//!         +------+----------------+------------+----------------+
//!         | seq  |    reserved    |  auth tag  |   ciphertext   |
//!         +------+----------------+------------+----------------+
//!          2 B         4 B             4 B          0..N B
//! ```
//!
//! The tag is computed over bytes `[0, 6)`.

// ═══════════════════════════════════════════════════════════════════════════════
// KEY SIZES
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of an AES-128 master key in bytes.
pub const AES128_KEY_SIZE: usize = 16;

/// Size of an AES-256 master key in bytes.
pub const AES256_KEY_SIZE: usize = 32;

/// Size of the AES-CTR nonce. The remaining 4 bytes of the counter block
/// start at zero.
pub const NONCE_SIZE: usize = 12;

/// AES block size, which is also the full CMAC output size.
pub const AES_BLOCK_SIZE: usize = 16;

/// Size of the untruncated AES-CMAC.
pub const CMAC_SIZE: usize = AES_BLOCK_SIZE;

/// Size of the truncated authentication tag carried on the air.
pub const AUTH_TAG_SIZE: usize = 4;

// ═══════════════════════════════════════════════════════════════════════════════
// PACKET LAYOUT
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of the packed version/sequence header.
pub const HEADER_SIZE: usize = 2;

/// Size of the reserved region that follows the header.
pub const RESERVED_SIZE: usize = 4;

/// Offset of the auth tag. Also the length of the authenticated prefix.
pub const AUTH_TAG_OFFSET: usize = HEADER_SIZE + RESERVED_SIZE;

/// Offset of the encrypted payload.
pub const PAYLOAD_OFFSET: usize = AUTH_TAG_OFFSET + AUTH_TAG_SIZE;

/// Minimum valid packet size: header, reserved region and tag.
pub const MIN_PACKET_SIZE: usize = PAYLOAD_OFFSET;

/// Mask selecting the 10-bit sequence counter from the 16-bit header.
pub const SEQUENCE_NUMBER_MASK: u16 = 0x03FF;

/// Largest sequence counter representable on the wire.
pub const MAX_SEQUENCE_NUMBER: u16 = SEQUENCE_NUMBER_MASK;

// ═══════════════════════════════════════════════════════════════════════════════
// TIME COUNTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Number of seconds in one time-counter step.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Days searched on either side of the expected day by default.
pub const DEFAULT_SEARCH_WINDOW_DAYS: u32 = 2;

// ═══════════════════════════════════════════════════════════════════════════════
// KDF LABELS
// ═══════════════════════════════════════════════════════════════════════════════
// These strings are part of the cross-implementation contract and must match
// every companion encoder byte-for-byte.

/// Label for the day-scoped nonce key.
pub const LABEL_NONCE_KEY: &str = "NonceKey";

/// Label for the message-scoped nonce.
pub const LABEL_NONCE: &str = "Nonce";

/// Label for the day-scoped intermediate encryption key.
pub const LABEL_ENCRYPTION_KEY: &str = "EncryptionKey";

/// Label for the message-scoped encryption key.
pub const LABEL_KEY: &str = "Key";

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE-TIME CHECKS
// ═══════════════════════════════════════════════════════════════════════════════

const _: () = {
    assert!(AUTH_TAG_OFFSET == 6);
    assert!(PAYLOAD_OFFSET == 10);
    assert!(AUTH_TAG_SIZE <= CMAC_SIZE);
    assert!(NONCE_SIZE < AES_BLOCK_SIZE);
};
