//! # Hubble Decoder
//!
//! Offline recovery of telemetry from encrypted Hubble BLE advertisements.
//!
//! ## Features
//!
//! - **Packet codec**: split a raw advertisement into header, tag, and
//!   ciphertext, or assemble one for upload
//! - **Windowed search**: find the day whose key schedule authenticates a
//!   packet when the sender's clock is only roughly known
//! - **Batch decryption**: run a capture log through one key with statistics
//!   and progress reporting
//!
//! Nothing here performs I/O or keeps state between calls.
//!
//! ## Example
//!
//! ```rust
//! use hubble_core::{counter_to_time, EncryptedPacket};
//! use hubble_decoder::{decrypt, encrypt_packet, DecryptOptions};
//!
//! let key: Vec<u8> = (0u8..32).collect();
//! let raw = encrypt_packet(&key, 20000, 42, b"Hello, Hubble!").unwrap();
//!
//! let options = DecryptOptions::new()
//!     .search_window(1)
//!     .expected_time(counter_to_time(20000));
//! let result = decrypt(&key, &EncryptedPacket::new(raw), &options).unwrap();
//!
//! assert_eq!(result.payload, b"Hello, Hubble!");
//! assert_eq!(result.time_counter, 20000);
//! assert_eq!(result.seq_counter, 42);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod batch;
pub mod decrypt;
pub mod packet;

pub use batch::{
    BatchDecryptor, BatchProgress, BatchSummary, DecryptStats, PacketOutcome, ProgressCallback,
};
pub use decrypt::{
    decrypt, decrypt_packet, decrypt_with_known_counter, find_time_counter, try_decrypt, Attempt,
    DecryptOptions, DecryptResult,
};
pub use packet::{assemble_packet, encrypt_packet, parse_packet, ParsedPacket};
