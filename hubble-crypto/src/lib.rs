//! # Hubble Cryptography
//!
//! Symmetric primitives and the key schedule behind Hubble BLE packets.
//!
//! This crate provides:
//!
//! - **Tags**: AES-CMAC and its 4-byte truncation used as the on-air auth tag
//! - **KDF**: NIST SP 800-108 counter-mode KDF with AES-CMAC as the PRF
//! - **Schedule**: the two-stage nonce and encryption-key derivations
//! - **Stream**: AES-CTR with a 12-byte nonce and a zero initial counter
//!
//! ## Security Properties
//!
//! - Tag verification is constant-time
//! - Derived keys are zeroized on drop
//! - Every function is pure; nothing is cached between calls
//!
//! ## Example
//!
//! ```rust,ignore
//! use hubble_crypto::{DerivedKeys, aes_ctr_encrypt, compute_auth_tag};
//!
//! let keys = DerivedKeys::derive(&master_key, time_counter, seq)?;
//! let ciphertext = aes_ctr_encrypt(keys.encryption_key(), keys.nonce(), b"telemetry")?;
//! let tag = compute_auth_tag(keys.encryption_key(), &header)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod kdf;
pub mod schedule;
pub mod stream;
pub mod tag;

// Re-export main functions at crate root
pub use kdf::{derive_key, sp800_108_counter_kdf};
pub use schedule::{
    derive_encryption_key, derive_encryption_key_intermediate, derive_nonce, derive_nonce_key,
    full_encryption_key_derivation, full_nonce_derivation, DaySchedule, DerivedKeys,
};
pub use stream::{aes_ctr_apply, aes_ctr_decrypt, aes_ctr_encrypt};
pub use tag::{compute_auth_tag, compute_full_cmac, verify_auth_tag};
