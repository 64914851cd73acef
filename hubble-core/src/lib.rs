//! # Hubble Core
//!
//! Core types, errors, and constants for decoding encrypted Hubble BLE
//! advertisements.
//!
//! This crate provides the foundational building blocks used by the other
//! Hubble crates:
//!
//! - **Types**: master keys, time counters, captured and decrypted packets
//! - **Errors**: a single error taxonomy shared by every entry point
//! - **Constants**: wire-format offsets, key sizes, and derivation labels
//!
//! ## Example
//!
//! ```rust
//! use hubble_core::{MasterKey, time_to_counter, counter_to_time};
//!
//! let key = MasterKey::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
//! assert_eq!(key.len(), 16);
//!
//! let day = counter_to_time(20000);
//! assert_eq!(time_to_counter(day), 20000);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{HubbleError, Result};
pub use types::*;
