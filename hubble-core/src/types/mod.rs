//! Domain types for the Hubble decoder.
//!
//! - [`MasterKey`]: per-device AES key provisioned out of band
//! - [`TimeCounter`]: whole days since the Unix epoch, UTC
//! - [`EncryptedPacket`]: a captured advertisement as handed over by the scanner
//! - [`DecryptedPacket`]: the recovered plaintext with its metadata

mod keys;
mod packet;
mod time;

pub use keys::*;
pub use packet::*;
pub use time::*;
