//! AES-CTR payload encryption.
//!
//! The counter block is the 12-byte nonce followed by a 4-byte big-endian
//! block counter that starts at zero. The whole 16-byte block is incremented
//! as one big-endian integer, which only differs from a 32-bit counter after
//! 2^32 blocks.

use aes::{Aes128, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};

use hubble_core::constants::{AES128_KEY_SIZE, AES_BLOCK_SIZE, NONCE_SIZE};
use hubble_core::error::{HubbleError, Result};
use hubble_core::types::check_key_size;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// XORs `data` with the AES-CTR keystream for a full 16-byte counter block.
pub fn aes_ctr_apply(key: &[u8], iv: &[u8; AES_BLOCK_SIZE], data: &[u8]) -> Result<Vec<u8>> {
    check_key_size(key)?;

    let mut buf = data.to_vec();
    let invalid = |_| HubbleError::InvalidKeySize { actual: key.len() };

    if key.len() == AES128_KEY_SIZE {
        Aes128Ctr::new_from_slices(key, iv)
            .map_err(invalid)?
            .apply_keystream(&mut buf);
    } else {
        Aes256Ctr::new_from_slices(key, iv)
            .map_err(invalid)?
            .apply_keystream(&mut buf);
    }

    Ok(buf)
}

/// Decrypts `ciphertext` with a 12-byte nonce and a zero initial counter.
///
/// # Errors
///
/// - [`HubbleError::InvalidKeySize`] unless `key` is 16 or 32 bytes
/// - [`HubbleError::InvalidNonceSize`] unless `nonce` is 12 bytes
pub fn aes_ctr_decrypt(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    check_key_size(key)?;

    if nonce.len() != NONCE_SIZE {
        return Err(HubbleError::InvalidNonceSize {
            expected: NONCE_SIZE,
            actual: nonce.len(),
        });
    }

    let mut iv = [0u8; AES_BLOCK_SIZE];
    iv[..NONCE_SIZE].copy_from_slice(nonce);

    aes_ctr_apply(key, &iv, ciphertext)
}

/// Encrypts `plaintext`. CTR is symmetric, so this is [`aes_ctr_decrypt`].
pub fn aes_ctr_encrypt(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    aes_ctr_decrypt(key, nonce, plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn nist_iv() -> [u8; 16] {
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&hex::decode("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff").unwrap());
        iv
    }

    #[test]
    fn test_roundtrip() {
        let key = [0u8; 16];
        let nonce = [0u8; 12];
        let plaintext = b"Hello, World! This is a test message.";

        let ciphertext = aes_ctr_encrypt(&key, &nonce, plaintext).unwrap();
        assert_ne!(ciphertext.as_slice(), plaintext.as_slice());

        let decrypted = aes_ctr_decrypt(&key, &nonce, &ciphertext).unwrap();
        assert_eq!(decrypted.as_slice(), plaintext.as_slice());
    }

    #[test_case(0)]
    #[test_case(1)]
    #[test_case(13)]
    #[test_case(16)]
    #[test_case(17)]
    #[test_case(100)]
    fn test_preserves_length(len: usize) {
        let ciphertext = aes_ctr_encrypt(&[0u8; 16], &[0u8; 12], &vec![0x42u8; len]).unwrap();
        assert_eq!(ciphertext.len(), len);
    }

    #[test]
    fn test_nonce_and_key_change_keystream() {
        let plaintext = b"test message";
        let mut nonce2 = [0u8; 12];
        nonce2[0] = 1;
        let mut key2 = [0u8; 16];
        key2[0] = 1;

        let base = aes_ctr_encrypt(&[0u8; 16], &[0u8; 12], plaintext).unwrap();
        assert_ne!(base, aes_ctr_encrypt(&[0u8; 16], &nonce2, plaintext).unwrap());
        assert_ne!(base, aes_ctr_encrypt(&key2, &[0u8; 12], plaintext).unwrap());
    }

    #[test]
    fn test_counter_starts_at_zero() {
        let key = [7u8; 16];
        let nonce = [3u8; 12];
        let mut iv = [0u8; 16];
        iv[..12].copy_from_slice(&nonce);

        assert_eq!(
            aes_ctr_decrypt(&key, &nonce, b"abc").unwrap(),
            aes_ctr_apply(&key, &iv, b"abc").unwrap()
        );
    }

    #[test]
    fn test_supports_256_bit_keys() {
        let key = [0u8; 32];
        let nonce = [0u8; 12];
        let ciphertext = aes_ctr_encrypt(&key, &nonce, b"test message").unwrap();
        assert_ne!(ciphertext, aes_ctr_encrypt(&[0u8; 16], &nonce, b"test message").unwrap());
        assert_eq!(aes_ctr_decrypt(&key, &nonce, &ciphertext).unwrap(), b"test message");
    }

    #[test_case(0)]
    #[test_case(8)]
    #[test_case(15)]
    #[test_case(17)]
    #[test_case(24)]
    #[test_case(31)]
    #[test_case(33)]
    fn test_rejects_invalid_key_sizes(size: usize) {
        assert!(matches!(
            aes_ctr_decrypt(&vec![0u8; size], &[0u8; 12], b"test"),
            Err(HubbleError::InvalidKeySize { .. })
        ));
    }

    #[test_case(0)]
    #[test_case(8)]
    #[test_case(11)]
    #[test_case(13)]
    #[test_case(16)]
    fn test_rejects_invalid_nonce_sizes(size: usize) {
        assert!(matches!(
            aes_ctr_decrypt(&[0u8; 16], &vec![0u8; size], b"test"),
            Err(HubbleError::InvalidNonceSize { expected: 12, actual }) if actual == size
        ));
    }

    // NIST SP 800-38A F.5.1 / F.5.2, first block
    #[test]
    fn test_nist_ctr_aes128() {
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let plaintext = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        let expected = hex::decode("874d6191b620e3261bef6864990db6ce").unwrap();

        let ciphertext = aes_ctr_apply(&key, &nist_iv(), &plaintext).unwrap();
        assert_eq!(ciphertext, expected);
        assert_eq!(aes_ctr_apply(&key, &nist_iv(), &ciphertext).unwrap(), plaintext);
    }

    // NIST SP 800-38A F.5.5, first block
    #[test]
    fn test_nist_ctr_aes256() {
        let key =
            hex::decode("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4").unwrap();
        let plaintext = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        let expected = hex::decode("601ec313775789a5b7a7f504bbf3d228").unwrap();

        let ciphertext = aes_ctr_apply(&key, &nist_iv(), &plaintext).unwrap();
        assert_eq!(ciphertext, expected);
    }

    #[test]
    fn test_nist_vector_via_nonce_roundtrips() {
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let nonce = hex::decode("f0f1f2f3f4f5f6f7f8f9fafb").unwrap();
        let plaintext = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();

        let ciphertext = aes_ctr_encrypt(&key, &nonce, &plaintext).unwrap();
        assert_eq!(aes_ctr_decrypt(&key, &nonce, &ciphertext).unwrap(), plaintext);
    }

    proptest! {
        #[test]
        fn prop_ctr_is_an_involution(
            key in prop::collection::vec(any::<u8>(), 32),
            nonce in prop::array::uniform12(any::<u8>()),
            data in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let once = aes_ctr_encrypt(&key, &nonce, &data).unwrap();
            prop_assert_eq!(once.len(), data.len());
            prop_assert_eq!(aes_ctr_decrypt(&key, &nonce, &once).unwrap(), data);
        }
    }
}
