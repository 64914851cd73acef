//! Decryption engine: windowed search over candidate days.
//!
//! A verifier knows roughly when a packet was sent but not which day's key
//! schedule the device used. [`decrypt`] tries every day in
//! `[base - window, base + window]` in ascending order and returns the first
//! one whose tag verifies. Only one candidate is expected to ever match.
//!
//! Every call is pure: keys are re-derived per candidate and dropped
//! (zeroized) before returning, so calls on independent packets can run on
//! any number of threads.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use hubble_core::constants::DEFAULT_SEARCH_WINDOW_DAYS;
use hubble_core::error::{HubbleError, Result};
use hubble_core::types::{
    check_key_size, time_to_counter, DecryptedPacket, EncryptedPacket, SequenceCounter,
    TimeCounter,
};
use hubble_crypto::{aes_ctr_decrypt, verify_auth_tag, DaySchedule};

use crate::packet::ParsedPacket;

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Search configuration for [`decrypt`] and [`find_time_counter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptOptions {
    /// Days tried on each side of the expected day
    pub search_window_days: u32,
    /// Overrides the packet's receive time as the expected time
    pub expected_time: Option<DateTime<Utc>>,
}

impl Default for DecryptOptions {
    fn default() -> Self {
        Self {
            search_window_days: DEFAULT_SEARCH_WINDOW_DAYS,
            expected_time: None,
        }
    }
}

impl DecryptOptions {
    /// Creates the default configuration (two days either side, no override).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of days tried on each side of the expected day.
    pub fn search_window(mut self, days: u32) -> Self {
        self.search_window_days = days;
        self
    }

    /// Sets the expected time explicitly.
    pub fn expected_time(mut self, time: DateTime<Utc>) -> Self {
        self.expected_time = Some(time);
        self
    }

    /// Picks the expected time: the override, else the receive time, else now.
    pub fn resolve_expected_time(&self, packet: &EncryptedPacket) -> DateTime<Utc> {
        self.expected_time
            .or(packet.timestamp)
            .unwrap_or_else(Utc::now)
    }

    /// Candidate days around `base`, ascending.
    ///
    /// Bounds saturate at `0` and `u32::MAX` instead of wrapping.
    pub fn candidates(&self, base: TimeCounter) -> RangeInclusive<TimeCounter> {
        base.saturating_sub(self.search_window_days)..=base.saturating_add(self.search_window_days)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Plaintext and the counters that authenticated it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptResult {
    /// Recovered plaintext
    pub payload: Vec<u8>,
    /// Day whose key schedule verified the tag
    pub time_counter: TimeCounter,
    /// Sequence counter from the header
    pub seq_counter: SequenceCounter,
}

impl DecryptResult {
    /// Attaches the capture metadata of `source`.
    pub fn into_decrypted_packet(self, source: &EncryptedPacket) -> DecryptedPacket {
        DecryptedPacket {
            device_id: None,
            payload: self.payload,
            time_counter: self.time_counter,
            sequence_number: self.seq_counter,
            timestamp: source.timestamp,
            location: source.location.clone(),
        }
    }
}

/// Outcome of checking one candidate day.
///
/// A rejected candidate is the normal way for the search to move on, not an
/// error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attempt<T> {
    /// The tag verified under this candidate
    Authenticated(T),
    /// The tag did not verify
    Rejected,
}

impl<T> Attempt<T> {
    /// Returns the authenticated value, if any.
    pub fn authenticated(self) -> Option<T> {
        match self {
            Attempt::Authenticated(value) => Some(value),
            Attempt::Rejected => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SINGLE CANDIDATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Verifies the tag under `time_counter` and returns the day schedule that
/// produced it.
fn authenticate(
    master_key: &[u8],
    packet: &ParsedPacket,
    time_counter: TimeCounter,
) -> Result<Attempt<(DaySchedule, Zeroizing<Vec<u8>>)>> {
    let day = DaySchedule::new(master_key, time_counter)?;
    let encryption_key = Zeroizing::new(day.encryption_key(packet.sequence_number)?);

    if verify_auth_tag(&encryption_key, packet.auth_data(), &packet.auth_tag)? {
        Ok(Attempt::Authenticated((day, encryption_key)))
    } else {
        Ok(Attempt::Rejected)
    }
}

/// Tries a single candidate day: verify the tag, then decrypt.
///
/// The payload is only decrypted once the tag verifies.
///
/// # Errors
///
/// Only for invalid inputs or a broken derivation. A wrong day is
/// [`Attempt::Rejected`].
pub fn try_decrypt(
    master_key: &[u8],
    packet: &ParsedPacket,
    time_counter: TimeCounter,
) -> Result<Attempt<DecryptResult>> {
    let (day, encryption_key) = match authenticate(master_key, packet, time_counter)? {
        Attempt::Authenticated(keys) => keys,
        Attempt::Rejected => return Ok(Attempt::Rejected),
    };

    let nonce = day.nonce(packet.sequence_number)?;
    let payload = aes_ctr_decrypt(&encryption_key, &nonce, &packet.encrypted_payload)?;

    Ok(Attempt::Authenticated(DecryptResult {
        payload,
        time_counter,
        seq_counter: packet.sequence_number,
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEARCH
// ═══════════════════════════════════════════════════════════════════════════════

/// Validates the key and parses the packet. Runs before any derivation.
fn prepare(master_key: &[u8], packet: &EncryptedPacket) -> Result<ParsedPacket> {
    check_key_size(master_key)?;
    ParsedPacket::parse(&packet.payload)
}

/// Decrypts `packet`, searching the configured window around the expected day.
///
/// # Arguments
///
/// * `master_key` - 16 or 32 byte device key
/// * `packet` - the captured advertisement
/// * `options` - window size and optional expected-time override
///
/// # Errors
///
/// - [`HubbleError::InvalidKeySize`] / [`HubbleError::PacketTooShort`] before
///   the search starts
/// - [`HubbleError::DecryptionFailed`] if no day in the window authenticates.
///   A wrong key is not told apart from a clock outside the window.
#[instrument(skip(master_key, packet), fields(packet_len = packet.payload.len()))]
pub fn decrypt(
    master_key: &[u8],
    packet: &EncryptedPacket,
    options: &DecryptOptions,
) -> Result<DecryptResult> {
    let parsed = prepare(master_key, packet)?;
    let base = time_to_counter(options.resolve_expected_time(packet));

    for candidate in options.candidates(base) {
        match try_decrypt(master_key, &parsed, candidate)? {
            Attempt::Authenticated(result) => {
                debug!(time_counter = candidate, seq = parsed.sequence_number, "authenticated");
                return Ok(result);
            }
            Attempt::Rejected => debug!(time_counter = candidate, "candidate rejected"),
        }
    }

    Err(HubbleError::DecryptionFailed)
}

/// Like [`decrypt`], but returns the packet together with its capture metadata.
pub fn decrypt_packet(
    master_key: &[u8],
    packet: &EncryptedPacket,
    options: &DecryptOptions,
) -> Result<DecryptedPacket> {
    decrypt(master_key, packet, options).map(|result| result.into_decrypted_packet(packet))
}

/// Finds the day whose key schedule authenticates `packet`, without
/// decrypting the payload.
///
/// Same search and errors as [`decrypt`].
#[instrument(skip(master_key, packet), fields(packet_len = packet.payload.len()))]
pub fn find_time_counter(
    master_key: &[u8],
    packet: &EncryptedPacket,
    options: &DecryptOptions,
) -> Result<TimeCounter> {
    let parsed = prepare(master_key, packet)?;
    let base = time_to_counter(options.resolve_expected_time(packet));

    for candidate in options.candidates(base) {
        if authenticate(master_key, &parsed, candidate)?
            .authenticated()
            .is_some()
        {
            debug!(time_counter = candidate, "found time counter");
            return Ok(candidate);
        }
        debug!(time_counter = candidate, "candidate rejected");
    }

    Err(HubbleError::DecryptionFailed)
}

/// Decrypts with an already known day, skipping the search.
///
/// # Errors
///
/// [`HubbleError::AuthenticationFailed`] if the tag does not verify under
/// `time_counter`, plus the input validation errors of [`decrypt`].
#[instrument(skip(master_key, packet))]
pub fn decrypt_with_known_counter(
    master_key: &[u8],
    packet: &EncryptedPacket,
    time_counter: TimeCounter,
) -> Result<DecryptResult> {
    let parsed = prepare(master_key, packet)?;

    try_decrypt(master_key, &parsed, time_counter)?
        .authenticated()
        .ok_or(HubbleError::AuthenticationFailed { time_counter })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{assemble_packet, encrypt_packet};
    use hubble_core::types::counter_to_time;
    use proptest::prelude::*;
    use test_case::test_case;

    const T: TimeCounter = 20000;
    const S: SequenceCounter = 42;

    fn test_key() -> Vec<u8> {
        (0u8..32).collect()
    }

    fn packet_at(time_counter: TimeCounter, plaintext: &[u8]) -> EncryptedPacket {
        EncryptedPacket::new(encrypt_packet(&test_key(), time_counter, S, plaintext).unwrap())
    }

    fn window(days: u32, expected: TimeCounter) -> DecryptOptions {
        DecryptOptions::new()
            .search_window(days)
            .expected_time(counter_to_time(expected))
    }

    #[test]
    fn test_hello_hubble() {
        let packet = packet_at(T, b"Hello, Hubble!");
        let result = decrypt(&test_key(), &packet, &window(1, T)).unwrap();

        assert_eq!(result.payload, b"Hello, Hubble!".to_vec());
        assert_eq!(result.time_counter, T);
        assert_eq!(result.seq_counter, S);
    }

    #[test]
    fn test_manual_assembly_decrypts() {
        let key = test_key();
        let keys = hubble_crypto::DerivedKeys::derive(&key, T, S).unwrap();
        let ciphertext =
            hubble_crypto::aes_ctr_encrypt(keys.encryption_key(), keys.nonce(), b"Hello, Hubble!")
                .unwrap();
        let tag = hubble_crypto::compute_auth_tag(keys.encryption_key(), &[0x00, 0x2A, 0, 0, 0, 0])
            .unwrap();
        let packet = EncryptedPacket::new(assemble_packet(S, &tag, &ciphertext).unwrap());

        let result = decrypt(&key, &packet, &window(1, T)).unwrap();
        assert_eq!(result.payload, b"Hello, Hubble!".to_vec());
    }

    #[test]
    fn test_default_options() {
        let options = DecryptOptions::default();
        assert_eq!(options.search_window_days, 2);
        assert!(options.expected_time.is_none());
        assert_eq!(DecryptOptions::new(), options);
    }

    #[test_case(T - 2 ; "two days before")]
    #[test_case(T - 1 ; "one day before")]
    #[test_case(T ; "same day")]
    #[test_case(T + 1 ; "one day after")]
    #[test_case(T + 2 ; "two days after")]
    fn test_window_inclusive(expected: TimeCounter) {
        let packet = packet_at(T, b"window");
        let result = decrypt(&test_key(), &packet, &window(2, expected)).unwrap();
        assert_eq!(result.time_counter, T);
        assert_eq!(result.payload, b"window".to_vec());
    }

    #[test_case(T - 3 ; "three days before")]
    #[test_case(T + 3 ; "three days after")]
    #[test_case(T + 10 ; "ten days after")]
    fn test_outside_window_fails(expected: TimeCounter) {
        let packet = packet_at(T, b"window");
        assert!(matches!(
            decrypt(&test_key(), &packet, &window(2, expected)),
            Err(HubbleError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_zero_window_only_tries_base() {
        let packet = packet_at(T, b"x");
        assert!(decrypt(&test_key(), &packet, &window(0, T)).is_ok());
        assert!(decrypt(&test_key(), &packet, &window(0, T + 1)).is_err());
    }

    #[test]
    fn test_uses_packet_timestamp() {
        let packet = packet_at(T + 2, b"stamped").with_timestamp(counter_to_time(T));
        let result = decrypt(&test_key(), &packet, &DecryptOptions::new()).unwrap();
        assert_eq!(result.time_counter, T + 2);
    }

    #[test]
    fn test_override_beats_packet_timestamp() {
        let packet = packet_at(T, b"stamped").with_timestamp(counter_to_time(T + 50));
        assert!(decrypt(&test_key(), &packet, &window(1, T)).is_ok());
        assert!(decrypt(&test_key(), &packet, &DecryptOptions::new().search_window(1)).is_err());
    }

    #[test]
    fn test_defaults_to_now() {
        let today = time_to_counter(Utc::now());
        let packet = packet_at(today, b"today");
        let result = decrypt(&test_key(), &packet, &DecryptOptions::new()).unwrap();
        assert_eq!(result.payload, b"today".to_vec());
    }

    #[test]
    fn test_wrong_key_fails() {
        let packet = packet_at(T, b"secret");
        let other = [0x55u8; 32];
        assert!(matches!(
            decrypt(&other, &packet, &window(2, T)),
            Err(HubbleError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_tampered_payload_still_authenticates_header() {
        // The tag covers the header only, so flipped ciphertext decrypts to
        // flipped plaintext.
        let mut packet = packet_at(T, b"abc");
        packet.payload[10] ^= 0x01;
        let result = decrypt(&test_key(), &packet, &window(1, T)).unwrap();
        assert_eq!(result.payload, vec![b'a' ^ 0x01, b'b', b'c']);
    }

    #[test]
    fn test_tampered_header_fails() {
        let mut packet = packet_at(T, b"abc");
        packet.payload[3] ^= 0x80;
        assert!(matches!(
            decrypt(&test_key(), &packet, &window(2, T)),
            Err(HubbleError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_empty_payload_roundtrip() {
        let packet = packet_at(T, b"");
        assert_eq!(packet.payload.len(), 10);
        let result = decrypt(&test_key(), &packet, &window(1, T)).unwrap();
        assert!(result.payload.is_empty());
    }

    #[test]
    fn test_aes128_roundtrip() {
        let key = [0x11u8; 16];
        let packet = EncryptedPacket::new(encrypt_packet(&key, T, 1023, b"short key").unwrap());
        let result = decrypt(&key, &packet, &window(1, T)).unwrap();
        assert_eq!(result.payload, b"short key".to_vec());
        assert_eq!(result.seq_counter, 1023);
    }

    #[test_case(0)]
    #[test_case(15)]
    #[test_case(24)]
    #[test_case(33)]
    fn test_invalid_key_rejected_before_parse(size: usize) {
        let short_packet = EncryptedPacket::new(vec![0u8; 3]);
        let err = decrypt(&vec![0u8; size], &short_packet, &DecryptOptions::new()).unwrap_err();
        assert!(matches!(err, HubbleError::InvalidKeySize { .. }));
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_short_packet_rejected() {
        let packet = EncryptedPacket::new(vec![0u8; 9]);
        assert!(matches!(
            decrypt(&test_key(), &packet, &DecryptOptions::new()),
            Err(HubbleError::PacketTooShort { .. })
        ));
        assert!(matches!(
            find_time_counter(&test_key(), &packet, &DecryptOptions::new()),
            Err(HubbleError::PacketTooShort { .. })
        ));
    }

    #[test]
    fn test_find_time_counter() {
        let packet = packet_at(T + 2, b"index me");
        let found = find_time_counter(&test_key(), &packet, &window(2, T)).unwrap();
        assert_eq!(found, T + 2);
    }

    #[test]
    fn test_find_time_counter_not_found() {
        let mut raw = vec![0u8; 14];
        raw[6..10].copy_from_slice(&[0xFF; 4]);
        let packet = EncryptedPacket::new(raw);
        assert!(matches!(
            find_time_counter(&test_key(), &packet, &window(2, T)),
            Err(HubbleError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_known_counter() {
        let packet = packet_at(T, b"known");
        let result = decrypt_with_known_counter(&test_key(), &packet, T).unwrap();
        assert_eq!(result.payload, b"known".to_vec());
        assert_eq!(result.time_counter, T);
    }

    #[test]
    fn test_known_counter_surfaces_authentication_failure() {
        let packet = packet_at(T, b"known");
        let err = decrypt_with_known_counter(&test_key(), &packet, T + 1).unwrap_err();
        assert!(matches!(
            err,
            HubbleError::AuthenticationFailed { time_counter } if time_counter == T + 1
        ));
        assert!(err.is_crypto_error());
    }

    #[test]
    fn test_find_then_known_counter() {
        let packet = packet_at(T - 1, b"two step");
        let counter = find_time_counter(&test_key(), &packet, &window(2, T)).unwrap();
        let result = decrypt_with_known_counter(&test_key(), &packet, counter).unwrap();
        assert_eq!(result.payload, b"two step".to_vec());
    }

    #[test]
    fn test_concurrent_searches_are_independent() {
        let key = test_key();
        let options = window(8, T + 4);
        let packets: Vec<_> = (0..8u32)
            .map(|i| packet_at(T + i, format!("device {i}").as_bytes()))
            .collect();

        let counters: Vec<(TimeCounter, TimeCounter)> = std::thread::scope(|scope| {
            let handles: Vec<_> = packets
                .iter()
                .map(|packet| {
                    let (key, options) = (&key, &options);
                    scope.spawn(move || {
                        let found = find_time_counter(key, packet, options).unwrap();
                        let result = decrypt(key, packet, options).unwrap();
                        (found, result.time_counter)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let expected: Vec<_> = (T..T + 8).map(|tc| (tc, tc)).collect();
        assert_eq!(counters, expected);
    }

    #[test]
    fn test_shared_types_are_send_and_sync() {
        fn assert_send_sync<X: Send + Sync>() {}

        assert_send_sync::<DecryptOptions>();
        assert_send_sync::<DecryptResult>();
        assert_send_sync::<ParsedPacket>();
        assert_send_sync::<crate::batch::BatchDecryptor>();
    }

    #[test]
    fn test_try_decrypt_rejects_wrong_day() {
        let packet = packet_at(T, b"x");
        let parsed = ParsedPacket::parse(&packet.payload).unwrap();
        assert_eq!(try_decrypt(&test_key(), &parsed, T + 1).unwrap(), Attempt::Rejected);
        assert!(matches!(
            try_decrypt(&test_key(), &parsed, T).unwrap(),
            Attempt::Authenticated(_)
        ));
    }

    #[test]
    fn test_candidates_saturate() {
        let options = DecryptOptions::new().search_window(5);
        assert_eq!(options.candidates(2), 0..=7);
        assert_eq!(options.candidates(u32::MAX - 1), (u32::MAX - 6)..=u32::MAX);
        assert_eq!(options.candidates(100).count(), 11);
    }

    #[test]
    fn test_decrypt_near_epoch() {
        let packet = packet_at(1, b"early");
        let result = decrypt(&test_key(), &packet, &window(3, 0)).unwrap();
        assert_eq!(result.time_counter, 1);
    }

    #[test]
    fn test_decrypt_packet_carries_metadata() {
        let stamp = counter_to_time(T);
        let packet = packet_at(T, b"meta").with_timestamp(stamp).with_rssi(-70);
        let decrypted = decrypt_packet(&test_key(), &packet, &DecryptOptions::new()).unwrap();
        assert_eq!(decrypted.payload, b"meta".to_vec());
        assert_eq!(decrypted.time_counter, T);
        assert_eq!(decrypted.sequence_number, S);
        assert_eq!(decrypted.timestamp, Some(stamp));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_roundtrip(
            key in prop_oneof![
                prop::collection::vec(any::<u8>(), 16),
                prop::collection::vec(any::<u8>(), 32),
            ],
            time_counter in 3u32..100_000,
            seq in 0u16..=1023,
            offset in -2i64..=2,
            plaintext in prop::collection::vec(any::<u8>(), 0..=13),
        ) {
            let raw = encrypt_packet(&key, time_counter, seq, &plaintext).unwrap();
            let expected = (i64::from(time_counter) + offset) as u32;
            let result = decrypt(&key, &EncryptedPacket::new(raw), &window(2, expected)).unwrap();

            prop_assert_eq!(result.payload, plaintext);
            prop_assert_eq!(result.time_counter, time_counter);
            prop_assert_eq!(result.seq_counter, seq);
        }
    }
}
