// secure_chat/chat_crypto/src/proptests.rs

//! Property-based tests for the codec laws:
//!
//! - decode(encode(s)) == s for any text
//! - mod_pow agrees with arbitrary-precision arithmetic
//! - tags verify against their own message and separate distinct messages
//! - single-character ciphertext edits are always caught

use num_bigint::BigUint;
use proptest::prelude::*;

use crate::cipher::ToyCipher;
use crate::hmac::HmacSha256;
use crate::models::{Attachments, StoredMessage};
use crate::pipeline::MessageAuthPipeline;
use crate::rsa::{mod_pow, RsaKeys};
use crate::sha256::{digest, Sha256};

const SECRET: &str = "hardcoded-hmac-secret-key";

proptest! {
    #[test]
    fn decode_inverts_encode(text in any::<String>()) {
        let cipher = ToyCipher::new(RsaKeys::DEFAULT);
        prop_assert_eq!(cipher.decode(&cipher.encode(&text)), text);
    }

    #[test]
    fn decode_inverts_encode_with_delimiters(text in "[#;0-9a-z é👋]{0,80}") {
        let cipher = ToyCipher::new(RsaKeys::DEFAULT);
        prop_assert_eq!(cipher.decode(&cipher.encode(&text)), text);
    }

    #[test]
    fn decode_never_panics(text in any::<String>()) {
        let cipher = ToyCipher::new(RsaKeys::DEFAULT);
        let _ = cipher.decode(&text);
    }

    #[test]
    fn mod_pow_matches_biguint(base in any::<u64>(), exponent in any::<u64>(), modulus in 1u64..=u64::MAX) {
        let expected = BigUint::from(base).modpow(&BigUint::from(exponent), &BigUint::from(modulus));
        prop_assert_eq!(BigUint::from(mod_pow(base, exponent, modulus)), expected);
    }

    #[test]
    fn generated_tag_verifies(message in any::<String>()) {
        let hmac = HmacSha256::new(SECRET);
        let tag = hmac.generate(&message);
        prop_assert!(hmac.verify(&message, &tag));
    }

    // Restricted to printable ASCII: wider code units are truncated to one
    // byte before hashing and can collide by construction.
    #[test]
    fn distinct_messages_get_distinct_tags(a in "[ -~]{0,64}", b in "[ -~]{0,64}") {
        prop_assume!(a != b);
        let hmac = HmacSha256::new(SECRET);
        prop_assert_ne!(hmac.generate(&a), hmac.generate(&b));
    }

    #[test]
    fn streaming_hash_matches_one_shot(data in prop::collection::vec(any::<u8>(), 0..300), split in 0usize..300) {
        let split = split.min(data.len());
        let mut hasher = Sha256::new();
        hasher.update(&data[..split]);
        hasher.update(&data[split..]);
        prop_assert_eq!(hasher.finalize(), digest(&data));
    }

    #[test]
    fn single_char_edit_is_detected(text in "[ -~]{1,40}", index in any::<prop::sample::Index>()) {
        let pipeline = MessageAuthPipeline::with_secret(SECRET).unwrap();
        let sealed = pipeline.prepare_outgoing(&text, &Attachments::default());

        let mut chars: Vec<char> = sealed.text.chars().collect();
        let i = index.index(chars.len());
        chars[i] = if chars[i] == 'x' { 'y' } else { 'x' };

        let stored = StoredMessage {
            text: chars.into_iter().collect(),
            hmac: sealed.hmac,
            attachments: Attachments::default(),
        };
        prop_assert!(!pipeline.resolve_incoming(&stored).verified);
    }
}
