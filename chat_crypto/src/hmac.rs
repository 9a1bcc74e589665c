// secure_chat/chat_crypto/src/hmac.rs

//! HMAC over the hand-rolled SHA-256.
//!
//! The construction follows RFC 2104 with the chat's wire conventions: text
//! becomes bytes through [`text_to_bytes`], an over-long secret is replaced by
//! the 64 ASCII bytes of its hex digest, and the inner digest enters the outer
//! hash as lowercase hex text. Tags are 64 lowercase hex characters.

use std::fmt;

use subtle::ConstantTimeEq;

use crate::error::{CryptoError, Result};
use crate::sha256::{digest_hex, text_to_bytes, to_hex, Sha256, BLOCK_LEN};

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

#[derive(Clone)]
pub struct HmacSha256 {
    inner_pad: [u8; BLOCK_LEN],
    outer_pad: [u8; BLOCK_LEN],
}

impl HmacSha256 {
    /// Builds the keyed pads once. Accepts any secret, including an empty one.
    pub fn new(secret: &str) -> Self {
        let key = pad_key(secret);
        let mut inner_pad = [0u8; BLOCK_LEN];
        let mut outer_pad = [0u8; BLOCK_LEN];
        for (i, byte) in key.iter().enumerate() {
            inner_pad[i] = byte ^ IPAD;
            outer_pad[i] = byte ^ OPAD;
        }
        HmacSha256 {
            inner_pad,
            outer_pad,
        }
    }

    /// Like [`new`](Self::new) but refuses an empty secret.
    pub fn try_new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(CryptoError::EmptySecret);
        }
        Ok(Self::new(secret))
    }

    pub fn generate(&self, message: &str) -> String {
        let mut inner = Sha256::new();
        inner.update(&self.inner_pad);
        inner.update(&text_to_bytes(message));
        let inner_hex = to_hex(&inner.finalize());

        let mut outer = Sha256::new();
        outer.update(&self.outer_pad);
        outer.update(inner_hex.as_bytes());
        to_hex(&outer.finalize())
    }

    /// Recomputes the tag and compares it in constant time.
    pub fn verify(&self, message: &str, tag: &str) -> bool {
        let expected = self.generate(message);
        expected.as_bytes().ct_eq(tag.as_bytes()).into()
    }
}

impl fmt::Debug for HmacSha256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSha256").field("key", &"[REDACTED]").finish()
    }
}

fn pad_key(secret: &str) -> [u8; BLOCK_LEN] {
    let mut key_bytes = text_to_bytes(secret);
    if key_bytes.len() > BLOCK_LEN {
        key_bytes = digest_hex(&key_bytes).into_bytes();
    }
    let mut key = [0u8; BLOCK_LEN];
    key[..key_bytes.len()].copy_from_slice(&key_bytes);
    key
}
