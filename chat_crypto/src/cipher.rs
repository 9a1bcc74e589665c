// secure_chat/chat_crypto/src/cipher.rs

//! Per-character textbook RSA over printable ASCII.
//!
//! Every character in `[32, 126]` becomes a `#<decimal>;` token; everything
//! else (accents, emoji, control characters) is copied through untouched.

use crate::rsa::{RsaKeys, MAX_PRINTABLE};

pub const TOKEN_START: char = '#';
pub const TOKEN_END: char = ';';

const MIN_PRINTABLE: u32 = 32;

#[derive(Clone, Copy, Debug, Default)]
pub struct ToyCipher {
    keys: RsaKeys,
}

impl ToyCipher {
    pub fn new(keys: RsaKeys) -> Self {
        ToyCipher { keys }
    }

    pub fn keys(&self) -> &RsaKeys {
        &self.keys
    }

    pub fn encode(&self, plaintext: &str) -> String {
        let mut encoded = String::with_capacity(plaintext.len() * 6);
        for ch in plaintext.chars() {
            let code = u32::from(ch);
            if is_printable(code) {
                let enc = self.keys.encrypt_raw(u64::from(code));
                encoded.push(TOKEN_START);
                encoded.push_str(&enc.to_string());
                encoded.push(TOKEN_END);
            } else {
                encoded.push(ch);
            }
        }
        encoded
    }

    /// Best-effort inverse of [`encode`](Self::encode). Never fails.
    ///
    /// A `#` with no `;` anywhere after it is emitted as a literal `#` and
    /// scanning resumes at the next character, so the digits that followed
    /// it are copied as plain text.
    pub fn decode(&self, ciphertext: &str) -> String {
        let chars: Vec<char> = ciphertext.chars().collect();
        let last_end = chars.iter().rposition(|&c| c == TOKEN_END);
        let mut decoded = String::with_capacity(ciphertext.len());
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            if ch != TOKEN_START {
                decoded.push(ch);
                i += 1;
                continue;
            }

            let terminator = match last_end {
                Some(last) if last > i => chars[i + 1..]
                    .iter()
                    .position(|&c| c == TOKEN_END)
                    .map(|offset| i + 1 + offset),
                _ => None,
            };
            match terminator {
                Some(end) => {
                    decoded.push(self.decode_token(&chars[i + 1..end]));
                    i = end + 1;
                }
                None => {
                    decoded.push(TOKEN_START);
                    i += 1;
                }
            }
        }
        decoded
    }

    /// Decodes the text between `#` and `;`.
    ///
    /// The value is the leading run of decimal digits (after optional
    /// whitespace), reduced modulo `n` while it is read. A body with no
    /// leading digit decodes to U+0000.
    fn decode_token(&self, body: &[char]) -> char {
        let n = u128::from(self.keys.modulus().max(1));
        let mut value: u128 = 0;
        let mut seen_digit = false;

        let digits = body
            .iter()
            .skip_while(|c| c.is_whitespace())
            .map_while(|c| c.to_digit(10));
        for digit in digits {
            seen_digit = true;
            value = (value * 10 + u128::from(digit)) % n;
        }
        if !seen_digit {
            return '\0';
        }

        let code = self.keys.decrypt_raw(value as u64);
        u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

fn is_printable(code: u32) -> bool {
    (MIN_PRINTABLE..=MAX_PRINTABLE as u32).contains(&code)
}
