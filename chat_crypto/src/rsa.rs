// secure_chat/chat_crypto/src/rsa.rs

use num_integer::Integer;

use crate::error::{CryptoError, Result};

/// Primes behind the fixed chat key pair.
pub const P: u64 = 61;
pub const Q: u64 = 53;
pub const N: u64 = P * Q; // 3233
pub const E: u64 = 17;
pub const D: u64 = 2753; // E*D % PHI = 1

/// Highest code point the cipher tokenizes. Any modulus must exceed it.
pub(crate) const MAX_PRINTABLE: u64 = 126;

/// Square-and-multiply `base^exponent mod modulus`.
///
/// Intermediate products are computed in `u128`, so every `u64` input is
/// exact. The result always lies in `[0, modulus)`; a zero modulus is
/// treated as 1.
pub fn mod_pow(base: u64, exponent: u64, modulus: u64) -> u64 {
    let modulus = u128::from(modulus.max(1));
    let mut result = 1 % modulus;
    let mut base = u128::from(base) % modulus;
    let mut exponent = exponent;

    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result * base % modulus;
        }
        exponent >>= 1;
        base = base * base % modulus;
    }
    result as u64
}

/// Textbook RSA key pair over machine words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RsaKeys {
    pub public_key: (u64, u64),  // (e, n)
    pub private_key: (u64, u64), // (d, n)
}

impl RsaKeys {
    /// The process-wide pair `{n: 3233, e: 17, d: 2753}`. Never regenerated.
    pub const DEFAULT: RsaKeys = RsaKeys {
        public_key: (E, N),
        private_key: (D, N),
    };

    /// Derives the private exponent from two primes and a public exponent.
    pub fn from_primes(p: u64, q: u64, e: u64) -> Result<RsaKeys> {
        if p < 2 || q < 2 {
            return Err(CryptoError::InvalidKeyPair(format!(
                "primes must be at least 2 (p={}, q={})",
                p, q
            )));
        }
        if p == q {
            return Err(CryptoError::InvalidKeyPair("p and q must differ".to_string()));
        }
        let n = p
            .checked_mul(q)
            .ok_or_else(|| CryptoError::InvalidKeyPair("modulus overflows u64".to_string()))?;
        if n <= MAX_PRINTABLE {
            return Err(CryptoError::InvalidKeyPair(format!(
                "modulus {} cannot encode printable ASCII",
                n
            )));
        }

        let phi = (p - 1) * (q - 1);
        if e < 2 || e >= phi {
            return Err(CryptoError::InvalidKeyPair(format!(
                "public exponent {} must lie in [2, {})",
                e, phi
            )));
        }
        let d = modinv(e, phi).ok_or_else(|| {
            CryptoError::InvalidKeyPair(format!("e={} is not coprime with phi={}", e, phi))
        })?;

        Ok(RsaKeys {
            public_key: (e, n),
            private_key: (d, n),
        })
    }

    pub fn modulus(&self) -> u64 {
        self.public_key.1
    }

    /// Checks `e * d ≡ 1 (mod (p-1)(q-1))` and `n == p * q`.
    pub fn is_consistent_with(&self, p: u64, q: u64) -> bool {
        let (e, n) = self.public_key;
        let (d, n_private) = self.private_key;
        if n != n_private || p < 2 || q < 2 || u128::from(p) * u128::from(q) != u128::from(n) {
            return false;
        }
        let phi = u128::from(p - 1) * u128::from(q - 1);
        u128::from(e) * u128::from(d) % phi == 1
    }

    pub fn encrypt_raw(&self, message: u64) -> u64 {
        mod_pow(message, self.public_key.0, self.public_key.1)
    }

    pub fn decrypt_raw(&self, ciphertext: u64) -> u64 {
        mod_pow(ciphertext, self.private_key.0, self.private_key.1)
    }
}

impl Default for RsaKeys {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn modinv(a: u64, m: u64) -> Option<u64> {
    if m < 2 {
        return None;
    }
    let a = i128::from(a);
    let m = i128::from(m);
    let egcd = a.extended_gcd(&m);
    if egcd.gcd != 1 {
        return None;
    }
    Some(egcd.x.mod_floor(&m) as u64)
}
