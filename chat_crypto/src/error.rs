// secure_chat/chat_crypto/src/error.rs

//! Errors raised while building keys or configuration.
//!
//! The codec primitives themselves are total: encoding, decoding, hashing and
//! tag verification never fail. Only construction of key material can.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The RSA parameters do not form a usable key pair.
    #[error("Invalid key pair: {0}")]
    InvalidKeyPair(String),

    /// The shared HMAC secret was empty.
    #[error("HMAC secret must not be empty")]
    EmptySecret,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
