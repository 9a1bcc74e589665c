// secure_chat/chat_crypto/src/lib.rs

// Library modules.
pub mod cipher;
pub mod error;
pub mod hmac;
pub mod models;
pub mod pipeline;
pub mod rsa;
pub mod sha256;

#[cfg(test)]
mod proptests;

// Main types re-exported for the server.
pub use cipher::ToyCipher;
pub use error::{CryptoError, Result};
pub use hmac::HmacSha256;
pub use models::{Attachments, OpenedMessage, SealedMessage, StoredMessage};
pub use pipeline::{BatchVerdict, MessageAuthPipeline, UntaggedPolicy};
pub use rsa::{mod_pow, RsaKeys};
pub use sha256::{digest, digest_hex, is_valid_hex_digest, Sha256};
