// secure_chat/chat_crypto/src/pipeline.rs

//! Send/receive contract for chat messages.
//!
//! Sending encodes the plaintext and tags `ciphertext ++ imageUrl ++ videoUrl
//! ++ fileUrl ++ fileName ++ fileType`. Receiving recomputes that tag from the
//! stored fields, decodes the ciphertext unconditionally and reports the
//! verdict next to the plaintext. What to show for an unverified message is
//! the caller's decision.
//!
//! The tag input goes through [`text_to_bytes`](crate::sha256::text_to_bytes),
//! which keeps one byte per UTF-16 code unit. Ciphertext tokens are ASCII, but
//! attachment fields are not: replacing a stored `fileName` of `A.pdf` with
//! `Ł.pdf` leaves the tag valid.

use tracing::{debug, warn};

use crate::cipher::ToyCipher;
use crate::error::Result;
use crate::hmac::HmacSha256;
use crate::models::{Attachments, OpenedMessage, SealedMessage, StoredMessage};
use crate::rsa::RsaKeys;
use crate::sha256::is_valid_hex_digest;

/// How a stored message without a tag is judged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UntaggedPolicy {
    /// Legacy messages are trusted.
    #[default]
    Trust,
    /// A missing tag counts as a failed verification.
    Reject,
}

#[derive(Clone, Debug)]
pub struct MessageAuthPipeline {
    cipher: ToyCipher,
    hmac: HmacSha256,
    untagged: UntaggedPolicy,
}

impl MessageAuthPipeline {
    pub fn new(cipher: ToyCipher, hmac: HmacSha256) -> Self {
        MessageAuthPipeline {
            cipher,
            hmac,
            untagged: UntaggedPolicy::default(),
        }
    }

    /// Default key pair with the given shared secret. Rejects an empty secret.
    pub fn with_secret(secret: &str) -> Result<Self> {
        Ok(Self::new(
            ToyCipher::new(RsaKeys::DEFAULT),
            HmacSha256::try_new(secret)?,
        ))
    }

    pub fn with_untagged_policy(mut self, policy: UntaggedPolicy) -> Self {
        self.untagged = policy;
        self
    }

    pub fn untagged_policy(&self) -> UntaggedPolicy {
        self.untagged
    }

    pub fn cipher(&self) -> &ToyCipher {
        &self.cipher
    }

    pub fn hmac(&self) -> &HmacSha256 {
        &self.hmac
    }

    /// The canonical tag input. Field order is fixed; there are no separators.
    pub fn tag_input(ciphertext: &str, attachments: &Attachments) -> String {
        let mut input = String::with_capacity(
            ciphertext.len()
                + attachments.image_url.len()
                + attachments.video_url.len()
                + attachments.file_url.len()
                + attachments.file_name.len()
                + attachments.file_type.len(),
        );
        input.push_str(ciphertext);
        input.push_str(&attachments.image_url);
        input.push_str(&attachments.video_url);
        input.push_str(&attachments.file_url);
        input.push_str(&attachments.file_name);
        input.push_str(&attachments.file_type);
        input
    }

    pub fn prepare_outgoing(&self, plaintext: &str, attachments: &Attachments) -> SealedMessage {
        let text = self.cipher.encode(plaintext);
        let hmac = self.hmac.generate(&Self::tag_input(&text, attachments));
        SealedMessage { text, hmac }
    }

    /// Edit path. Produces the replacement ciphertext and tag together; the
    /// tag covers the attachment fields already stored with the message.
    pub fn reseal(&self, new_plaintext: &str, stored_attachments: &Attachments) -> SealedMessage {
        self.prepare_outgoing(new_plaintext, stored_attachments)
    }

    pub fn verify(&self, stored: &StoredMessage) -> bool {
        if !stored.is_tagged() {
            return self.untagged == UntaggedPolicy::Trust;
        }
        let input = Self::tag_input(&stored.text, &stored.attachments);
        self.hmac.verify(&input, &stored.hmac)
    }

    pub fn resolve_incoming(&self, stored: &StoredMessage) -> OpenedMessage {
        let verified = self.verify(stored);
        if verified {
            debug!(tagged = stored.is_tagged(), "message verified");
        } else if stored.is_tagged() {
            warn!(
                malformed_tag = !is_valid_hex_digest(&stored.hmac),
                "message tag mismatch, content may have been tampered with"
            );
        } else {
            warn!("untagged message rejected by policy");
        }

        OpenedMessage {
            text: self.cipher.decode(&stored.text),
            encrypted_text: stored.text.clone(),
            verified,
            attachments: stored.attachments.clone(),
        }
    }

    /// Resolves each message on its own; one failure never taints another.
    pub fn resolve_batch(&self, stored: &[StoredMessage]) -> BatchVerdict {
        BatchVerdict {
            messages: stored.iter().map(|m| self.resolve_incoming(m)).collect(),
        }
    }
}

/// Per-message results of a history read, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchVerdict {
    pub messages: Vec<OpenedMessage>,
}

impl BatchVerdict {
    pub fn verdicts(&self) -> Vec<bool> {
        self.messages.iter().map(|m| m.verified).collect()
    }

    pub fn tampered_count(&self) -> usize {
        self.messages.iter().filter(|m| !m.verified).count()
    }

    /// Drives the single aggregate warning shown for a batch.
    pub fn any_tampered(&self) -> bool {
        self.messages.iter().any(|m| !m.verified)
    }

    pub fn verified_only(&self) -> impl Iterator<Item = &OpenedMessage> {
        self.messages.iter().filter(|m| m.verified)
    }
}
