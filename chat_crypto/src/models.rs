// secure_chat/chat_crypto/src/models.rs

use serde::{Deserialize, Deserializer, Serialize};

/// Attachment metadata stored next to a message. Covered by the tag, never encrypted.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachments {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image_url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub video_url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub file_url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub file_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub file_type: String,
}

impl Attachments {
    /// True when no image, video or file URL carries content.
    pub fn has_no_media(&self) -> bool {
        self.image_url.trim().is_empty()
            && self.video_url.trim().is_empty()
            && self.file_url.trim().is_empty()
    }
}

/// What the sender side hands to storage: ciphertext and its tag.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SealedMessage {
    pub text: String, // ciphertext
    pub hmac: String,
}

/// A persisted message as read back from storage.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredMessage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String, // ciphertext
    /// Empty for untagged (legacy) messages.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub hmac: String,
    #[serde(flatten)]
    pub attachments: Attachments,
}

impl StoredMessage {
    pub fn is_tagged(&self) -> bool {
        !self.hmac.is_empty()
    }
}

/// A stored message after tag recomputation and decoding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OpenedMessage {
    pub text: String, // plaintext, produced even when `verified` is false
    pub encrypted_text: String,
    pub verified: bool,
    #[serde(flatten)]
    pub attachments: Attachments,
}

/// Reads a missing or `null` string field as `""`.
pub fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
