// secure_chat/chat_server/src/models.rs

//! Request and response bodies of the JSON API. Field names follow the
//! camelCase wire format the chat clients already speak.

use chat_crypto::models::null_as_empty;
use chat_crypto::{Attachments, OpenedMessage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Group, MessageRecord};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender: String,
    pub receiver: String,
    /// Defaults to `sender` when omitted.
    #[serde(default)]
    pub msg_by_user_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
    #[serde(flatten)]
    pub attachments: Attachments,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMessageRequest {
    pub new_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenRequest {
    pub user_id: String,
    pub msg_by_user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftDeleteRequest {
    pub conversation_id: Uuid,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    pub members: Vec<String>,
    #[serde(default)]
    pub creator_id: Option<String>,
    #[serde(default)]
    pub group_avatar: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMemberRequest {
    pub user_id: String,
    pub creator_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessageRequest {
    pub sender_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
    #[serde(flatten)]
    pub attachments: Attachments,
}

#[derive(Debug, Deserialize)]
pub struct HmacGenerateRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HmacGenerateResponse {
    pub hmac: String,
}

#[derive(Debug, Deserialize)]
pub struct HmacVerifyRequest {
    pub message: String,
    pub hmac: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HmacVerifyResponse {
    pub valid: bool,
}

/// A message as delivered to clients: decoded text plus its verdict.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub opened: OpenedMessage,
    pub hmac: String,
    pub msg_by_user_id: String,
    pub seen: bool,
    pub edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    pub fn new(record: &MessageRecord, opened: OpenedMessage) -> Self {
        MessageView {
            id: record.id,
            opened,
            hmac: record.hmac.clone(),
            msg_by_user_id: record.msg_by_user_id.clone(),
            seen: record.seen,
            edited: record.edited,
            edited_at: record.edited_at,
            created_at: record.created_at,
        }
    }
}

/// A batch read. `tampered` drives the single aggregate warning.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    pub messages: Vec<MessageView>,
    pub tampered: bool,
    pub tampered_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarEntry {
    #[serde(rename = "_id")]
    pub conversation_id: Uuid,
    pub peer: String,
    pub unseen_msg: usize,
    pub last_msg: Option<MessageView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub creator: String,
    pub members: Vec<String>,
    pub group_avatar: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Group> for GroupView {
    fn from(group: &Group) -> Self {
        GroupView {
            id: group.id,
            name: group.name.clone(),
            creator: group.creator.clone(),
            members: group.members.clone(),
            group_avatar: group.group_avatar.clone(),
            message_count: group.messages.len(),
            created_at: group.created_at,
        }
    }
}

/// Generic acknowledgement: `{ "message": ..., "success": true }`.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub message: String,
    pub success: bool,
}

impl Ack {
    pub fn ok(message: impl Into<String>) -> Self {
        Ack {
            message: message.into(),
            success: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SeenResponse {
    pub updated: usize,
}
