// secure_chat/chat_server/src/store.rs

//! In-memory persistence for users' conversations, groups and messages.
//!
//! Message text is kept exactly as sealed (ciphertext + tag). The store never
//! decodes or re-tags anything; that is the pipeline's job at read time.

use std::collections::HashMap;

use chat_crypto::{Attachments, SealedMessage, StoredMessage};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: Uuid,
    pub text: String, // ciphertext
    pub hmac: String,
    pub attachments: Attachments,
    pub msg_by_user_id: String,
    pub seen: bool,
    pub edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    fn new(sealed: SealedMessage, attachments: Attachments, msg_by_user_id: &str) -> Self {
        MessageRecord {
            id: Uuid::new_v4(),
            text: sealed.text,
            hmac: sealed.hmac,
            attachments,
            msg_by_user_id: msg_by_user_id.to_string(),
            seen: false,
            edited: false,
            edited_at: None,
            created_at: Utc::now(),
        }
    }

    /// The fields the tag covers, as persisted.
    pub fn stored(&self) -> StoredMessage {
        StoredMessage {
            text: self.text.clone(),
            hmac: self.hmac.clone(),
            attachments: self.attachments.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: Uuid,
    pub sender: String,
    pub receiver: String,
    pub messages: Vec<Uuid>,
    pub deleted_for: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    fn involves(&self, a: &str, b: &str) -> bool {
        (self.sender == a && self.receiver == b) || (self.sender == b && self.receiver == a)
    }

    fn has_member(&self, user: &str) -> bool {
        self.sender == user || self.receiver == user
    }

    pub fn peer_of(&self, user: &str) -> &str {
        if self.sender == user {
            &self.receiver
        } else {
            &self.sender
        }
    }
}

#[derive(Debug, Clone)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub creator: String,
    pub members: Vec<String>,
    pub messages: Vec<Uuid>,
    pub group_avatar: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ChatStore {
    messages: HashMap<Uuid, MessageRecord>,
    conversations: Vec<Conversation>,
    groups: HashMap<Uuid, Group>,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(&self, id: Uuid) -> ApiResult<&MessageRecord> {
        self.messages
            .get(&id)
            .ok_or_else(|| ApiError::NotFound("Message not found".to_string()))
    }

    /// Appends a direct message, creating the conversation on first contact.
    pub fn insert_direct(
        &mut self,
        sender: &str,
        receiver: &str,
        msg_by_user_id: &str,
        sealed: SealedMessage,
        attachments: Attachments,
    ) -> MessageRecord {
        let record = MessageRecord::new(sealed, attachments, msg_by_user_id);
        let now = record.created_at;

        let index = match self.conversations.iter().position(|c| c.involves(sender, receiver)) {
            Some(index) => index,
            None => {
                self.conversations.push(Conversation {
                    id: Uuid::new_v4(),
                    sender: sender.to_string(),
                    receiver: receiver.to_string(),
                    messages: Vec::new(),
                    deleted_for: Vec::new(),
                    updated_at: now,
                });
                self.conversations.len() - 1
            }
        };
        let conversation = &mut self.conversations[index];
        conversation.messages.push(record.id);
        conversation.updated_at = now;
        // A new message brings a hidden conversation back for both sides.
        conversation.deleted_for.clear();

        self.messages.insert(record.id, record.clone());
        record
    }

    pub fn conversation_between(&self, a: &str, b: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.involves(a, b))
    }

    /// Messages between two users in send order. Empty if they never talked.
    pub fn conversation_messages(&self, a: &str, b: &str) -> Vec<MessageRecord> {
        self.conversation_between(a, b)
            .map(|c| self.collect(&c.messages))
            .unwrap_or_default()
    }

    /// Conversations visible to `user`, most recently updated first.
    pub fn conversations_for(&self, user: &str) -> Vec<&Conversation> {
        let mut found: Vec<&Conversation> = self
            .conversations
            .iter()
            .filter(|c| c.has_member(user) && !c.deleted_for.iter().any(|u| u == user))
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        found
    }

    /// Messages in `conversation` sent by the other side and not yet seen by `user`.
    pub fn unseen_count(&self, conversation: &Conversation, user: &str) -> usize {
        conversation
            .messages
            .iter()
            .filter_map(|id| self.messages.get(id))
            .filter(|m| m.msg_by_user_id != user && !m.seen)
            .count()
    }

    pub fn last_message(&self, conversation: &Conversation) -> Option<&MessageRecord> {
        conversation.messages.last().and_then(|id| self.messages.get(id))
    }

    /// Marks everything `peer` sent to `user` as seen. Returns how many changed.
    pub fn mark_seen(&mut self, user: &str, peer: &str) -> usize {
        let ids = match self.conversation_between(user, peer) {
            Some(c) => c.messages.clone(),
            None => return 0,
        };
        let mut updated = 0;
        for id in ids {
            if let Some(message) = self.messages.get_mut(&id) {
                if message.msg_by_user_id == peer && !message.seen {
                    message.seen = true;
                    updated += 1;
                }
            }
        }
        updated
    }

    pub fn soft_delete_conversation(&mut self, conversation_id: Uuid, user: &str) -> ApiResult<()> {
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| ApiError::NotFound("Conversation not found".to_string()))?;
        if !conversation.deleted_for.iter().any(|u| u == user) {
            conversation.deleted_for.push(user.to_string());
        }
        Ok(())
    }

    /// Overwrites ciphertext and tag in one step and flags the message edited.
    pub fn replace_sealed(&mut self, id: Uuid, sealed: SealedMessage) -> ApiResult<MessageRecord> {
        let message = self
            .messages
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound("Message not found".to_string()))?;
        message.text = sealed.text;
        message.hmac = sealed.hmac;
        message.edited = true;
        message.edited_at = Some(Utc::now());
        Ok(message.clone())
    }

    /// Removes a message and unlinks it from whichever conversation or group held it.
    pub fn delete_message(&mut self, id: Uuid) -> ApiResult<MessageRecord> {
        let removed = self
            .messages
            .remove(&id)
            .ok_or_else(|| ApiError::NotFound("Message not found".to_string()))?;
        for conversation in &mut self.conversations {
            conversation.messages.retain(|m| *m != id);
        }
        for group in self.groups.values_mut() {
            group.messages.retain(|m| *m != id);
        }
        Ok(removed)
    }

    /// Direct write of raw fields, bypassing the pipeline. Models a
    /// compromised storage layer.
    #[cfg(test)]
    pub(crate) fn overwrite_raw(&mut self, id: Uuid, stored: StoredMessage) -> ApiResult<()> {
        let message = self
            .messages
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound("Message not found".to_string()))?;
        message.text = stored.text;
        message.hmac = stored.hmac;
        message.attachments = stored.attachments;
        Ok(())
    }

    pub fn create_group(
        &mut self,
        name: &str,
        members: Vec<String>,
        creator_id: Option<&str>,
        group_avatar: &str,
    ) -> ApiResult<Group> {
        if name.trim().is_empty() || members.is_empty() {
            return Err(ApiError::BadRequest(
                "Group name and at least 1 member required".to_string(),
            ));
        }
        let creator = creator_id
            .and_then(|id| members.iter().find(|m| m.as_str() == id))
            .unwrap_or(&members[0])
            .clone();

        let mut unique: Vec<String> = Vec::with_capacity(members.len());
        for member in members {
            if !unique.contains(&member) {
                unique.push(member);
            }
        }

        let group = Group {
            id: Uuid::new_v4(),
            name: name.to_string(),
            creator,
            members: unique,
            messages: Vec::new(),
            group_avatar: group_avatar.to_string(),
            created_at: Utc::now(),
        };
        self.groups.insert(group.id, group.clone());
        Ok(group)
    }

    pub fn group(&self, id: Uuid) -> ApiResult<&Group> {
        self.groups
            .get(&id)
            .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))
    }

    fn group_mut(&mut self, id: Uuid) -> ApiResult<&mut Group> {
        self.groups
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))
    }

    pub fn groups_for(&self, user: &str) -> Vec<&Group> {
        let mut found: Vec<&Group> = self
            .groups
            .values()
            .filter(|g| g.members.iter().any(|m| m == user))
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        found
    }

    pub fn add_member(&mut self, group_id: Uuid, user: &str) -> ApiResult<Group> {
        let group = self.group_mut(group_id)?;
        if group.members.iter().any(|m| m == user) {
            return Err(ApiError::BadRequest(
                "User is already a member of this group".to_string(),
            ));
        }
        group.members.push(user.to_string());
        Ok(group.clone())
    }

    /// `requester` may remove themselves, or anyone if they created the group.
    /// The creator can never leave; the group must be deleted instead.
    pub fn remove_member(&mut self, group_id: Uuid, user: &str, requester: &str) -> ApiResult<Group> {
        let group = self.group_mut(group_id)?;
        if user == requester && group.creator == requester {
            return Err(ApiError::BadRequest(
                "Creator cannot leave the group. Delete the group instead.".to_string(),
            ));
        }
        if user != requester && group.creator != requester {
            return Err(ApiError::Forbidden(
                "Only the group creator can remove other members".to_string(),
            ));
        }
        if !group.members.iter().any(|m| m == user) {
            return Err(ApiError::BadRequest(
                "User is not a member of this group".to_string(),
            ));
        }
        group.members.retain(|m| m != user);
        Ok(group.clone())
    }

    /// Deletes the group and every message posted in it. Creator only.
    pub fn delete_group(&mut self, group_id: Uuid, requester: &str) -> ApiResult<usize> {
        let group = self.group(group_id)?;
        if group.creator != requester {
            return Err(ApiError::Forbidden(
                "Only the group creator can delete the group".to_string(),
            ));
        }
        let group = self.groups.remove(&group_id).ok_or_else(|| {
            ApiError::NotFound("Group not found".to_string())
        })?;
        for id in &group.messages {
            self.messages.remove(id);
        }
        Ok(group.messages.len())
    }

    pub fn insert_group_message(
        &mut self,
        group_id: Uuid,
        sender: &str,
        sealed: SealedMessage,
        attachments: Attachments,
    ) -> ApiResult<MessageRecord> {
        let record = MessageRecord::new(sealed, attachments, sender);
        self.group_mut(group_id)?.messages.push(record.id);
        self.messages.insert(record.id, record.clone());
        Ok(record)
    }

    pub fn group_messages(&self, group_id: Uuid) -> ApiResult<Vec<MessageRecord>> {
        let group = self.group(group_id)?;
        Ok(self.collect(&group.messages))
    }

    fn collect(&self, ids: &[Uuid]) -> Vec<MessageRecord> {
        ids.iter().filter_map(|id| self.messages.get(id)).cloned().collect()
    }
}
