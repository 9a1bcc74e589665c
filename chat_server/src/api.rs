// secure_chat/chat_server/src/api.rs

//! JSON endpoints. Every write seals text through the pipeline before it
//! reaches the store; every read re-verifies and decodes what the store holds.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chat_crypto::MessageAuthPipeline;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::models::*;
use crate::store::{ChatStore, MessageRecord};

pub struct AppState {
    pub store: RwLock<ChatStore>,
    pub pipeline: MessageAuthPipeline,
}

impl AppState {
    pub fn new(pipeline: MessageAuthPipeline) -> Self {
        AppState {
            store: RwLock::new(ChatStore::new()),
            pipeline,
        }
    }

    fn view(&self, record: &MessageRecord) -> MessageView {
        MessageView::new(record, self.pipeline.resolve_incoming(&record.stored()))
    }

    fn history(&self, records: &[MessageRecord]) -> HistoryView {
        let stored: Vec<_> = records.iter().map(MessageRecord::stored).collect();
        let verdict = self.pipeline.resolve_batch(&stored);
        let tampered_count = verdict.tampered_count();
        if tampered_count > 0 {
            warn!(tampered_count, total = records.len(), "history contains tampered messages");
        }
        let messages = records
            .iter()
            .zip(verdict.messages)
            .map(|(record, opened)| MessageView::new(record, opened))
            .collect();
        HistoryView {
            messages,
            tampered: tampered_count > 0,
            tampered_count,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/messages", post(send_message))
        .route("/api/messages/:message_id", put(edit_message).delete(delete_message))
        .route("/api/conversations/seen", post(mark_seen))
        .route("/api/conversations/soft-delete", post(soft_delete_conversation))
        .route("/api/conversations/:user_id", get(sidebar))
        .route("/api/conversations/:user_id/:peer_id", get(conversation_history))
        .route("/api/groups", post(create_group))
        .route("/api/groups/user/:user_id", get(groups_for_user))
        .route("/api/groups/:group_id", get(group_details))
        .route("/api/groups/:group_id/members", post(add_group_member))
        .route("/api/groups/:group_id/members/remove", post(remove_group_member))
        .route("/api/groups/:group_id/delete", post(delete_group))
        .route(
            "/api/groups/:group_id/messages",
            get(group_messages).post(send_group_message),
        )
        .route("/api/hmac/generate", post(hmac_generate))
        .route("/api/hmac/verify", post(hmac_verify))
        .with_state(state)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageView>)> {
    if req.sender.trim().is_empty() || req.receiver.trim().is_empty() {
        return Err(ApiError::BadRequest("sender and receiver are required".to_string()));
    }
    if req.text.trim().is_empty() && req.attachments.has_no_media() {
        return Err(ApiError::BadRequest(
            "A message needs text or an attachment".to_string(),
        ));
    }

    let sealed = state.pipeline.prepare_outgoing(&req.text, &req.attachments);
    let msg_by = req.msg_by_user_id.as_deref().unwrap_or(&req.sender);
    let record = state.store.write().await.insert_direct(
        &req.sender,
        &req.receiver,
        msg_by,
        sealed,
        req.attachments,
    );

    info!(message_id = %record.id, sender = %req.sender, receiver = %req.receiver, "direct message stored");
    Ok((StatusCode::CREATED, Json(state.view(&record))))
}

pub async fn conversation_history(
    State(state): State<Arc<AppState>>,
    ApiPath((user_id, peer_id)): ApiPath<(String, String)>,
) -> Json<HistoryView> {
    let records = state.store.read().await.conversation_messages(&user_id, &peer_id);
    debug!(user = %user_id, peer = %peer_id, count = records.len(), "conversation fetched");
    Json(state.history(&records))
}

pub async fn sidebar(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<String>,
) -> Json<Vec<SidebarEntry>> {
    let store = state.store.read().await;
    let entries = store
        .conversations_for(&user_id)
        .into_iter()
        .map(|conversation| SidebarEntry {
            conversation_id: conversation.id,
            peer: conversation.peer_of(&user_id).to_string(),
            unseen_msg: store.unseen_count(conversation, &user_id),
            last_msg: store.last_message(conversation).map(|m| state.view(m)),
        })
        .collect();
    Json(entries)
}

pub async fn mark_seen(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SeenRequest>,
) -> Json<SeenResponse> {
    let updated = state
        .store
        .write()
        .await
        .mark_seen(&req.user_id, &req.msg_by_user_id);
    debug!(user = %req.user_id, peer = %req.msg_by_user_id, updated, "messages marked seen");
    Json(SeenResponse { updated })
}

pub async fn soft_delete_conversation(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SoftDeleteRequest>,
) -> ApiResult<Json<Ack>> {
    state
        .store
        .write()
        .await
        .soft_delete_conversation(req.conversation_id, &req.user_id)?;
    Ok(Json(Ack::ok("Conversation hidden for user")))
}

/// Re-encodes the new text and re-tags it over the attachments already stored.
pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    ApiPath(message_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<EditMessageRequest>,
) -> ApiResult<Json<MessageView>> {
    if req.new_text.trim().is_empty() {
        return Err(ApiError::BadRequest("New text is required".to_string()));
    }

    let mut store = state.store.write().await;
    let attachments = store.message(message_id)?.attachments.clone();
    let sealed = state.pipeline.reseal(&req.new_text, &attachments);
    let record = store.replace_sealed(message_id, sealed)?;
    drop(store);

    info!(message_id = %message_id, "message edited");
    Ok(Json(state.view(&record)))
}

pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    ApiPath(message_id): ApiPath<Uuid>,
) -> ApiResult<Json<Ack>> {
    state.store.write().await.delete_message(message_id)?;
    info!(message_id = %message_id, "message deleted");
    Ok(Json(Ack::ok("Message deleted successfully")))
}

pub async fn create_group(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<GroupView>)> {
    let group = state.store.write().await.create_group(
        &req.name,
        req.members,
        req.creator_id.as_deref(),
        &req.group_avatar,
    )?;
    info!(group_id = %group.id, members = group.members.len(), "group created");
    Ok((StatusCode::CREATED, Json(GroupView::from(&group))))
}

pub async fn groups_for_user(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<String>,
) -> Json<Vec<GroupView>> {
    let store = state.store.read().await;
    Json(store.groups_for(&user_id).into_iter().map(GroupView::from).collect())
}

pub async fn group_details(
    State(state): State<Arc<AppState>>,
    ApiPath(group_id): ApiPath<Uuid>,
) -> ApiResult<Json<GroupView>> {
    let store = state.store.read().await;
    Ok(Json(GroupView::from(store.group(group_id)?)))
}

pub async fn add_group_member(
    State(state): State<Arc<AppState>>,
    ApiPath(group_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<MemberRequest>,
) -> ApiResult<Json<GroupView>> {
    let group = state.store.write().await.add_member(group_id, &req.user_id)?;
    info!(group_id = %group_id, user = %req.user_id, "member added");
    Ok(Json(GroupView::from(&group)))
}

pub async fn remove_group_member(
    State(state): State<Arc<AppState>>,
    ApiPath(group_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<RemoveMemberRequest>,
) -> ApiResult<Json<GroupView>> {
    let group = state
        .store
        .write()
        .await
        .remove_member(group_id, &req.user_id, &req.creator_id)?;
    info!(group_id = %group_id, user = %req.user_id, "member removed");
    Ok(Json(GroupView::from(&group)))
}

pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    ApiPath(group_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<MemberRequest>,
) -> ApiResult<Json<Ack>> {
    let removed = state.store.write().await.delete_group(group_id, &req.user_id)?;
    info!(group_id = %group_id, removed_messages = removed, "group deleted");
    Ok(Json(Ack::ok("Group deleted successfully")))
}

pub async fn send_group_message(
    State(state): State<Arc<AppState>>,
    ApiPath(group_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<GroupMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageView>)> {
    if req.text.trim().is_empty() && req.attachments.has_no_media() {
        return Err(ApiError::BadRequest(
            "A message needs text or an attachment".to_string(),
        ));
    }

    let sealed = state.pipeline.prepare_outgoing(&req.text, &req.attachments);
    let record = state.store.write().await.insert_group_message(
        group_id,
        &req.sender_id,
        sealed,
        req.attachments,
    )?;

    info!(message_id = %record.id, group_id = %group_id, sender = %req.sender_id, "group message stored");
    Ok((StatusCode::CREATED, Json(state.view(&record))))
}

pub async fn group_messages(
    State(state): State<Arc<AppState>>,
    ApiPath(group_id): ApiPath<Uuid>,
) -> ApiResult<Json<HistoryView>> {
    let records = state.store.read().await.group_messages(group_id)?;
    Ok(Json(state.history(&records)))
}

pub async fn hmac_generate(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<HmacGenerateRequest>,
) -> Json<HmacGenerateResponse> {
    Json(HmacGenerateResponse {
        hmac: state.pipeline.hmac().generate(&req.message),
    })
}

pub async fn hmac_verify(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<HmacVerifyRequest>,
) -> Json<HmacVerifyResponse> {
    Json(HmacVerifyResponse {
        valid: state.pipeline.hmac().verify(&req.message, &req.hmac),
    })
}
