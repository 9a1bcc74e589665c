// secure_chat/chat_server/tests/api_tests.rs

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::Json;
use chat_crypto::{Attachments, MessageAuthPipeline};
use chat_server::api::*;
use chat_server::models::*;
use chat_server::{ApiError, ApiJson, ApiPath, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "hardcoded-hmac-secret-key";

fn state() -> Arc<AppState> {
    Arc::new(AppState::new(MessageAuthPipeline::with_secret(SECRET).unwrap()))
}

fn direct(sender: &str, receiver: &str, text: &str) -> SendMessageRequest {
    SendMessageRequest {
        sender: sender.to_string(),
        receiver: receiver.to_string(),
        msg_by_user_id: None,
        text: text.to_string(),
        attachments: Attachments::default(),
    }
}

async fn send(state: &Arc<AppState>, sender: &str, receiver: &str, text: &str) -> MessageView {
    let (status, Json(view)) = send_message(State(state.clone()), ApiJson(direct(sender, receiver, text)))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    view
}

async fn history(state: &Arc<AppState>, a: &str, b: &str) -> HistoryView {
    let Json(view) = conversation_history(
        State(state.clone()),
        ApiPath((a.to_string(), b.to_string())),
    )
    .await;
    view
}

#[tokio::test]
async fn test_send_then_read_back_verified() {
    let state = state();
    let sent = send(&state, "ana", "bia", "Hi").await;

    assert_eq!(sent.opened.encrypted_text, "#3000;#3179;");
    assert_eq!(sent.opened.text, "Hi");
    assert!(sent.opened.verified);
    assert_eq!(sent.msg_by_user_id, "ana");

    let read = history(&state, "bia", "ana").await;
    assert_eq!(read.messages.len(), 1);
    assert_eq!(read.messages[0].opened.text, "Hi");
    assert!(read.messages[0].opened.verified);
    assert!(!read.tampered);
}

#[tokio::test]
async fn test_stored_text_is_ciphertext() {
    let state = state();
    let sent = send(&state, "ana", "bia", "secret plan").await;

    let store = state.store.read().await;
    let record = store.message(sent.id).unwrap();
    assert!(!record.text.contains("secret"));
    assert!(record.text.starts_with('#'));
    assert_eq!(record.hmac.len(), 64);
}

#[tokio::test]
async fn test_send_rejects_empty_message() {
    let state = state();
    let err = send_message(State(state.clone()), ApiJson(direct("ana", "bia", "   ")))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));

    let mut req = direct("ana", "bia", "");
    req.attachments.image_url = "https://img.example/cat.png".to_string();
    let (_, Json(view)) = send_message(State(state), ApiJson(req)).await.unwrap();
    assert!(view.opened.verified);
    assert_eq!(view.opened.encrypted_text, "");
}

#[tokio::test]
async fn test_edit_reseals_and_keeps_attachments() {
    let state = state();
    let mut req = direct("ana", "bia", "Hi");
    req.attachments.image_url = "https://img.example/a.png".to_string();
    let (_, Json(sent)) = send_message(State(state.clone()), ApiJson(req)).await.unwrap();

    let Json(edited) = edit_message(
        State(state.clone()),
        ApiPath(sent.id),
        ApiJson(EditMessageRequest {
            new_text: "Hello".to_string(),
        }),
    )
    .await
    .unwrap();

    assert!(edited.edited);
    assert!(edited.edited_at.is_some());
    assert_eq!(edited.opened.text, "Hello");
    assert!(edited.opened.verified);
    assert_ne!(edited.hmac, sent.hmac);
    assert_eq!(edited.opened.attachments.image_url, "https://img.example/a.png");

    let read = history(&state, "ana", "bia").await;
    assert!(read.messages[0].opened.verified);
    assert_eq!(read.messages[0].opened.text, "Hello");
}

#[tokio::test]
async fn test_edit_validation() {
    let state = state();
    let sent = send(&state, "ana", "bia", "Hi").await;

    let blank = edit_message(
        State(state.clone()),
        ApiPath(sent.id),
        ApiJson(EditMessageRequest {
            new_text: " ".to_string(),
        }),
    )
    .await;
    assert!(matches!(blank, Err(ApiError::BadRequest(_))));

    let missing = edit_message(
        State(state),
        ApiPath(Uuid::new_v4()),
        ApiJson(EditMessageRequest {
            new_text: "x".to_string(),
        }),
    )
    .await;
    assert!(matches!(missing, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_message() {
    let state = state();
    let sent = send(&state, "ana", "bia", "oops").await;

    let Json(ack) = delete_message(State(state.clone()), ApiPath(sent.id)).await.unwrap();
    assert!(ack.success);
    assert!(history(&state, "ana", "bia").await.messages.is_empty());

    let again = delete_message(State(state), ApiPath(sent.id)).await;
    assert!(matches!(again, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_sidebar_and_seen() {
    let state = state();
    send(&state, "ana", "bia", "one").await;
    send(&state, "ana", "bia", "two").await;

    let Json(entries) = sidebar(State(state.clone()), ApiPath("bia".to_string())).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].peer, "ana");
    assert_eq!(entries[0].unseen_msg, 2);
    let last = entries[0].last_msg.as_ref().unwrap();
    assert_eq!(last.opened.text, "two");
    assert!(last.opened.verified);

    let Json(seen) = mark_seen(
        State(state.clone()),
        ApiJson(SeenRequest {
            user_id: "bia".to_string(),
            msg_by_user_id: "ana".to_string(),
        }),
    )
    .await;
    assert_eq!(seen.updated, 2);

    let Json(entries) = sidebar(State(state.clone()), ApiPath("bia".to_string())).await;
    assert_eq!(entries[0].unseen_msg, 0);

    let conversation_id = entries[0].conversation_id;
    soft_delete_conversation(
        State(state.clone()),
        ApiJson(SoftDeleteRequest {
            conversation_id,
            user_id: "bia".to_string(),
        }),
    )
    .await
    .unwrap();
    let Json(entries) = sidebar(State(state), ApiPath("bia".to_string())).await;
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_group_flow() {
    let state = state();
    let (status, Json(group)) = create_group(
        State(state.clone()),
        ApiJson(CreateGroupRequest {
            name: "team".to_string(),
            members: vec!["ana".to_string(), "bia".to_string()],
            creator_id: Some("ana".to_string()),
            group_avatar: String::new(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(group.creator, "ana");

    let Json(group) = add_group_member(
        State(state.clone()),
        ApiPath(group.id),
        ApiJson(MemberRequest {
            user_id: "caio".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(group.members.len(), 3);

    let Json(mine) = groups_for_user(State(state.clone()), ApiPath("caio".to_string())).await;
    assert_eq!(mine.len(), 1);

    for (sender, text) in [("ana", "hello all"), ("caio", "hey")] {
        send_group_message(
            State(state.clone()),
            ApiPath(group.id),
            ApiJson(GroupMessageRequest {
                sender_id: sender.to_string(),
                text: text.to_string(),
                attachments: Attachments::default(),
            }),
        )
        .await
        .unwrap();
    }

    let Json(read) = group_messages(State(state.clone()), ApiPath(group.id)).await.unwrap();
    assert_eq!(read.messages.len(), 2);
    assert!(read.messages.iter().all(|m| m.opened.verified));
    assert_eq!(read.messages[1].opened.text, "hey");
    assert!(!read.tampered);

    let forbidden = remove_group_member(
        State(state.clone()),
        ApiPath(group.id),
        ApiJson(RemoveMemberRequest {
            user_id: "bia".to_string(),
            creator_id: "caio".to_string(),
        }),
    )
    .await;
    assert!(matches!(forbidden, Err(ApiError::Forbidden(_))));

    let not_creator = delete_group(
        State(state.clone()),
        ApiPath(group.id),
        ApiJson(MemberRequest {
            user_id: "bia".to_string(),
        }),
    )
    .await;
    assert!(matches!(not_creator, Err(ApiError::Forbidden(_))));

    delete_group(
        State(state.clone()),
        ApiPath(group.id),
        ApiJson(MemberRequest {
            user_id: "ana".to_string(),
        }),
    )
    .await
    .unwrap();
    let gone = group_details(State(state), ApiPath(group.id)).await;
    assert!(matches!(gone, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_hmac_demo_endpoints() {
    let state = state();
    let Json(generated) = hmac_generate(
        State(state.clone()),
        ApiJson(HmacGenerateRequest {
            message: "transfer 10".to_string(),
        }),
    )
    .await;
    assert_eq!(generated.hmac.len(), 64);

    let Json(ok) = hmac_verify(
        State(state.clone()),
        ApiJson(HmacVerifyRequest {
            message: "transfer 10".to_string(),
            hmac: generated.hmac.clone(),
        }),
    )
    .await;
    assert!(ok.valid);

    let Json(edited) = hmac_verify(
        State(state),
        ApiJson(HmacVerifyRequest {
            message: "transfer 1000".to_string(),
            hmac: generated.hmac,
        }),
    )
    .await;
    assert!(!edited.valid);
}

#[tokio::test]
async fn test_wire_format_of_message_view() {
    let state = state();
    let sent = send(&state, "ana", "bia", "Hi").await;
    let json = serde_json::to_value(&sent).unwrap();

    assert_eq!(json["_id"], sent.id.to_string());
    assert_eq!(json["text"], "Hi");
    assert_eq!(json["encryptedText"], "#3000;#3179;");
    assert_eq!(json["verified"], true);
    assert_eq!(json["msgByUserId"], "ana");
    assert_eq!(json["imageUrl"], "");
}

async fn call(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("application/json"), "{}", content_type);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_null_text_with_image_is_accepted() {
    let state = state();
    let body = json!({
        "sender": "ana",
        "receiver": "bia",
        "text": null,
        "imageUrl": "https://img.example/cat.png",
        "fileName": null,
    });
    let (status, sent) = call(&state, post_json("/api/messages", &body.to_string())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["encryptedText"], "");
    assert_eq!(sent["verified"], true);
    assert_eq!(sent["imageUrl"], "https://img.example/cat.png");

    let (status, read) = call(&state, get("/api/conversations/bia/ana")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["messages"][0]["verified"], true);
    assert_eq!(read["tampered"], false);
}

#[tokio::test]
async fn test_null_text_without_media_is_rejected() {
    let state = state();
    let body = json!({ "sender": "ana", "receiver": "bia", "text": null });
    let (status, error) = call(&state, post_json("/api/messages", &body.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], true);
    assert!(error["message"].is_string());
}

#[tokio::test]
async fn test_group_message_with_null_text_and_file() {
    let state = state();
    let body = json!({ "name": "team", "members": ["ana", "bia"] });
    let (status, group) = call(&state, post_json("/api/groups", &body.to_string())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = group["_id"].as_str().unwrap().to_string();

    let body = json!({
        "senderId": "bia",
        "text": null,
        "fileUrl": "https://files.example/a.pdf",
        "fileName": "a.pdf",
    });
    let uri = format!("/api/groups/{}/messages", id);
    let (status, sent) = call(&state, post_json(&uri, &body.to_string())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["verified"], true);

    let (_, read) = call(&state, get(&uri)).await;
    assert_eq!(read["messages"][0]["fileName"], "a.pdf");
    assert_eq!(read["messages"][0]["verified"], true);

    let blank = json!({ "senderId": "bia", "text": "  " });
    let (status, error) = call(&state, post_json(&uri, &blank.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], true);
}

#[tokio::test]
async fn test_bad_path_id_gets_json_error() {
    let state = state();
    let (status, error) = call(&state, get("/api/groups/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], true);
    assert!(error["message"].as_str().unwrap().contains("UUID"));

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/messages/12345")
        .body(Body::empty())
        .unwrap();
    let (status, error) = call(&state, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], true);
}

#[tokio::test]
async fn test_malformed_body_gets_json_error() {
    let state = state();
    let (status, error) = call(&state, post_json("/api/messages", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], true);

    let (status, error) = call(&state, post_json("/api/hmac/verify", r#"{"message":"x"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], true);
    assert!(error["message"].as_str().unwrap().contains("hmac"));
}

#[tokio::test]
async fn test_unknown_message_gets_json_not_found() {
    let state = state();
    let uri = format!("/api/messages/{}", Uuid::new_v4());
    let request = Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap();
    let (status, error) = call(&state, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error, json!({ "message": "Message not found", "error": true }));
}
