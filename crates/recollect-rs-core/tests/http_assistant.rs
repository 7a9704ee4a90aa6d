//! HTTP assistant client tests against a local axum server.

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use recollect_rs_core::HttpAssistantClient;
use recollect_rs_protocol::{
    AssistantClient, AssistantError, AssistantRequest, ChatRole, LedgerProjection, WireMessage,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::time::Duration;

async fn chat(Json(body): Json<Value>) -> Json<Value> {
    let messages = body["messages"].as_array().map_or(0, Vec::len);
    let recent = body["recentRecords"].as_array().map_or(0, Vec::len);
    let has_local = body.get("localRecords").is_some();
    Json(json!({
        "message": { "content": format!("messages={messages} recent={recent} local={has_local}") },
        "records_total_count": recent,
    }))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "upstream down")
}

async fn garbage() -> &'static str {
    "not json"
}

async fn serve() -> String {
    let app = Router::new()
        .route("/chat", post(chat))
        .route("/broken", post(broken))
        .route("/garbage", post(garbage));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn request() -> AssistantRequest {
    AssistantRequest {
        messages: vec![WireMessage {
            role: ChatRole::User,
            content: "hello".to_string(),
        }],
        recent_records: vec![LedgerProjection {
            id: "rec-1".to_string(),
            persisted: true,
            payload: None,
        }],
        local_records: None,
    }
}

/// The client posts the documented request shape and decodes the reply.
#[tokio::test]
async fn posts_request_and_decodes_response() {
    let base = serve().await;
    let client =
        HttpAssistantClient::new(format!("{base}/chat"), Duration::from_secs(5)).expect("client");
    let response = client.send(&request()).await.expect("send");
    assert_eq!(response.message.content, "messages=1 recent=1 local=false");
    assert_eq!(response.records_total_count, Some(1));
    assert_eq!(response.records_queried, None);
}

/// Non-success statuses and undecodable bodies are typed errors.
#[tokio::test]
async fn reports_status_and_decode_errors() {
    let base = serve().await;
    let client =
        HttpAssistantClient::new(format!("{base}/broken"), Duration::from_secs(5)).expect("client");
    match client.send(&request()).await {
        Err(AssistantError::Status { status, body }) => {
            assert_eq!(status, 502);
            assert_eq!(body, "upstream down");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let client = HttpAssistantClient::new(format!("{base}/garbage"), Duration::from_secs(5))
        .expect("client");
    assert!(matches!(
        client.send(&request()).await,
        Err(AssistantError::InvalidResponse(_))
    ));
}

/// Unreachable endpoints surface as transport errors.
#[tokio::test]
async fn unreachable_endpoint_is_reported() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let client = HttpAssistantClient::new(format!("http://{addr}/chat"), Duration::from_secs(2))
        .expect("client");
    assert!(matches!(
        client.send(&request()).await,
        Err(AssistantError::Unreachable(_))
    ));
}
