//! End-to-end tests over a local mock HTTP server.
//!
//! Every scenario drives the full stack — context → session →
//! `ReqwestTransport` → wiremock — including streaming, cancellation,
//! timeouts, and provider error bodies.

use std::sync::Arc;
use std::time::Duration;

use llm_loom::test_schemas::{claude_like, openai_like};
use llm_loom::{Cancellation, ChatContext, ChatSession, ContextConfig, LoomError, ProviderSchema};
use llm_loom_reqwest::{ReqwestTransport, TransportConfig};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a session whose schema points at the mock server.
fn session_for(mut schema_doc: Value, endpoint: String, api_key: &str) -> ChatSession {
    schema_doc["api"]["endpoint"] = json!(endpoint);
    let schema = Arc::new(ProviderSchema::from_value(schema_doc).unwrap());
    let mut context = ChatContext::new(
        schema,
        ContextConfig {
            enable_streaming_support: true,
            ..Default::default()
        },
    )
    .unwrap();
    context.set_api_key(api_key);
    ChatSession::new(context, Arc::new(ReqwestTransport::default()))
}

fn openai_session(server: &MockServer) -> ChatSession {
    session_for(
        openai_like(),
        format!("{}/v1/chat/completions", server.uri()),
        "sk-test",
    )
}

fn claude_session(server: &MockServer) -> ChatSession {
    session_for(
        claude_like(),
        format!("{}/v1/messages", server.uri()),
        "sk-ant-test",
    )
}

#[tokio::test]
async fn test_single_turn_ping_pong() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Pong" },
                          "finish_reason": "stop" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = openai_session(&server);
    let reply = session.send("Ping").await.unwrap();

    assert_eq!(reply, "Pong");
    assert_eq!(session.context().messages().len(), 2);
    assert_eq!(session.context().messages()[1].text(), "Pong");
}

#[tokio::test]
async fn test_request_body_shape_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "Terse." }],
            "stop_reason": "end_turn"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = claude_session(&server);
    session
        .context_mut()
        .set_system_message("You are terse.")
        .unwrap();
    session.send("Hi").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["system"], "You are terse.");
    assert_eq!(body["model"], "claude-sonnet-4-20250514");
    assert_eq!(
        body["messages"],
        json!([{ "role": "user", "content": [{ "type": "text", "text": "Hi" }] }])
    );
    assert_eq!(body["stream"], false);
}

#[tokio::test]
async fn test_streaming_concatenation() {
    let server = MockServer::start().await;
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body.as_bytes(), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut session = openai_session(&server);
    let mut chunks = Vec::new();
    let reply = session
        .send_stream(
            "Say hello",
            |chunk| {
                chunks.push(chunk.to_string());
                true
            },
            &Cancellation::none(),
        )
        .await
        .unwrap();

    assert_eq!(chunks, vec!["Hel", "lo"]);
    assert_eq!(reply, "Hello");
    assert_eq!(session.context().messages()[1].text(), "Hello");

    // The request carried the streaming flag.
    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["stream"], true);
}

#[tokio::test]
async fn test_streaming_done_sentinel_terminates_despite_trailing_bytes() {
    let server = MockServer::start().await;
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
        "data: [DONE]\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
    );
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body.as_bytes(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let mut session = openai_session(&server);
    let reply = session
        .send_stream("x", |_| true, &Cancellation::none())
        .await
        .unwrap();
    assert_eq!(reply, "Hi");
}

#[tokio::test]
async fn test_streaming_tolerates_malformed_frames() {
    let server = MockServer::start().await;
    let sse_body = concat!(
        "data: {not json}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body.as_bytes(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let mut session = openai_session(&server);
    let reply = session
        .send_stream("x", |_| true, &Cancellation::none())
        .await
        .unwrap();
    assert_eq!(reply, "ok");
}

#[tokio::test]
async fn test_cancellation_mid_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "choices": [{ "message": { "content": "too late" } }]
                }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let (cancel, handle) = Cancellation::flag();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        handle.cancel();
    });

    let mut session = openai_session(&server);
    let err = session.send_with("Hello", &cancel).await.unwrap_err();
    assert!(matches!(err, LoomError::Cancelled));

    // The user turn remains; no assistant turn was appended.
    let messages = session.context().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, "user");
}

#[tokio::test]
async fn test_non_2xx_error_body_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "type": "rate_limit_exceeded", "message": "Too many requests" }
        })))
        .mount(&server)
        .await;

    let mut session = openai_session(&server);
    let err = session.send("Hello").await.unwrap_err();
    match err {
        LoomError::Http {
            status,
            message,
            retryable,
        } => {
            assert_eq!(status, Some(http::StatusCode::TOO_MANY_REQUESTS));
            assert_eq!(message, "Too many requests");
            assert!(retryable);
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_streaming_error_status_body_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(529).set_body_json(json!({
            "error": { "type": "overloaded_error", "message": "Overloaded" }
        })))
        .mount(&server)
        .await;

    let mut session = claude_session(&server);
    let err = session
        .send_stream("x", |_| true, &Cancellation::none())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LoomError::Http { message, .. } if message == "Overloaded"
    ));
    // No assistant turn on a failed stream.
    assert_eq!(session.context().messages().len(), 1);
}

#[tokio::test]
async fn test_timeout_surfaces_as_timeout_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "choices": [{ "message": { "content": "slow" } }] }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let mut schema_doc = openai_like();
    schema_doc["api"]["endpoint"] = json!(format!("{}/v1/chat/completions", server.uri()));
    let schema = Arc::new(ProviderSchema::from_value(schema_doc).unwrap());
    let mut context = ChatContext::new(schema, ContextConfig::default()).unwrap();
    context.set_api_key("sk-test");

    let transport = ReqwestTransport::new(TransportConfig {
        timeout: Duration::from_millis(100),
        ..Default::default()
    });
    let mut session = ChatSession::new(context, Arc::new(transport));

    let err = session.send("Hello").await.unwrap_err();
    assert!(matches!(err, LoomError::Timeout { .. }), "got {err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_multi_turn_history_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "4" } }]
        })))
        .mount(&server)
        .await;

    let mut session = openai_session(&server);
    session.send("What's 2+2?").await.unwrap();
    session.send("And again?").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let second: Value = serde_json::from_slice(&requests[1].body).unwrap();
    let messages = second["messages"].as_array().unwrap();
    // user, assistant, user
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], "4");
}
