//! Engine laws exercised against the bundled provider schemas.
//!
//! These tests load the real schema documents from `schemas/` at the
//! workspace root, so they double as validation that the shipped files
//! stay well-formed.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use llm_loom::{
    ChatContext, ContextConfig, ContextFactory, LoomError, SchemaRegistry, SseEvent, SseParser,
};

fn schemas_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../schemas")
}

fn registry() -> SchemaRegistry {
    SchemaRegistry::new(schemas_dir())
}

fn context(provider: &str) -> ChatContext {
    let schema = registry().load(provider).expect("bundled schema loads");
    ChatContext::new(schema, ContextConfig::default()).unwrap()
}

// 1×1 transparent PNG, base64.
const TINY_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAIAAACQd1PeAAAADElEQVQImWP4//8/AwAI/AL+hc2rNAAAAABJRU5ErkJggg==";

// ── Registry over the shipped files ─────────────────────────────────

#[test]
fn bundled_schemas_all_load() {
    let registry = registry();
    let providers = registry.providers();
    for name in ["claude", "deepseek", "mistral", "openai"] {
        assert!(providers.iter().any(|p| p == name), "missing {name}");
        assert!(registry.is_available(name));
        let schema = registry.load(name).unwrap();
        assert_eq!(schema.name(), name);
        assert_eq!(schema.method(), "POST");
        assert!(schema.features().streaming);
    }
}

#[test]
fn factory_builds_contexts_for_every_provider() {
    let factory = ContextFactory::new(Arc::new(registry()));
    for name in ["claude", "deepseek", "mistral", "openai"] {
        let context = factory.create_context(name).unwrap();
        assert_eq!(context.provider_name(), name);
        assert!(context.model().is_some());
    }
}

// ── Message-role invariant ──────────────────────────────────────────

#[test]
fn every_message_role_is_schema_declared() {
    for name in ["claude", "deepseek", "mistral", "openai"] {
        let mut context = context(name);
        context.add_user_message("hello").unwrap();
        context.add_assistant_message("hi").unwrap();
        for message in context.messages() {
            assert!(
                context.schema().message_roles().contains(&message.role),
                "{name}: role {} undeclared",
                message.role
            );
        }
        assert!(context.add_message("critic", "no such role", None, None).is_err());
    }
}

// ── Request-shape scenarios ─────────────────────────────────────────

#[test]
fn anthropic_style_system_field_and_content_array() {
    let mut context = context("claude");
    context.set_system_message("You are terse.").unwrap();
    context.add_user_message("Hi").unwrap();

    let request = context.build_request(false).unwrap();
    assert_eq!(request["system"], "You are terse.");
    assert_eq!(
        request["messages"],
        json!([{ "role": "user", "content": [{ "type": "text", "text": "Hi" }] }])
    );
}

#[test]
fn openai_style_system_message_prepended() {
    let mut context = context("openai");
    context.set_system_message("Be helpful.").unwrap();
    context.add_user_message("Hi").unwrap();

    let request = context.build_request(false).unwrap();
    assert!(request.get("system").is_none());
    assert_eq!(request["messages"][0]["role"], "system");
    assert_eq!(request["messages"][0]["content"], "Be helpful.");
    assert_eq!(request["messages"][1]["content"], "Hi");
}

#[test]
fn multimodal_claude_shaped_content() {
    let mut context = context("claude");
    context
        .add_user_message_with_media("what is this", "image/png", TINY_PNG)
        .unwrap();

    let request = context.build_request(false).unwrap();
    let content = request["messages"][0]["content"].as_array().unwrap();
    assert_eq!(content.len(), 2);
    assert_eq!(content[0], json!({ "type": "text", "text": "what is this" }));
    assert_eq!(content[1]["type"], "image");
    assert_eq!(content[1]["source"]["type"], "base64");
    assert_eq!(content[1]["source"]["media_type"], "image/png");
    assert_eq!(content[1]["source"]["data"], TINY_PNG);
}

#[test]
fn image_rejected_on_text_only_provider() {
    for name in ["deepseek", "mistral"] {
        let mut context = context(name);
        let err = context
            .add_user_message_with_media("look", "image/png", TINY_PNG)
            .unwrap_err();
        assert!(matches!(err, LoomError::Validation(_)), "{name}");
        assert!(context.messages().is_empty());
    }
}

#[test]
fn temperature_bounds_are_per_schema() {
    // 2.0 succeeds where the schema's max is 2.0 and fails where it is 1.0.
    let mut openai = context("openai");
    openai.set_parameter("temperature", 2.0).unwrap();

    let mut claude = context("claude");
    let err = claude.set_parameter("temperature", 2.0).unwrap_err();
    assert!(matches!(err, LoomError::Validation(_)));
    assert!(!claude.has_parameter("temperature"));
}

#[test]
fn invalid_parameter_leaves_context_unmodified() {
    let mut context = context("openai");
    let before = context.parameters().clone();
    assert!(context.set_parameter("temperature", 3.0).is_err());
    assert_eq!(context.parameters(), &before);
}

#[test]
fn empty_message_list_fails_validation() {
    for name in ["claude", "deepseek", "mistral", "openai"] {
        let context = context(name);
        assert!(!context.is_valid_request(), "{name}");
        assert!(matches!(
            context.build_request(false),
            Err(LoomError::Validation(_))
        ));
    }
}

#[test]
fn stream_flag_mirrors_streaming_argument() {
    let mut context = context("openai");
    context.add_user_message("hi").unwrap();
    assert_eq!(context.build_request(true).unwrap()["stream"], true);
    assert_eq!(context.build_request(false).unwrap()["stream"], false);
}

// ── Reset law ───────────────────────────────────────────────────────

#[test]
fn reset_restores_schema_and_config_defaults() {
    let schema = registry().load("claude").unwrap();
    let mut context = ChatContext::new(
        schema,
        ContextConfig {
            default_max_tokens: Some(100),
            default_temperature: Some(0.3),
            ..Default::default()
        },
    )
    .unwrap();

    context.set_parameter("top_p", 0.5).unwrap();
    context.add_user_message("Hello").unwrap();
    context.set_system_message("sys").unwrap();

    context.reset();

    assert!(context.messages().is_empty());
    assert!(context.system_message().is_none());
    assert!(!context.has_parameter("top_p"));
    assert_eq!(context.parameter("max_tokens"), Some(&json!(100)));
    assert_eq!(context.parameter("temperature"), Some(&json!(0.3)));
}

// ── Round-trip laws ─────────────────────────────────────────────────

#[test]
fn state_snapshot_roundtrip_is_identity() {
    for name in ["claude", "deepseek", "mistral", "openai"] {
        let registry = registry();
        let schema = registry.load(name).unwrap();
        let mut original = ChatContext::new(schema.clone(), ContextConfig::default()).unwrap();
        original.set_parameter("temperature", 0.4).unwrap();
        original.set_system_message("Be brief.").unwrap();
        original.add_user_message("Hello").unwrap();
        original.add_assistant_message("Hi").unwrap();

        let mut restored = ChatContext::new(schema, ContextConfig::default()).unwrap();
        restored.import_state(&original.export_state()).unwrap();

        assert_eq!(restored.model(), original.model(), "{name}");
        assert_eq!(restored.system_message(), original.system_message());
        assert_eq!(restored.parameters(), original.parameters());
        assert_eq!(restored.messages(), original.messages());
    }
}

#[test]
fn mock_response_extraction_per_schema() {
    // For every schema, a response built in its success shape extracts
    // back to the original text.
    let text = "The quick brown fox";

    let openai_shaped = json!({
        "choices": [{ "message": { "role": "assistant", "content": text },
                      "finish_reason": "stop" }],
        "usage": { "prompt_tokens": 3, "completion_tokens": 5 }
    });
    for name in ["openai", "deepseek", "mistral"] {
        assert_eq!(
            context(name).extract_text_response(&openai_shaped).unwrap(),
            text,
            "{name}"
        );
    }

    let claude_shaped = json!({
        "content": [{ "type": "text", "text": text }],
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 3, "output_tokens": 5 }
    });
    assert_eq!(
        context("claude").extract_text_response(&claude_shaped).unwrap(),
        text
    );
}

#[test]
fn error_extraction_per_schema() {
    let body = json!({
        "error": { "type": "invalid_request_error", "message": "bad request" }
    });
    for name in ["claude", "deepseek", "openai"] {
        assert_eq!(
            context(name).extract_error(&body).as_deref(),
            Some("bad request"),
            "{name}"
        );
    }
    // Mistral reports errors at the top level.
    let mistral_body = json!({ "type": "unauthorized", "message": "no key" });
    assert_eq!(
        context("mistral").extract_error(&mistral_body).as_deref(),
        Some("no key")
    );
}

// ── Streaming law ───────────────────────────────────────────────────

#[test]
fn sse_deltas_concatenate_to_full_text() {
    // A constructed stream whose deltas concatenate to `t` yields
    // exactly `t` through parser + schema delta extraction.
    let context = context("openai");
    let pieces = ["Hel", "lo, ", "wor", "ld"];
    let mut raw = String::new();
    for piece in pieces {
        raw.push_str(&format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{piece}\"}}}}]}}\n\n"
        ));
    }
    raw.push_str("data: [DONE]\n\n");

    let mut parser = SseParser::new();
    let mut collected = String::new();
    let mut saw_done = false;
    // Feed byte-by-byte to exercise partial-frame buffering.
    for byte in raw.as_bytes() {
        for event in parser.push(std::slice::from_ref(byte)).unwrap() {
            match event {
                SseEvent::Frame(frame) => {
                    if let Some(delta) = context.extract_stream_delta(&frame).unwrap() {
                        collected.push_str(&delta);
                    }
                }
                SseEvent::Done => saw_done = true,
            }
        }
    }
    assert_eq!(collected, "Hello, world");
    assert!(saw_done);
}

#[test]
fn claude_shaped_stream_deltas() {
    let context = context("claude");
    let frame = json!({
        "type": "content_block_delta",
        "index": 0,
        "delta": { "type": "text_delta", "text": "chunk" }
    });
    assert_eq!(
        context.extract_stream_delta(&frame).unwrap().as_deref(),
        Some("chunk")
    );
    // Frames of other event types carry no delta.
    let start = json!({ "type": "message_start", "message": { "id": "msg_1" } });
    assert_eq!(context.extract_stream_delta(&start).unwrap(), None);
}

// ── Headers against shipped schemas ─────────────────────────────────

#[test]
fn headers_resolve_per_provider() {
    let mut claude = context("claude");
    claude.set_api_key("sk-ant-k1");
    let headers = claude.build_headers().unwrap();
    assert_eq!(headers["x-api-key"], "sk-ant-k1");
    assert_eq!(headers["anthropic-version"], "2023-06-01");
    assert_eq!(headers["Content-Type"], "application/json");

    let mut openai = context("openai");
    openai.set_api_key("sk-oa-k2");
    let headers = openai.build_headers().unwrap();
    assert_eq!(headers["Authorization"], "Bearer sk-oa-k2");
    // Optional org header is omitted when its placeholder is unresolved
    // by the key substitution... it is substituted with the key, so it
    // must not leak a placeholder.
    for value in headers.values() {
        assert!(!value.contains('<'), "unresolved placeholder in {value}");
    }
}

#[test]
fn missing_api_key_is_a_validation_error() {
    for name in ["claude", "deepseek", "mistral", "openai"] {
        let context = context(name);
        assert!(!context.has_api_key());
        assert!(matches!(
            context.build_headers(),
            Err(LoomError::Validation(_))
        ), "{name}");
    }
}
