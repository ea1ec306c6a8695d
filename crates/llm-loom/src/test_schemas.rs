//! Schema documents for tests: one Anthropic-shaped, one OpenAI-shaped.
//!
//! Available when the `test-utils` feature is enabled, so downstream
//! crates can reuse them in their own suites. Also compiled during
//! `#[cfg(test)]` for this crate's own tests. These mirror the bundled
//! schema files in `schemas/` closely enough to exercise every engine
//! branch without touching the filesystem.

use serde_json::{Value, json};

/// An Anthropic-shaped schema: top-level `system` field, content-part
/// arrays, `x-api-key` auth, alternating roles, temperature capped at 1.
pub fn claude_like() -> Value {
    json!({
        "provider": { "name": "claude", "display_name": "Claude", "api_version": "2023-06-01" },
        "api": { "endpoint": "https://api.anthropic.com/v1/messages", "method": "POST",
                 "timeout_ms": 60000, "max_retries": 2 },
        "authentication": { "type": "header", "key_name": "x-api-key", "key_prefix": "",
                            "key_placeholder": "<YOUR_API_KEY>" },
        "headers": {
            "required": {
                "Content-Type": "application/json",
                "anthropic-version": "2023-06-01"
            }
        },
        "models": {
            "available": ["claude-sonnet-4-20250514", "claude-3-5-haiku-20241022",
                          "claude-3-5-sonnet-20241022"],
            "deprecated": ["claude-3-opus-20240229"],
            "default": "claude-sonnet-4-20250514"
        },
        "request_template": {
            "model": "claude-sonnet-4-20250514",
            "messages": [],
            "max_tokens": 1024
        },
        "parameters": {
            "temperature": { "type": "float", "min": 0.0, "max": 1.0 },
            "max_tokens": { "type": "integer", "min": 1, "max": 8192, "required": true,
                            "default": 1024 },
            "top_p": { "type": "float", "min": 0.0, "max": 1.0 },
            "top_k": { "type": "integer", "min": 0 },
            "stop_sequences": { "type": "array" }
        },
        "message_roles": ["user", "assistant"],
        "system_message": { "supported": true, "field": "system", "type": "string" },
        "multimodal": {
            "supported": true,
            "supported_types": ["image/jpeg", "image/png", "image/gif", "image/webp"],
            "max_images_per_message": 20
        },
        "message_format": {
            "structure": { "role": "<ROLE>", "content": [] },
            "content_types": {
                "text": { "type": "text", "text": "<TEXT_CONTENT>" },
                "image": { "type": "image",
                           "source": { "type": "base64", "media_type": "<MEDIA_TYPE>",
                                       "data": "<MEDIA_DATA>" } }
            }
        },
        "response_format": {
            "success": {
                "text_path": ["content"],
                "content_path": ["content"],
                "usage_path": ["usage"],
                "model_path": ["model"],
                "stop_reason_path": ["stop_reason"]
            },
            "error": {
                "error_path": ["error", "message"],
                "error_type_path": ["error", "type"]
            },
            "stream": {
                "event_types": ["message_start", "content_block_delta", "message_stop"],
                "content_delta_path": ["delta", "text"]
            }
        },
        "features": {
            "streaming": true,
            "function_calling": false,
            "json_mode": false,
            "vision": true,
            "system_messages": true,
            "message_history": true
        },
        "error_codes": {
            "400": "invalid_request_error",
            "401": "authentication_error",
            "429": "rate_limit_error",
            "529": "overloaded_error"
        },
        "validation": {
            "required_fields": ["model", "messages", "max_tokens"],
            "message_validation": {
                "min_messages": 1,
                "alternating_roles": true,
                "last_message_role": "user"
            }
        }
    })
}

/// An OpenAI-shaped schema: scalar message content, system as a
/// prepended message, bearer auth, temperature up to 2.
pub fn openai_like() -> Value {
    json!({
        "provider": { "name": "openai", "display_name": "OpenAI" },
        "api": { "endpoint": "https://api.openai.com/v1/chat/completions", "method": "POST",
                 "timeout_ms": 60000, "max_retries": 2 },
        "authentication": { "type": "header", "key_name": "Authorization",
                            "key_prefix": "Bearer ",
                            "key_placeholder": "<YOUR_OPENAI_API_KEY>" },
        "headers": {
            "required": {
                "Content-Type": "application/json",
                "Authorization": "Bearer <YOUR_OPENAI_API_KEY>"
            }
        },
        "models": {
            "available": ["gpt-4o", "gpt-4o-mini", "gpt-4.1"],
            "deprecated": ["gpt-4-turbo"],
            "default": "gpt-4o"
        },
        "request_template": {
            "model": "gpt-4o",
            "messages": []
        },
        "parameters": {
            "temperature": { "type": "float", "min": 0.0, "max": 2.0 },
            "max_tokens": { "type": "integer", "min": 1 },
            "top_p": { "type": "float", "min": 0.0, "max": 1.0 },
            "frequency_penalty": { "type": "float", "min": -2.0, "max": 2.0 },
            "presence_penalty": { "type": "float", "min": -2.0, "max": 2.0 }
        },
        "message_roles": ["system", "user", "assistant"],
        "system_message": { "supported": true, "role": "system" },
        "multimodal": {
            "supported": true,
            "supported_types": ["image/jpeg", "image/png", "image/gif", "image/webp"]
        },
        "message_format": {
            "structure": { "role": "<ROLE>", "content": "<TEXT_CONTENT>" },
            "content_types": {
                "text": { "type": "text", "text": "<TEXT_CONTENT>" },
                "image": { "type": "image_url",
                           "image_url": { "url": "data:<MEDIA_TYPE>;base64,<MEDIA_DATA>" } }
            }
        },
        "response_format": {
            "success": {
                "text_path": ["choices", 0, "message", "content"],
                "content_path": ["choices", 0, "message"],
                "usage_path": ["usage"],
                "model_path": ["model"],
                "stop_reason_path": ["choices", 0, "finish_reason"]
            },
            "error": {
                "error_path": ["error", "message"],
                "error_type_path": ["error", "type"]
            },
            "stream": {
                "content_delta_path": ["choices", 0, "delta", "content"]
            }
        },
        "features": {
            "streaming": true,
            "function_calling": false,
            "json_mode": true,
            "vision": true,
            "system_messages": true,
            "message_history": true
        },
        "error_codes": {
            "400": "invalid_request_error",
            "401": "invalid_api_key",
            "429": "rate_limit_exceeded"
        },
        "validation": {
            "required_fields": ["model", "messages"],
            "message_validation": { "min_messages": 1 }
        }
    })
}
