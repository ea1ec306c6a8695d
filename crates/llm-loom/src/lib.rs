//! # llm-loom
//!
//! Schema-driven client engine for chat-style LLM HTTP APIs.
//!
//! One engine speaks to every provider: each backend's wire contract —
//! endpoint, auth, request template, parameter constraints, message
//! shapes, response extraction paths — lives in a declarative JSON
//! schema loaded at runtime. Adding a provider means writing a schema
//! file, not a crate. Variants are data, not types.
//!
//! This crate contains **zero** network code — HTTP happens behind the
//! object-safe [`HttpTransport`] trait, implemented by sibling crates
//! (see `llm-loom-reqwest`) or by the bundled
//! [`MockTransport`](mock::MockTransport) in tests.
//!
//! # Architecture
//!
//! ```text
//!  schemas/*.json ──▶ SchemaRegistry ──▶ Arc<ProviderSchema>  (immutable, shared)
//!                                              │
//!                      ContextFactory ─────────┤  per-thread or fresh
//!                                              ▼
//!                        ChatContext  (messages, params, synthesis, extraction)
//!                                              │
//!                         ChatSession ─────────┼──▶ dyn HttpTransport ──▶ wire
//!                                              ▼
//!                              send / send_blocking / send_stream
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use llm_loom::{Cancellation, ChatSession, ContextFactory, SchemaRegistry};
//!
//! # async fn example(transport: Arc<dyn llm_loom::HttpTransport>) -> Result<(), llm_loom::LoomError> {
//! let registry = Arc::new(SchemaRegistry::new("./schemas"));
//! let factory = ContextFactory::new(registry);
//!
//! let mut session = factory.create_session("claude", transport)?;
//! session.context_mut().set_api_key("sk-ant-...");
//!
//! let reply = session.send("Explain ownership in Rust").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`schema`] | Parsed, validated, immutable provider schemas |
//! | [`registry`] | Schema lookup, loading, and caching by provider name |
//! | [`chat`] | Messages and content parts |
//! | [`config`] | Context construction defaults |
//! | [`context`] | Conversation state, request synthesis, response extraction |
//! | [`session`] | The chat facade over a transport |
//! | [`factory`] | Fresh and per-thread context creation |
//! | [`transport`] | The HTTP sink interface and cancellation |
//! | [`sse`] | Incremental `text/event-stream` parsing |
//! | [`error`] | Unified [`LoomError`] |
//! | [`keys`] | Conventional API-key lookup (env, rc file) |

#![warn(missing_docs)]

pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod keys;
pub mod registry;
pub mod schema;
pub mod session;
pub mod sse;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_schemas;

pub use chat::{ContentPart, Message};
pub use config::ContextConfig;
pub use context::ChatContext;
pub use error::LoomError;
pub use factory::ContextFactory;
pub use registry::{SchemaRegistry, load_schema_file};
pub use schema::{JsonPath, ParamConstraint, ParamKind, PathSegment, ProviderSchema};
pub use session::ChatSession;
pub use sse::{MALFORMED_FRAME_LIMIT, SseEvent, SseParser};
pub use transport::{
    BoxFuture, ByteStream, CancelHandle, Cancellation, HttpRequest, HttpResponse, HttpTransport,
};
