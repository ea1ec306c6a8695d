//! # llm-loom-reqwest
//!
//! [reqwest](https://docs.rs/reqwest)-backed HTTP transport for
//! [llm-loom](https://docs.rs/llm-loom). Implements the engine's
//! [`HttpTransport`](llm_loom::HttpTransport) sink: buffered posts,
//! SSE byte streams, cooperative cancellation, and per-request
//! timeouts over a pooled TLS client.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use llm_loom::{ContextFactory, SchemaRegistry};
//! use llm_loom_reqwest::ReqwestTransport;
//!
//! # async fn example() -> Result<(), llm_loom::LoomError> {
//! let registry = Arc::new(SchemaRegistry::new("./schemas"));
//! let factory = ContextFactory::new(registry);
//! let transport = Arc::new(ReqwestTransport::default());
//!
//! let mut session = factory.create_session("openai", transport)?;
//! session.context_mut().set_api_key(std::env::var("OA_API_KEY").unwrap());
//!
//! let reply = session.send("Ping").await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod transport;

pub use config::TransportConfig;
pub use transport::ReqwestTransport;
