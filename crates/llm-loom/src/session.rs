//! The chat facade: a context wired to a transport.
//!
//! [`ChatSession`] owns a [`ChatContext`] and an `Arc<dyn HttpTransport>`
//! and orchestrates one send at a time: append the user turn, build the
//! request and headers, post, classify the response, extract the
//! assistant text, and append it on success. Failed sends leave the
//! conversation exactly as it was before the call, except for the user
//! turn the call itself added.
//!
//! Three modes:
//!
//! - [`send`](ChatSession::send) / [`send_with`](ChatSession::send_with)
//!   — async; awaiting the returned future *is* the deferred-send mode,
//!   and `tokio::spawn` turns it into a detached one.
//! - [`send_blocking`](ChatSession::send_blocking) — convenience for
//!   synchronous callers; drives a current-thread runtime internally.
//! - [`send_stream`](ChatSession::send_stream) — SSE streaming with a
//!   per-delta callback.
//!
//! Cancellation is cooperative: pass a [`Cancellation`] and trip it
//! from anywhere; the transport aborts with [`LoomError::Cancelled`]
//! and no assistant turn is recorded.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::context::ChatContext;
use crate::error::LoomError;
use crate::sse::{SseEvent, SseParser};
use crate::transport::{Cancellation, HttpRequest, HttpResponse, HttpTransport};

/// Orchestrates a conversation over an HTTP transport.
pub struct ChatSession {
    context: ChatContext,
    transport: Arc<dyn HttpTransport>,
}

impl ChatSession {
    /// Wraps a context and a transport.
    pub fn new(context: ChatContext, transport: Arc<dyn HttpTransport>) -> Self {
        Self { context, transport }
    }

    /// The underlying context.
    pub fn context(&self) -> &ChatContext {
        &self.context
    }

    /// Mutable access to the underlying context, for model/parameter
    /// changes between sends.
    pub fn context_mut(&mut self) -> &mut ChatContext {
        &mut self.context
    }

    /// Unwraps the session, returning the context.
    pub fn into_context(self) -> ChatContext {
        self.context
    }

    /// Sends `text` as a user turn and returns the assistant's reply.
    pub async fn send(&mut self, text: &str) -> Result<String, LoomError> {
        self.send_with(text, &Cancellation::none()).await
    }

    /// [`send`](Self::send) with a cancellation predicate.
    #[instrument(skip_all, fields(provider = %self.context.provider_name()))]
    pub async fn send_with(
        &mut self,
        text: &str,
        cancel: &Cancellation,
    ) -> Result<String, LoomError> {
        self.context.add_user_message(text)?;
        self.dispatch(cancel.clone()).await
    }

    /// Clears the conversation, then sends `text` as a fresh
    /// single-turn ask.
    pub async fn send_single_turn(
        &mut self,
        text: &str,
        cancel: &Cancellation,
    ) -> Result<String, LoomError> {
        self.context.clear_messages();
        self.send_with(text, cancel).await
    }

    /// Sends a user turn carrying an inline image alongside `text`.
    ///
    /// `media_data` may be base64 already, or a filesystem path.
    #[instrument(skip_all, fields(provider = %self.context.provider_name(), media_type))]
    pub async fn send_with_media(
        &mut self,
        text: &str,
        media_type: &str,
        media_data: &str,
        cancel: &Cancellation,
    ) -> Result<String, LoomError> {
        self.context
            .add_user_message_with_media(text, media_type, media_data)?;
        self.dispatch(cancel.clone()).await
    }

    /// Synchronous wrapper around [`send`](Self::send), for callers
    /// without a runtime of their own.
    ///
    /// # Errors
    ///
    /// [`LoomError::Validation`] when called from inside an async
    /// context — `await` the async methods there instead.
    pub fn send_blocking(&mut self, text: &str) -> Result<String, LoomError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(LoomError::Validation(
                "send_blocking called from within an async runtime; use send().await".into(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LoomError::Validation(format!("failed to start runtime: {e}")))?;
        runtime.block_on(self.send(text))
    }

    /// Streams the assistant's reply, invoking `on_chunk` per text
    /// delta. Returning `false` from the callback stops the stream
    /// early. Returns the accumulated final text, which is also
    /// appended as the assistant turn — unless the stream fails or is
    /// cancelled, in which case nothing is appended.
    #[instrument(skip_all, fields(provider = %self.context.provider_name()))]
    pub async fn send_stream(
        &mut self,
        text: &str,
        mut on_chunk: impl FnMut(&str) -> bool,
        cancel: &Cancellation,
    ) -> Result<String, LoomError> {
        if !self.context.supports_streaming() {
            return Err(LoomError::Validation(format!(
                "provider '{}' does not support streaming",
                self.context.provider_name()
            )));
        }
        if !self.context.config().enable_streaming_support {
            return Err(LoomError::Validation(
                "streaming support is disabled for this context".into(),
            ));
        }

        self.context.add_user_message(text)?;
        let request = self.build_http_request(true)?;

        // Transports report an error status with the body already read;
        // prefer the provider's extracted message over the raw body.
        let mut stream = match self.transport.post_stream(request, cancel.clone()).await {
            Ok(stream) => stream,
            Err(LoomError::Http {
                status,
                message,
                retryable,
            }) => {
                let refined = serde_json::from_str::<Value>(&message)
                    .ok()
                    .and_then(|v| self.context.extract_error(&v))
                    .unwrap_or(message);
                return Err(LoomError::Http {
                    status,
                    message: refined,
                    retryable,
                });
            }
            Err(e) => return Err(e),
        };
        let mut parser = SseParser::new();
        let mut accumulated = String::new();

        'receive: while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in parser.push(&chunk)? {
                match event {
                    SseEvent::Frame(frame) => {
                        if let Some(delta) = self.context.extract_stream_delta(&frame)? {
                            if delta.is_empty() {
                                continue;
                            }
                            accumulated.push_str(&delta);
                            if !on_chunk(&delta) {
                                debug!("stream stopped by on_chunk callback");
                                break 'receive;
                            }
                        }
                    }
                    SseEvent::Done => break 'receive,
                }
            }
        }

        self.context.add_assistant_message(&accumulated)?;
        Ok(accumulated)
    }

    async fn dispatch(&mut self, cancel: Cancellation) -> Result<String, LoomError> {
        let request = self.build_http_request(false)?;
        debug!(url = %request.url, "dispatching chat request");

        let response = self.transport.post(request, cancel).await?;
        let text = self.parse_reply(&response)?;

        self.context.add_assistant_message(&text)?;
        Ok(text)
    }

    fn build_http_request(&self, streaming: bool) -> Result<HttpRequest, LoomError> {
        let body = self.context.build_request(streaming)?;
        let headers = self.context.build_headers()?;
        Ok(HttpRequest {
            url: self.context.endpoint().to_string(),
            headers,
            body,
        })
    }

    /// Classifies a completed response: non-2xx becomes an HTTP error
    /// carrying the provider's extracted message (preferred over the
    /// raw body); 2xx bodies are JSON-parsed and walked for the
    /// assistant text.
    fn parse_reply(&self, response: &HttpResponse) -> Result<String, LoomError> {
        if !response.is_success() {
            let parsed: Option<Value> = serde_json::from_str(&response.body).ok();
            let extracted = parsed.as_ref().and_then(|v| self.context.extract_error(v));
            let message = match extracted {
                Some(message) => message,
                None => {
                    warn!(status = %response.status, "error response without extractable message");
                    response.body.clone()
                }
            };
            let status = response.status;
            return Err(LoomError::Http {
                status: Some(status),
                message,
                retryable: status.as_u16() == 429 || status.is_server_error(),
            });
        }

        let json: Value =
            serde_json::from_str(&response.body).map_err(|e| LoomError::ResponseFormat {
                message: format!("response body is not valid JSON: {e}"),
                raw: response.body.clone(),
            })?;
        self.context.extract_text_response(&json)
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("context", &self.context)
            .finish()
    }
}
