//! Mock transport for testing.
//!
//! [`MockTransport`] is a queue-based fake that lets tests control
//! exactly what the HTTP sink returns, without touching the network.
//! It implements [`HttpTransport`], so it works anywhere a real
//! transport does.
//!
//! # Usage
//!
//! ```rust,no_run
//! use llm_loom::mock::MockTransport;
//!
//! let mock = MockTransport::new();
//! mock.queue_response(200, r#"{"choices":[{"message":{"content":"Pong"}}]}"#);
//! mock.queue_chunks(vec![
//!     "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n".into(),
//!     "data: [DONE]\n".into(),
//! ]);
//! // hand Arc::new(mock) to a ChatSession and assert on recorded_requests()
//! ```
//!
//! # Panics
//!
//! `post` / `post_stream` panic when their queue is empty — an empty
//! queue in a test is a bug in the test.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::error::LoomError;
use crate::transport::{BoxFuture, ByteStream, Cancellation, HttpRequest, HttpResponse, HttpTransport};

/// Cloneable error subset for queuing.
///
/// [`LoomError`] is not `Clone`, so it cannot sit in a queue directly.
/// This type mirrors the transport-relevant variants and converts at
/// dequeue time.
#[derive(Debug, Clone)]
pub enum MockError {
    /// Maps to [`LoomError::Http`].
    Http {
        /// HTTP status, if any.
        status: Option<http::StatusCode>,
        /// Error message.
        message: String,
        /// Whether the error is retryable.
        retryable: bool,
    },
    /// Maps to [`LoomError::Timeout`].
    Timeout {
        /// Elapsed milliseconds.
        elapsed_ms: u64,
    },
    /// Maps to [`LoomError::Cancelled`].
    Cancelled,
}

impl From<MockError> for LoomError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::Http {
                status,
                message,
                retryable,
            } => LoomError::Http {
                status,
                message,
                retryable,
            },
            MockError::Timeout { elapsed_ms } => LoomError::Timeout { elapsed_ms },
            MockError::Cancelled => LoomError::Cancelled,
        }
    }
}

type QueuedResponse = Result<HttpResponse, MockError>;
type QueuedStream = Result<Vec<String>, MockError>;

/// A queue-based mock HTTP sink.
///
/// Push buffered responses with [`queue_response`](Self::queue_response)
/// and chunk scripts with [`queue_chunks`](Self::queue_chunks). Every
/// call records its [`HttpRequest`] for later assertion via
/// [`recorded_requests`](Self::recorded_requests).
///
/// When the supplied [`Cancellation`] is already tripped at call time,
/// the mock returns [`LoomError::Cancelled`] without consuming a queue
/// entry — mirroring a transport that polls before connecting.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<QueuedResponse>>,
    streams: Mutex<VecDeque<QueuedStream>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    /// Creates a mock with empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a buffered response.
    pub fn queue_response(&self, status: u16, body: impl Into<String>) {
        self.responses
            .lock()
            .expect("mock transport lock poisoned")
            .push_back(Ok(HttpResponse {
                status: http::StatusCode::from_u16(status).expect("valid status code"),
                body: body.into(),
            }));
    }

    /// Queues a transport error for the next `post`.
    pub fn queue_error(&self, error: MockError) {
        self.responses
            .lock()
            .expect("mock transport lock poisoned")
            .push_back(Err(error));
    }

    /// Queues a chunk script for the next `post_stream`. Each string
    /// becomes one raw chunk, delivered in order.
    pub fn queue_chunks(&self, chunks: Vec<String>) {
        self.streams
            .lock()
            .expect("mock transport lock poisoned")
            .push_back(Ok(chunks));
    }

    /// Queues a transport error for the next `post_stream`.
    pub fn queue_stream_error(&self, error: MockError) {
        self.streams
            .lock()
            .expect("mock transport lock poisoned")
            .push_back(Err(error));
    }

    /// Every request seen so far, in call order.
    pub fn recorded_requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("mock transport lock poisoned")
            .clone()
    }
}

impl HttpTransport for MockTransport {
    fn post<'a>(
        &'a self,
        request: HttpRequest,
        cancel: Cancellation,
    ) -> BoxFuture<'a, Result<HttpResponse, LoomError>> {
        if cancel.is_cancelled() {
            return Box::pin(async { Err(LoomError::Cancelled) });
        }
        self.requests
            .lock()
            .expect("mock transport lock poisoned")
            .push(request);
        let next = self
            .responses
            .lock()
            .expect("mock transport lock poisoned")
            .pop_front()
            .expect("MockTransport response queue is empty");
        Box::pin(async move { next.map_err(LoomError::from) })
    }

    fn post_stream<'a>(
        &'a self,
        request: HttpRequest,
        cancel: Cancellation,
    ) -> BoxFuture<'a, Result<ByteStream, LoomError>> {
        if cancel.is_cancelled() {
            return Box::pin(async { Err(LoomError::Cancelled) });
        }
        self.requests
            .lock()
            .expect("mock transport lock poisoned")
            .push(request);
        let next = self
            .streams
            .lock()
            .expect("mock transport lock poisoned")
            .pop_front()
            .expect("MockTransport stream queue is empty");
        Box::pin(async move {
            let chunks = next.map_err(LoomError::from)?;
            let items: Vec<Result<Bytes, LoomError>> = chunks
                .into_iter()
                .map(|c| {
                    if cancel.is_cancelled() {
                        Err(LoomError::Cancelled)
                    } else {
                        Ok(Bytes::from(c))
                    }
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(items)) as ByteStream)
        })
    }
}
