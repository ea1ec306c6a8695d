//! The HTTP sink interface the engine expects.
//!
//! The core never performs network I/O itself. It builds URL + headers
//! + body and hands them to an [`HttpTransport`], which returns either
//! a completed [`HttpResponse`] or a raw [`ByteStream`] of chunks.
//! Transports honor a [`Cancellation`] predicate between I/O slices.
//!
//! The trait uses boxed futures so it is object-safe — sessions hold
//! `Arc<dyn HttpTransport>` and tests substitute a mock without
//! generics spreading through the call graph.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures::Stream;
use serde_json::Value;

use crate::error::LoomError;

/// A pinned, boxed, `Send` future — the return shape of every
/// [`HttpTransport`] method.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A pinned, boxed, `Send` stream of raw body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LoomError>> + Send>>;

/// An outgoing request: URL, headers, JSON body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Target URL.
    pub url: String,
    /// Header name → resolved value.
    pub headers: HashMap<String, String>,
    /// JSON request body.
    pub body: Value,
}

/// A completed response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: http::StatusCode,
    /// The response body, as text.
    pub body: String,
}

impl HttpResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// A cheap, cloneable, pollable cancellation predicate.
///
/// Transports poll this between I/O slices and abort with
/// [`LoomError::Cancelled`] once it returns `true`. The default
/// ([`Cancellation::none`]) never fires.
///
/// # Example
///
/// ```rust
/// use llm_loom::Cancellation;
///
/// let (cancel, handle) = Cancellation::flag();
/// assert!(!cancel.is_cancelled());
/// handle.cancel();
/// assert!(cancel.is_cancelled());
/// ```
#[derive(Clone)]
pub struct Cancellation(Inner);

#[derive(Clone)]
enum Inner {
    Never,
    Flag(Arc<AtomicBool>),
    Fn(Arc<dyn Fn() -> bool + Send + Sync>),
}

/// Trips the matching [`Cancellation`] when [`cancel`](Self::cancel)ed.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl Cancellation {
    /// A predicate that never fires.
    pub fn none() -> Self {
        Self(Inner::Never)
    }

    /// A flag-backed predicate and the handle that trips it.
    pub fn flag() -> (Self, CancelHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        (Self(Inner::Flag(Arc::clone(&flag))), CancelHandle(flag))
    }

    /// Wraps an arbitrary predicate.
    pub fn from_fn(f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self(Inner::Fn(Arc::new(f)))
    }

    /// Polls the predicate.
    pub fn is_cancelled(&self) -> bool {
        match &self.0 {
            Inner::Never => false,
            Inner::Flag(flag) => flag.load(Ordering::Relaxed),
            Inner::Fn(f) => f(),
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.0 {
            Inner::Never => "Never",
            Inner::Flag(_) => "Flag",
            Inner::Fn(_) => "Fn",
        };
        f.debug_tuple("Cancellation").field(&kind).finish()
    }
}

/// The pluggable HTTP sink.
///
/// Implementations own timeouts (default ≥ 60 s), TLS verification,
/// redirect following, and connection reuse. They must poll `cancel`
/// between I/O slices and abort with [`LoomError::Cancelled`] when it
/// fires; timeouts surface as [`LoomError::Timeout`].
pub trait HttpTransport: Send + Sync {
    /// POSTs the request and buffers the full response.
    ///
    /// Non-2xx statuses are returned as `Ok` responses — classifying
    /// them is the caller's concern (the facade extracts the provider's
    /// error body first).
    fn post<'a>(
        &'a self,
        request: HttpRequest,
        cancel: Cancellation,
    ) -> BoxFuture<'a, Result<HttpResponse, LoomError>>;

    /// POSTs the request and returns the raw response byte stream.
    ///
    /// An error status is reported as `Err` with the body already read,
    /// so stream callers never have to sniff chunks for error JSON.
    fn post_stream<'a>(
        &'a self,
        request: HttpRequest,
        cancel: Cancellation,
    ) -> BoxFuture<'a, Result<ByteStream, LoomError>>;
}
