//! Unified error type for all engine and transport operations.
//!
//! Every layer maps its failures into [`LoomError`], giving callers a
//! single type to match against. Variants carry enough context for retry
//! decisions, user-facing messages, and diagnostics.
//!
//! # Retryability
//!
//! Transport-level variants include a `retryable` flag set from the
//! upstream condition (e.g. HTTP 429 or 503, connect failures). Callers
//! can inspect it to decide whether to resubmit:
//!
//! ```rust
//! use llm_loom::LoomError;
//!
//! fn should_retry(err: &LoomError) -> bool {
//!     err.is_retryable()
//! }
//! ```

/// The unified error type returned by all engine and transport operations.
///
/// Variants are `#[non_exhaustive]` — new error kinds may be added in
/// minor releases without breaking downstream matches (always include a
/// wildcard arm).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoomError {
    /// A schema document is missing, malformed, or failed structural
    /// validation. Raised by the registry and by context construction.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Conversation state or a request violates the active schema's
    /// constraints (parameter range, unknown role, missing fields).
    /// Raised synchronously by mutation and request synthesis.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An HTTP-level failure (transport error, unexpected status code).
    ///
    /// `status` is `None` when the request never received a response
    /// (e.g. DNS failure, connection reset). `message` carries the
    /// provider's extracted error string when one was present, the raw
    /// diagnostic otherwise.
    #[error("HTTP error (status={status:?}): {message}")]
    Http {
        /// The HTTP status code, if one was received.
        status: Option<http::StatusCode>,
        /// A human-readable description of the failure.
        message: String,
        /// Whether the caller should retry this request.
        retryable: bool,
    },

    /// The operation exceeded its deadline.
    #[error("Operation timed out after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds elapsed before the timeout fired.
        elapsed_ms: u64,
    },

    /// The caller's cancellation predicate fired mid-request.
    #[error("Request cancelled")]
    Cancelled,

    /// Transport succeeded but the response body does not match the
    /// schema's extraction paths, or is not valid JSON at all.
    #[error("Response format error: {message}")]
    ResponseFormat {
        /// What went wrong during extraction.
        message: String,
        /// The raw response body, for diagnostics.
        raw: String,
    },
}

impl LoomError {
    /// Returns `true` if the error is transient and the request may
    /// succeed on retry.
    ///
    /// Checks the `retryable` flag on HTTP errors and treats timeouts
    /// and cancellations as retryable. Schema, validation, and
    /// response-shape errors are deterministic and never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { retryable, .. } => *retryable,
            Self::Timeout { .. } | Self::Cancelled => true,
            _ => false,
        }
    }

    /// Shorthand for a `ResponseFormat` error without a captured body.
    pub(crate) fn response_format(message: impl Into<String>) -> Self {
        Self::ResponseFormat {
            message: message.into(),
            raw: String::new(),
        }
    }
}

impl From<serde_json::Error> for LoomError {
    fn from(err: serde_json::Error) -> Self {
        Self::ResponseFormat {
            message: err.to_string(),
            raw: String::new(),
        }
    }
}
