//! Transport configuration.

use std::time::Duration;

/// Configuration for [`ReqwestTransport`](crate::ReqwestTransport).
///
/// Use struct update syntax with [`Default`]:
///
/// ```rust
/// use std::time::Duration;
/// use llm_loom_reqwest::TransportConfig;
///
/// let config = TransportConfig {
///     timeout: Duration::from_secs(120),
///     ..Default::default()
/// };
/// ```
#[derive(Clone)]
pub struct TransportConfig {
    /// Total per-request deadline, connect through last body byte.
    pub timeout: Duration,
    /// Deadline for establishing the connection. `None` uses reqwest's
    /// default.
    pub connect_timeout: Option<Duration>,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Pre-configured client for connection pooling across transports.
    /// When `None`, a new client is built from the fields above.
    pub client: Option<reqwest::Client>,
}

impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConfig")
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .field("client", &self.client.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Some(Duration::from_secs(10)),
            user_agent: concat!("llm-loom/", env!("CARGO_PKG_VERSION")).into(),
            client: None,
        }
    }
}
