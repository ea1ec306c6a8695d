//! The reqwest-backed [`HttpTransport`] implementation.

use std::time::{Duration, Instant};

use futures::StreamExt;
use llm_loom::{BoxFuture, ByteStream, Cancellation, HttpRequest, HttpResponse, HttpTransport, LoomError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, instrument};

use crate::config::TransportConfig;

/// How often the cancellation predicate is polled while I/O is pending.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// HTTP sink backed by a pooled [`reqwest::Client`].
///
/// TLS verification and redirect following are on (reqwest defaults);
/// HTTP/2 is negotiated via ALPN where the server offers it. The
/// cancellation predicate is polled every 10 ms while a request or
/// stream read is in flight; on cancellation the in-flight I/O is
/// dropped and [`LoomError::Cancelled`] is returned.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl ReqwestTransport {
    /// Builds a transport from `config`. An explicit `config.client` is
    /// reused for connection pooling; otherwise a new client is built.
    pub fn new(config: TransportConfig) -> Self {
        let client = config.client.clone().unwrap_or_else(|| {
            let mut builder = reqwest::Client::builder()
                .timeout(config.timeout)
                .user_agent(config.user_agent.clone());
            if let Some(connect) = config.connect_timeout {
                builder = builder.connect_timeout(connect);
            }
            builder.build().expect("failed to build HTTP client")
        });
        Self {
            client,
            timeout: config.timeout,
        }
    }

    fn header_map(headers: &std::collections::HashMap<String, String>) -> Result<HeaderMap, LoomError> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                LoomError::Validation(format!("invalid header name: {name}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                LoomError::Validation(format!("header '{name}' holds invalid characters"))
            })?;
            map.insert(name, value);
        }
        Ok(map)
    }

    fn map_send_error(&self, error: reqwest::Error, started: Instant) -> LoomError {
        if error.is_timeout() {
            return LoomError::Timeout {
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            };
        }
        LoomError::Http {
            status: error
                .status()
                .map(|s| http::StatusCode::from_u16(s.as_u16())
                    .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)),
            message: error.to_string(),
            retryable: error.is_connect(),
        }
    }

    async fn send(
        &self,
        request: HttpRequest,
        cancel: &Cancellation,
    ) -> Result<reqwest::Response, LoomError> {
        let headers = Self::header_map(&request.headers)?;
        let started = Instant::now();

        let pending = self
            .client
            .post(&request.url)
            .headers(headers)
            .timeout(self.timeout)
            .json(&request.body)
            .send();

        tokio::select! {
            biased;
            () = wait_cancelled(cancel) => Err(LoomError::Cancelled),
            result = pending => result.map_err(|e| self.map_send_error(e, started)),
        }
    }
}

/// Resolves once the predicate fires. Pending forever for
/// [`Cancellation::none`]-style predicates that never do.
async fn wait_cancelled(cancel: &Cancellation) {
    loop {
        if cancel.is_cancelled() {
            return;
        }
        tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
    }
}

impl HttpTransport for ReqwestTransport {
    #[instrument(skip_all, fields(url = %request.url))]
    fn post<'a>(
        &'a self,
        request: HttpRequest,
        cancel: Cancellation,
    ) -> BoxFuture<'a, Result<HttpResponse, LoomError>> {
        Box::pin(async move {
            let started = Instant::now();
            let response = self.send(request, &cancel).await?;
            let status = http::StatusCode::from_u16(response.status().as_u16())
                .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);

            let body = tokio::select! {
                biased;
                () = wait_cancelled(&cancel) => return Err(LoomError::Cancelled),
                body = response.text() => body.map_err(|e| self.map_send_error(e, started))?,
            };

            debug!(status = %status, bytes = body.len(), "response received");
            Ok(HttpResponse { status, body })
        })
    }

    #[instrument(skip_all, fields(url = %request.url))]
    fn post_stream<'a>(
        &'a self,
        request: HttpRequest,
        cancel: Cancellation,
    ) -> BoxFuture<'a, Result<ByteStream, LoomError>> {
        Box::pin(async move {
            let started = Instant::now();
            let response = self.send(request, &cancel).await?;
            let status = http::StatusCode::from_u16(response.status().as_u16())
                .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);

            // Surface error statuses before streaming begins, body
            // already read, so callers never sniff chunks for error
            // JSON.
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LoomError::Http {
                    status: Some(status),
                    message: body,
                    retryable: status.as_u16() == 429 || status.is_server_error(),
                });
            }

            let inner = response.bytes_stream().boxed();
            let stream = futures::stream::unfold(
                (inner, cancel, started, false),
                |(mut inner, cancel, started, finished)| async move {
                    if finished {
                        return None;
                    }
                    tokio::select! {
                        biased;
                        () = wait_cancelled(&cancel) => {
                            // Terminate after the cancellation error.
                            Some((Err(LoomError::Cancelled), (inner, cancel, started, true)))
                        }
                        chunk = inner.next() => match chunk {
                            Some(Ok(bytes)) => Some((Ok(bytes), (inner, cancel, started, false))),
                            Some(Err(e)) => {
                                let error = if e.is_timeout() {
                                    LoomError::Timeout {
                                        elapsed_ms: u64::try_from(started.elapsed().as_millis())
                                            .unwrap_or(u64::MAX),
                                    }
                                } else {
                                    LoomError::Http {
                                        status: None,
                                        message: format!("stream read error: {e}"),
                                        retryable: true,
                                    }
                                };
                                Some((Err(error), (inner, cancel, started, true)))
                            }
                            None => None,
                        },
                    }
                },
            );
            Ok(Box::pin(stream) as ByteStream)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_header_map_conversion() {
        let headers = HashMap::from([
            ("Content-Type".to_string(), "application/json".to_string()),
            ("x-api-key".to_string(), "sk-test".to_string()),
        ]);
        let map = ReqwestTransport::header_map(&headers).unwrap();
        assert_eq!(map.get("content-type").unwrap(), "application/json");
        assert_eq!(map.get("x-api-key").unwrap(), "sk-test");
    }

    #[test]
    fn test_header_map_rejects_invalid_value() {
        let headers = HashMap::from([("Authorization".to_string(), "bad\nvalue".to_string())]);
        let err = ReqwestTransport::header_map(&headers).unwrap_err();
        assert!(matches!(err, LoomError::Validation(_)));
    }

    #[test]
    fn test_header_map_rejects_invalid_name() {
        let headers = HashMap::from([("bad header".to_string(), "x".to_string())]);
        assert!(ReqwestTransport::header_map(&headers).is_err());
    }

    #[test]
    fn test_default_transport_builds() {
        let transport = ReqwestTransport::default();
        assert_eq!(transport.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_custom_client_reused() {
        let client = reqwest::Client::new();
        let transport = ReqwestTransport::new(TransportConfig {
            client: Some(client),
            timeout: Duration::from_secs(5),
            ..Default::default()
        });
        assert_eq!(transport.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_wait_cancelled_fires() {
        let (cancel, handle) = Cancellation::flag();
        handle.cancel();
        // Completes promptly once the flag is set.
        tokio::time::timeout(Duration::from_secs(1), wait_cancelled(&cancel))
            .await
            .expect("wait_cancelled should return after cancel");
    }
}
