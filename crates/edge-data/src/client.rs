//! Origin fetch client.

use async_trait::async_trait;
use edge_core::{RequestDescriptor, ResponseEntry};

use crate::timeout::TimeoutConfig;

/// Error type for fetch operations.
///
/// Only transport-level failures are errors. A non-2xx status is a
/// successful exchange and comes back as a `ResponseEntry`.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Body error: {0}")]
    Body(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Network unavailable: {0}")]
    Offline(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Request/response exchange with the origin server.
///
/// Implementations must not alter the outbound request; the cache manager
/// only observes the response.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request against the network.
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseEntry, FetchError>;
}

/// Fetcher backed by a shared `reqwest::Client`.
///
/// Sends the descriptor's method and URL and nothing else. A
/// `RequestDescriptor` has no headers or body, so a hosting layer that
/// passes body-carrying requests through must supply its own `Fetcher`
/// holding the original request.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with default transport timeouts.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeouts(TimeoutConfig::default())
    }

    /// Create a fetcher with explicit transport timeouts.
    pub fn with_timeouts(timeouts: TimeoutConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.total)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseEntry, FetchError> {
        tracing::debug!(method = %request.method(), url = %request.url(), "fetching from origin");

        let resp = self
            .client
            .request(request.method().clone(), request.url().as_str())
            .send()
            .await?;

        let status = resp.status();
        let headers = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = resp.bytes().await?.to_vec();

        Ok(ResponseEntry {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn direct_fetcher() -> HttpFetcher {
        HttpFetcher::from_client(reqwest::Client::builder().no_proxy().build().unwrap())
    }

    /// Serve one canned response and hand back the raw request head.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&head).into_owned()
        });
        (format!("http://{}", addr), handle)
    }

    #[tokio::test]
    async fn test_forwards_method_and_url_and_returns_status_unchanged() {
        let (base, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 4\r\nConnection: close\r\n\r\ngone",
        )
        .await;
        let request =
            RequestDescriptor::new(reqwest::Method::DELETE, &format!("{}/api/items/7?force=1", base))
                .unwrap();

        let response = direct_fetcher().fetch(&request).await.unwrap();
        let head = server.await.unwrap();

        assert!(head.starts_with("DELETE /api/items/7?force=1 HTTP/1.1\r\n"));
        assert_eq!(response.status, 404);
        assert_eq!(response.status_text, "Not Found");
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.body_text(), "gone");
    }

    #[tokio::test]
    async fn test_unreachable_origin_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = RequestDescriptor::get(&format!("http://{}/", addr)).unwrap();
        let err = direct_fetcher().fetch(&request).await.unwrap_err();
        assert!(matches!(err, FetchError::Connection(_) | FetchError::Request(_)));
    }
}
