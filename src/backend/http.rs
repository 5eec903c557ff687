use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::error::BackendError;
use super::types::{BaseUrl, ChatRequest, StatusReport};
use super::{ByteStream, ChatBackend, StatusProbe};

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    /// Total budget for a status probe. The chat stream has no total timeout.
    pub status_timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            status_timeout: Duration::from_secs(5),
            user_agent: Some(format!("ragchat/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }
}

/// HTTP client for the chat backend's `/status`, `/chat` and `/reindex`
/// endpoints.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: BaseUrl,
    config: HttpConfig,
}

impl BackendClient {
    pub fn new(base_url: impl Into<BaseUrl>) -> Result<Self, BackendError> {
        Self::with_config(base_url, HttpConfig::default())
    }

    pub fn with_config(
        base_url: impl Into<BaseUrl>,
        config: HttpConfig,
    ) -> Result<Self, BackendError> {
        let base_url = base_url.into();
        if !base_url.as_str().starts_with("http://") && !base_url.as_str().starts_with("https://")
        {
            return Err(BackendError::Configuration(format!(
                "Base URL must start with http:// or https://, got '{base_url}'"
            )));
        }

        let mut builder = Client::builder().connect_timeout(config.connect_timeout);

        if let Some(ref ua) = config.user_agent {
            builder = builder.user_agent(ua);
        }

        let http = builder.build().map_err(|e| {
            BackendError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Asks the backend to rebuild its document index and returns the
    /// status reported afterwards.
    pub async fn reindex(&self) -> Result<StatusReport, BackendError> {
        let url = self.base_url.join("/reindex");
        tracing::info!(%url, "Requesting reindex");

        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    pub async fn health(&self) -> Result<bool, BackendError> {
        let response = self
            .http
            .get(self.base_url.join("/health"))
            .timeout(self.config.status_timeout)
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl StatusProbe for BackendClient {
    async fn status(&self) -> Result<StatusReport, BackendError> {
        let response = self
            .http
            .get(self.base_url.join("/status"))
            .timeout(self.config.status_timeout)
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Connection(e.to_string())
            } else {
                BackendError::Decode(e.to_string())
            }
        })
    }
}

#[async_trait]
impl ChatBackend for BackendClient {
    async fn open_chat(&self, query: &str) -> Result<ByteStream, BackendError> {
        let response = self
            .http
            .post(self.base_url.join("/chat"))
            .header("accept", "text/event-stream")
            .json(&ChatRequest { query })
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
            });
        }
        if matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT) {
            return Err(BackendError::Stream(format!(
                "Response has no body (HTTP {})",
                status.as_u16()
            )));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| BackendError::Stream(e.to_string())));

        Ok(Box::pin(body))
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        ChatSession, Message, Readiness, STREAM_ERROR_MARKER, UnreachableCause,
    };
    use std::sync::Arc;
    use tokio::sync::watch;

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.status_timeout, Duration::from_secs(5));
        assert!(config.user_agent.as_deref().is_some_and(|ua| ua.starts_with("ragchat/")));
    }

    #[test]
    fn test_http_config_builder() {
        let config = HttpConfig::new()
            .with_connect_timeout(Duration::from_secs(2))
            .with_status_timeout(Duration::from_millis(500));

        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.status_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_client_rejects_non_http_url() {
        let result = BackendClient::new("ftp://example.com");
        assert!(matches!(result, Err(BackendError::Configuration(_))));
    }

    #[test]
    fn test_client_debug() {
        let client = BackendClient::new("http://localhost:8000/").expect("client");
        let debug = format!("{client:?}");
        assert!(debug.contains("BackendClient"));
        assert!(debug.contains("http://localhost:8000"));
    }

    #[tokio::test]
    async fn test_status_ready() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/status")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ready": true, "indexing": false, "has_index": true, "last_doc": "a.pdf"}"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url()).expect("client");
        let report = client.status().await.expect("status");

        mock.assert_async().await;
        assert!(report.ready);
        assert_eq!(report.last_doc.as_deref(), Some("a.pdf"));
    }

    #[tokio::test]
    async fn test_status_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/status")
            .with_status(500)
            .create_async()
            .await;

        let client = BackendClient::new(server.url()).expect("client");
        let err = client.status().await.expect_err("should fail");
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_status_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/status")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = BackendClient::new(server.url()).expect("client");
        let err = client.status().await.expect_err("should fail");
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[tokio::test]
    async fn test_status_connection_refused() {
        // Port 9 (discard) is not expected to be listening locally.
        let client = BackendClient::new("http://127.0.0.1:9").expect("client");
        let err = client.status().await.expect_err("should fail");
        assert!(matches!(err, BackendError::Connection(_)));
    }

    #[tokio::test]
    async fn test_open_chat_sends_query_and_streams_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_body(mockito::Matcher::Json(serde_json::json!({"query": "hello"})))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body("data: Hi\n\ndata: [DONE]\n\n")
            .create_async()
            .await;

        let client = BackendClient::new(server.url()).expect("client");
        let mut body = client.open_chat("hello").await.expect("open chat");

        let mut received = Vec::new();
        while let Some(chunk) = body.next().await {
            received.extend_from_slice(&chunk.expect("chunk"));
        }

        mock.assert_async().await;
        assert_eq!(received, b"data: Hi\n\ndata: [DONE]\n\n");
    }

    #[tokio::test]
    async fn test_open_chat_rejects_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat")
            .with_status(400)
            .with_body(r#"{"detail": "No indexed documents found."}"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url()).expect("client");
        let result = client.open_chat("hello").await;
        assert!(matches!(result, Err(BackendError::Status { status: 400 })));
    }

    #[tokio::test]
    async fn test_status_timeout_is_connection_failure() {
        // Accepts connections at the kernel level but never answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let url = format!("http://{}", listener.local_addr().expect("addr"));

        let config = HttpConfig::new().with_status_timeout(Duration::from_millis(100));
        let client = BackendClient::with_config(url, config).expect("client");

        let result = client.status().await;
        assert!(matches!(result, Err(BackendError::Connection(_))));
        assert_eq!(
            Readiness::from_probe(&result),
            Readiness::unreachable(UnreachableCause::BackendUnreachable)
        );
        drop(listener);
    }

    #[tokio::test]
    async fn test_open_chat_without_body_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat")
            .with_status(204)
            .create_async()
            .await;

        let client = BackendClient::new(server.url()).expect("client");
        let result = client.open_chat("hello").await;
        assert!(matches!(result, Err(BackendError::Stream(_))));
    }

    #[tokio::test]
    async fn test_session_marks_bodiless_reply_as_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat")
            .with_status(204)
            .create_async()
            .await;

        let client = BackendClient::new(server.url()).expect("client");
        let (_tx, rx) = watch::channel(Readiness::ready());
        let mut session = ChatSession::new(Arc::new(client), rx);

        session.submit("hello").await;

        assert_eq!(
            session.transcript().messages(),
            &[Message::user("hello"), Message::assistant(STREAM_ERROR_MARKER)]
        );
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn test_reindex_returns_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/reindex")
            .with_status(200)
            .with_body(r#"{"ready": true, "has_index": true}"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url()).expect("client");
        let report = client.reindex().await.expect("reindex");

        mock.assert_async().await;
        assert!(report.ready);
        assert!(report.has_index);
    }

    #[tokio::test]
    async fn test_health() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status": "ok"}"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url()).expect("client");
        assert!(client.health().await.expect("health"));
    }
}
