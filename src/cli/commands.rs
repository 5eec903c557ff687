use std::io::Write;
use std::sync::Arc;

use tokio::sync::watch;

use super::args::Cli;
use crate::backend::{BackendClient, ChatBackend, StatusProbe};
use crate::config::AppConfig;
use crate::core::{AppError, ChatSession, ReadinessMonitor, Result};
use crate::stream::{self, StreamEvent};

/// Applies command-line overrides on top of the loaded configuration.
#[must_use]
pub fn resolve_config(cli: &Cli, mut config: AppConfig) -> AppConfig {
    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(interval) = cli.poll_interval_ms {
        config.poll_interval_ms = interval;
    }
    config
}

pub fn build_client(config: &AppConfig) -> Result<Arc<BackendClient>> {
    let client = BackendClient::with_config(config.base_url.clone(), config.http_config())?;
    Ok(Arc::new(client))
}

/// Polls readiness once, then streams the answer to `query` into `out` as the
/// deltas arrive.
pub async fn ask<B, W>(backend: Arc<B>, query: &str, out: &mut W) -> Result<()>
where
    B: StatusProbe + ChatBackend + 'static,
    W: Write,
{
    if query.trim().is_empty() {
        return Err(AppError::EmptyQuery);
    }

    let readiness = ReadinessMonitor::new(backend.clone()).poll().await;
    if !readiness.is_ready() {
        return Err(AppError::NotReady(readiness.status.to_string()));
    }

    let (_readiness_tx, readiness_rx) = watch::channel(readiness);
    let mut session = ChatSession::new(backend.clone(), readiness_rx);
    let Some(query) = session.begin(query) else {
        return Err(AppError::EmptyQuery);
    };

    let mut write_error = None;
    let mut failure = None;

    stream::drive(backend.as_ref(), &query, |event| {
        match &event {
            StreamEvent::Delta(text) => {
                if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
                    write_error.get_or_insert(e);
                }
            }
            StreamEvent::Failed(err) => failure = Some(err.to_string()),
            StreamEvent::Finished(_) => {}
        }
        session.apply(event);
    })
    .await;

    writeln!(out)?;

    if let Some(e) = write_error {
        return Err(e.into());
    }
    if let Some(message) = failure {
        return Err(AppError::Stream(message));
    }
    Ok(())
}

pub async fn print_status<W: Write>(client: &BackendClient, out: &mut W) -> Result<()> {
    let report = client.status().await?;
    let health = match client.health().await {
        Ok(true) => "ok",
        Ok(false) => "failing",
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            "unreachable"
        }
    };
    writeln!(out, "{}", client.base_url())?;
    writeln!(out, "{report}")?;
    writeln!(out, "health: {health}")?;
    Ok(())
}

pub async fn print_reindex<W: Write>(client: &BackendClient, out: &mut W) -> Result<()> {
    let report = client.reindex().await?;
    writeln!(out, "Reindex finished.")?;
    writeln!(out, "{report}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{MockBackend, MockChat, MockStatus};
    use crate::core::readiness::INITIALIZING_MESSAGE;
    use clap::Parser;

    #[test]
    fn test_resolve_config_overrides() {
        let cli = Cli::parse_from([
            "ragchat",
            "--base-url",
            "http://other:1",
            "--poll-interval-ms",
            "100",
        ]);
        let config = resolve_config(&cli, AppConfig::default());
        assert_eq!(config.base_url, "http://other:1");
        assert_eq!(config.poll_interval_ms, 100);
    }

    #[test]
    fn test_resolve_config_keeps_loaded_values() {
        let cli = Cli::parse_from(["ragchat"]);
        let loaded = AppConfig {
            base_url: "http://from-file:8000".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(resolve_config(&cli, loaded.clone()), loaded);
    }

    #[test]
    fn test_build_client_rejects_bad_url() {
        let config = AppConfig {
            base_url: "localhost:8000".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(build_client(&config), Err(AppError::Backend(_))));
    }

    #[tokio::test]
    async fn test_print_status_includes_health() {
        let mut server = mockito::Server::new_async().await;
        let _status = server
            .mock("GET", "/status")
            .with_status(200)
            .with_body(r#"{"ready": true, "has_index": true}"#)
            .create_async()
            .await;
        let _health = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status": "ok"}"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url()).expect("client");
        let mut out = Vec::new();
        print_status(&client, &mut out).await.expect("status");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("ready: true"));
        assert!(text.ends_with("health: ok\n"));
    }

    #[tokio::test]
    async fn test_print_status_reports_failing_health() {
        let mut server = mockito::Server::new_async().await;
        let _status = server
            .mock("GET", "/status")
            .with_status(200)
            .with_body(r#"{"ready": false}"#)
            .create_async()
            .await;
        let _health = server
            .mock("GET", "/health")
            .with_status(503)
            .create_async()
            .await;

        let client = BackendClient::new(server.url()).expect("client");
        let mut out = Vec::new();
        print_status(&client, &mut out).await.expect("status");

        assert!(String::from_utf8(out).expect("utf8").contains("health: failing"));
    }

    #[tokio::test]
    async fn test_ask_streams_to_writer() {
        let backend = Arc::new(
            MockBackend::new()
                .with_status(MockStatus::ready())
                .with_chat(MockChat::deltas(&["Hello", "world"])),
        );
        let mut out = Vec::new();

        ask(backend.clone(), "hi", &mut out).await.expect("ask");

        assert_eq!(String::from_utf8(out).expect("utf8"), "Helloworld\n");
        assert_eq!(backend.queries(), vec!["hi".to_string()]);
    }

    #[tokio::test]
    async fn test_ask_not_ready() {
        let backend = Arc::new(MockBackend::new().with_status(MockStatus::initializing()));
        let mut out = Vec::new();

        let err = ask(backend.clone(), "hi", &mut out).await.expect_err("not ready");

        assert!(matches!(err, AppError::NotReady(ref msg) if msg == INITIALIZING_MESSAGE));
        assert!(backend.queries().is_empty());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_ask_empty_query() {
        let backend = Arc::new(MockBackend::new());
        let mut out = Vec::new();
        let err = ask(backend.clone(), "   ", &mut out).await.expect_err("empty");
        assert!(matches!(err, AppError::EmptyQuery));
        assert_eq!(backend.status_calls(), 0);
    }

    #[tokio::test]
    async fn test_ask_stream_failure() {
        let backend = Arc::new(
            MockBackend::new()
                .with_status(MockStatus::ready())
                .with_chat(MockChat::BrokenAfter(vec![b"data: half\n\n".to_vec()])),
        );
        let mut out = Vec::new();

        let err = ask(backend, "hi", &mut out).await.expect_err("broken");

        assert!(matches!(err, AppError::Stream(_)));
        assert_eq!(String::from_utf8(out).expect("utf8"), "half\n");
    }
}
