use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use super::error::BackendError;
use super::types::StatusReport;
use super::{ByteStream, ChatBackend, StatusProbe};

#[derive(Debug, Clone)]
pub enum MockStatus {
    Report(StatusReport),
    HttpStatus(u16),
    Unreachable,
}

impl MockStatus {
    #[must_use]
    pub const fn ready() -> Self {
        Self::Report(StatusReport::ready())
    }

    #[must_use]
    pub const fn initializing() -> Self {
        Self::Report(StatusReport::initializing())
    }

    fn to_result(&self) -> Result<StatusReport, BackendError> {
        match self {
            Self::Report(report) => Ok(report.clone()),
            Self::HttpStatus(status) => Err(BackendError::Status { status: *status }),
            Self::Unreachable => Err(BackendError::Connection("connection refused".to_string())),
        }
    }
}

/// Scripted reply to one `open_chat` call.
#[derive(Debug, Clone)]
pub enum MockChat {
    Chunks(Vec<Vec<u8>>),
    /// Delivers the chunks, then fails the body.
    BrokenAfter(Vec<Vec<u8>>),
    HttpStatus(u16),
    Unreachable,
}

impl MockChat {
    #[must_use]
    pub fn chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self::Chunks(chunks.into_iter().map(|c| c.as_ref().to_vec()).collect())
    }

    /// One `data:` block per delta followed by the `[DONE]` sentinel.
    #[must_use]
    pub fn deltas(deltas: &[&str]) -> Self {
        let mut chunks: Vec<Vec<u8>> = deltas
            .iter()
            .map(|d| format!("data: {d}\n\n").into_bytes())
            .collect();
        chunks.push(b"data: [DONE]\n\n".to_vec());
        Self::Chunks(chunks)
    }
}

/// In-memory backend for tests. Status replies repeat the last scripted
/// value once the queue runs dry; chat replies are consumed in order.
#[derive(Clone)]
pub struct MockBackend {
    statuses: Arc<Mutex<VecDeque<MockStatus>>>,
    last_status: Arc<Mutex<MockStatus>>,
    chats: Arc<Mutex<VecDeque<MockChat>>>,
    queries: Arc<Mutex<Vec<String>>>,
    status_calls: Arc<Mutex<usize>>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            statuses: Arc::new(Mutex::new(VecDeque::new())),
            last_status: Arc::new(Mutex::new(MockStatus::ready())),
            chats: Arc::new(Mutex::new(VecDeque::new())),
            queries: Arc::new(Mutex::new(Vec::new())),
            status_calls: Arc::new(Mutex::new(0)),
        }
    }

    #[must_use]
    pub fn with_status(self, status: MockStatus) -> Self {
        self.statuses.lock().push_back(status);
        self
    }

    #[must_use]
    pub fn with_chat(self, chat: MockChat) -> Self {
        self.chats.lock().push_back(chat);
        self
    }

    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    #[must_use]
    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusProbe for MockBackend {
    async fn status(&self) -> Result<StatusReport, BackendError> {
        *self.status_calls.lock() += 1;

        let next = self.statuses.lock().pop_front();
        let mut last = self.last_status.lock();
        if let Some(status) = next {
            *last = status;
        }
        last.to_result()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn open_chat(&self, query: &str) -> Result<ByteStream, BackendError> {
        self.queries.lock().push(query.to_string());

        let script = self
            .chats
            .lock()
            .pop_front()
            .ok_or_else(|| BackendError::Connection("MockBackend: no chat queued".to_string()))?;

        match script {
            MockChat::Chunks(chunks) => Ok(Box::pin(stream::iter(
                chunks.into_iter().map(|c| Ok(Bytes::from(c))),
            ))),
            MockChat::BrokenAfter(chunks) => {
                let items: Vec<Result<Bytes, BackendError>> = chunks
                    .into_iter()
                    .map(|c| Ok(Bytes::from(c)))
                    .chain(std::iter::once(Err(BackendError::Stream(
                        "connection reset".to_string(),
                    ))))
                    .collect();
                Ok(Box::pin(stream::iter(items)))
            }
            MockChat::HttpStatus(status) => Err(BackendError::Status { status }),
            MockChat::Unreachable => Err(BackendError::Connection("connection refused".to_string())),
        }
    }
}
