pub mod error;
pub mod http;
pub mod mock;
pub mod types;

pub use error::BackendError;
pub use http::{BackendClient, HttpConfig};
pub use types::{BaseUrl, ChatRequest, StatusReport};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::Stream;
use std::pin::Pin;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BackendError>> + Send>>;

#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn status(&self) -> Result<StatusReport, BackendError>;
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends `query` and returns the raw event-stream body once the response
    /// headers report success.
    async fn open_chat(&self, query: &str) -> Result<ByteStream, BackendError>;
}
