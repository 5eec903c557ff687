pub mod decoder;

pub use decoder::{EventFrameDecoder, Frame};

use futures::StreamExt;

use crate::backend::{BackendError, ChatBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Sentinel,
    /// The body ended without a `[DONE]` block.
    Exhausted,
}

#[derive(Debug)]
pub enum StreamEvent {
    Delta(String),
    Finished(EndReason),
    Failed(BackendError),
}

/// Runs one chat request to completion, reporting every delta and exactly one
/// terminal event to `on_event`. A fresh decoder is used per call.
pub async fn drive<B, F>(backend: &B, query: &str, mut on_event: F)
where
    B: ChatBackend + ?Sized,
    F: FnMut(StreamEvent),
{
    let mut body = match backend.open_chat(query).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(error = %err, "Chat request failed");
            on_event(StreamEvent::Failed(err));
            return;
        }
    };

    tracing::debug!("Chat stream opened");
    let mut decoder = EventFrameDecoder::new();
    let mut deltas = 0usize;

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::warn!(error = %err, deltas, "Chat stream broke off");
                on_event(StreamEvent::Failed(err));
                return;
            }
        };

        for frame in decoder.push(&chunk) {
            match frame {
                Frame::Delta(text) => {
                    deltas += 1;
                    on_event(StreamEvent::Delta(text));
                }
                Frame::Done => {
                    tracing::debug!(deltas, "Chat stream completed");
                    on_event(StreamEvent::Finished(EndReason::Sentinel));
                    return;
                }
            }
        }
    }

    decoder.finish();
    tracing::debug!(deltas, "Chat stream ended without sentinel");
    on_event(StreamEvent::Finished(EndReason::Exhausted));
}
