use std::sync::Arc;

use tokio::sync::watch;

use super::readiness::Readiness;
use super::transcript::Transcript;
use crate::backend::ChatBackend;
use crate::stream::{self, StreamEvent};

pub const STREAM_ERROR_MARKER: &str = "[Error] Failed to stream response.";

/// One chat conversation against a backend, gated on the backend's readiness.
///
/// At most one answer streams at a time. The session is the only writer of
/// its transcript; stream results reach it through [`ChatSession::apply`],
/// either directly from [`ChatSession::submit`] or from a host that runs
/// [`stream::drive`] on its own task.
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    readiness: watch::Receiver<Readiness>,
    transcript: Transcript,
    input: String,
    streaming: bool,
}

impl ChatSession {
    #[must_use]
    pub fn new(backend: Arc<dyn ChatBackend>, readiness: watch::Receiver<Readiness>) -> Self {
        Self {
            backend,
            readiness,
            transcript: Transcript::new(),
            input: String::new(),
            streaming: false,
        }
    }

    #[must_use]
    pub fn backend(&self) -> Arc<dyn ChatBackend> {
        Arc::clone(&self.backend)
    }

    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.streaming
    }

    #[must_use]
    pub fn readiness(&self) -> Readiness {
        self.readiness.borrow().clone()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.readiness.borrow().is_ready()
    }

    /// Whether a submission would currently be accepted, ignoring the input.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.streaming && self.is_ready()
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    /// Applies the submission gate. On acceptance the user message and an
    /// empty assistant placeholder are appended, the input is cleared and the
    /// session enters the streaming state. Returns the trimmed query.
    pub fn begin(&mut self, query: &str) -> Option<String> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        if self.streaming {
            tracing::debug!("Ignoring submission while a response is streaming");
            return None;
        }
        if !self.is_ready() {
            tracing::debug!("Ignoring submission while backend is not ready");
            return None;
        }

        self.transcript.push_user(query);
        self.transcript.push_assistant_placeholder();
        self.input.clear();
        self.streaming = true;

        Some(query.to_string())
    }

    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Delta(text) => self.transcript.append_delta(&text),
            StreamEvent::Finished(reason) => {
                tracing::debug!(?reason, "Response finished");
                self.streaming = false;
            }
            StreamEvent::Failed(err) => {
                tracing::warn!(error = %err, "Failed to stream response");
                self.streaming = false;
                self.transcript.append_delta(STREAM_ERROR_MARKER);
            }
        }
    }

    /// Submits `query` and streams the answer into the transcript. Rejected
    /// submissions are silent no-ops.
    pub async fn submit(&mut self, query: &str) {
        let Some(query) = self.begin(query) else {
            return;
        };

        let backend = self.backend();
        stream::drive(backend.as_ref(), &query, |event| self.apply(event)).await;
    }

    /// Submits the current input buffer. A rejected input stays in place.
    pub async fn submit_input(&mut self) {
        let input = self.input.clone();
        self.submit(&input).await;
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("messages", &self.transcript.len())
            .field("streaming", &self.streaming)
            .field("readiness", &*self.readiness.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{MockBackend, MockChat};
    use crate::core::transcript::Message;
    use crate::stream::EndReason;

    fn session_with(
        backend: &MockBackend,
        readiness: Readiness,
    ) -> (ChatSession, watch::Sender<Readiness>) {
        let (tx, rx) = watch::channel(readiness);
        (ChatSession::new(Arc::new(backend.clone()), rx), tx)
    }

    #[tokio::test]
    async fn test_submit_streams_answer() {
        let backend = MockBackend::new().with_chat(MockChat::deltas(&["Hi", "there"]));
        let (mut session, _tx) = session_with(&backend, Readiness::ready());

        session.submit("hello").await;

        assert_eq!(
            session.transcript().messages(),
            &[Message::user("hello"), Message::assistant("Hithere")]
        );
        assert!(!session.is_streaming());
        assert_eq!(backend.queries(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_submit_trims_query() {
        let backend = MockBackend::new().with_chat(MockChat::deltas(&["ok"]));
        let (mut session, _tx) = session_with(&backend, Readiness::ready());

        session.submit("  what is this?\n").await;

        assert_eq!(session.transcript().messages()[0], Message::user("what is this?"));
        assert_eq!(backend.queries(), vec!["what is this?".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_submissions_are_noops() {
        let backend = MockBackend::new();
        let (mut session, _tx) = session_with(&backend, Readiness::ready());

        session.submit("").await;
        session.submit(" ").await;
        session.submit("\n\t").await;

        assert!(session.transcript().is_empty());
        assert!(backend.queries().is_empty());
    }

    #[tokio::test]
    async fn test_submit_while_not_ready_is_noop() {
        let backend = MockBackend::new().with_chat(MockChat::deltas(&["x"]));
        for readiness in [
            Readiness::connecting(),
            Readiness::initializing(),
            Readiness::unreachable(crate::core::readiness::UnreachableCause::InitializationFailed),
        ] {
            let (mut session, _tx) = session_with(&backend, readiness);
            session.submit("hello").await;
            assert!(session.transcript().is_empty());
        }
        assert!(backend.queries().is_empty());
    }

    #[tokio::test]
    async fn test_submit_while_streaming_is_noop() {
        let backend = MockBackend::new();
        let (mut session, _tx) = session_with(&backend, Readiness::ready());

        assert_eq!(session.begin("first").as_deref(), Some("first"));
        assert!(session.is_streaming());
        let before = session.transcript().clone();

        session.submit("second").await;

        assert_eq!(session.transcript(), &before);
        assert!(backend.queries().is_empty());
    }

    #[tokio::test]
    async fn test_readiness_change_opens_gate() {
        let backend = MockBackend::new().with_chat(MockChat::deltas(&["ok"]));
        let (mut session, tx) = session_with(&backend, Readiness::initializing());

        session.submit("hello").await;
        assert!(session.transcript().is_empty());

        tx.send_replace(Readiness::ready());
        session.submit("hello").await;
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_connect_failure_writes_error_marker() {
        let backend = MockBackend::new().with_chat(MockChat::Unreachable);
        let (mut session, _tx) = session_with(&backend, Readiness::ready());

        session.submit("hello").await;

        assert_eq!(
            session.transcript().last(),
            Some(&Message::assistant(STREAM_ERROR_MARKER))
        );
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn test_session_accepts_again_after_failure() {
        let backend = MockBackend::new()
            .with_chat(MockChat::HttpStatus(500))
            .with_chat(MockChat::deltas(&["recovered"]));
        let (mut session, _tx) = session_with(&backend, Readiness::ready());

        session.submit("one").await;
        session.submit("two").await;

        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, STREAM_ERROR_MARKER);
        assert_eq!(messages[3].content, "recovered");
    }

    #[tokio::test]
    async fn test_broken_stream_keeps_partial_answer() {
        let backend = MockBackend::new()
            .with_chat(MockChat::BrokenAfter(vec![b"data: Partial\n\n".to_vec()]));
        let (mut session, _tx) = session_with(&backend, Readiness::ready());

        session.submit("hello").await;

        assert_eq!(
            session.transcript().last().map(|m| m.content.as_str()),
            Some("Partial[Error] Failed to stream response.")
        );
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn test_exhausted_stream_ends_streaming() {
        let backend = MockBackend::new().with_chat(MockChat::chunks(["data: only\n\n"]));
        let (mut session, _tx) = session_with(&backend, Readiness::ready());

        session.submit("hello").await;

        assert_eq!(session.transcript().messages()[1].content, "only");
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn test_sentinel_ends_streaming_before_trailing_blocks() {
        let backend = MockBackend::new().with_chat(MockChat::chunks([
            "data: a\n\ndata: [DONE]\n\n",
            "data: late\n\n",
        ]));
        let (mut session, _tx) = session_with(&backend, Readiness::ready());

        session.submit("q").await;

        assert_eq!(session.transcript().messages()[1].content, "a");
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn test_submit_input_clears_buffer() {
        let backend = MockBackend::new().with_chat(MockChat::deltas(&["ok"]));
        let (mut session, _tx) = session_with(&backend, Readiness::ready());

        session.set_input(" hello ");
        session.submit_input().await;

        assert!(session.input().is_empty());
        assert_eq!(session.transcript().messages()[0], Message::user("hello"));
    }

    #[tokio::test]
    async fn test_rejected_input_is_kept() {
        let backend = MockBackend::new();
        let (mut session, _tx) = session_with(&backend, Readiness::initializing());

        session.set_input("draft");
        session.submit_input().await;

        assert_eq!(session.input(), "draft");
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn test_apply_events_directly() {
        let backend = MockBackend::new();
        let (_tx, rx) = watch::channel(Readiness::ready());
        let mut session = ChatSession::new(Arc::new(backend), rx);

        assert!(session.begin("hello").is_some());
        session.apply(StreamEvent::Delta("Hel".into()));
        session.apply(StreamEvent::Delta("lo!".into()));
        assert!(session.is_streaming());
        assert!(!session.can_submit());

        session.apply(StreamEvent::Finished(EndReason::Sentinel));
        assert!(!session.is_streaming());
        assert!(session.can_submit());
        assert_eq!(session.transcript().messages()[1].content, "Hello!");
    }
}
