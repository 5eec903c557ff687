mod app;
mod commands;
mod events;
mod layout;
mod render;
mod scroll;
mod terminal;

pub use app::TuiApp;
pub use commands::SlashCommand;
pub use events::{AppEvent, Notice, NoticeLevel};

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::backend::BackendClient;
use crate::core::ChatSession;
use crate::core::error::Result;

/// Runs the interactive chat until the user quits. The session's readiness
/// receiver must be fed by a running monitor.
pub async fn run_tui(session: ChatSession, client: Arc<BackendClient>) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut app = TuiApp::with_event_channels(session, client, event_tx, event_rx)?;
    app.run().await
}
