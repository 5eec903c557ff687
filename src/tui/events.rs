use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::stream::StreamEvent;

pub const POLL_TIMEOUT: Duration = Duration::from_millis(100);
pub const TICK_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient one-line message shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub level: NoticeLevel,
}

impl Notice {
    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: NoticeLevel::Info,
        }
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: NoticeLevel::Error,
        }
    }
}

#[derive(Debug)]
pub enum AppEvent {
    Input(KeyEvent),
    Paste(String),
    Tick,
    Stream(StreamEvent),
    Notice(Notice),
}

/// Blocking terminal reader; run it on a blocking thread.
pub fn terminal_event_loop(tx: &UnboundedSender<AppEvent>) -> std::io::Result<()> {
    loop {
        if tx.is_closed() {
            break;
        }
        if event::poll(POLL_TIMEOUT)? {
            let app_event = match event::read()? {
                CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => {
                    Some(AppEvent::Input(key))
                }
                CrosstermEvent::Paste(text) => Some(AppEvent::Paste(text)),
                _ => None,
            };

            if let Some(event) = app_event
                && tx.send(event).is_err()
            {
                break;
            }
        }
    }
    Ok(())
}

pub async fn tick_loop(tx: UnboundedSender<AppEvent>) {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    loop {
        interval.tick().await;
        if tx.send(AppEvent::Tick).is_err() {
            break;
        }
    }
}
