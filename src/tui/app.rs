use crossterm::ExecutableCommand;
use crossterm::event::{DisableBracketedPaste, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{LeaveAlternateScreen, disable_raw_mode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::commands::{HELP_TEXT, SlashCommand};
use super::events::{AppEvent, Notice, terminal_event_loop, tick_loop};
use super::layout::calculate_layout;
use super::render::{render_banner, render_chat, render_header, render_input, render_status};
use super::scroll::ScrollState;
use super::terminal::{Tui, restore_terminal, setup_terminal};
use crate::backend::{BackendClient, StatusProbe};
use crate::core::ChatSession;
use crate::core::error::Result;
use crate::stream::{self, StreamEvent};

const NOTICE_TTL: Duration = Duration::from_secs(6);
const TICKS_PER_SPINNER_FRAME: usize = 3;

pub struct TuiApp {
    session: ChatSession,
    client: Arc<BackendClient>,
    scroll: ScrollState,
    notice: Option<(Notice, Instant)>,
    ticks: usize,
    should_quit: bool,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
    terminal: Tui,
}

impl TuiApp {
    pub(crate) fn with_event_channels(
        session: ChatSession,
        client: Arc<BackendClient>,
        event_tx: mpsc::UnboundedSender<AppEvent>,
        event_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> Result<Self> {
        let terminal = setup_terminal()?;

        Ok(Self {
            session,
            client,
            scroll: ScrollState::new(),
            notice: None,
            ticks: 0,
            should_quit: false,
            event_tx,
            event_rx,
            terminal,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let input_tx = self.event_tx.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = terminal_event_loop(&input_tx) {
                tracing::error!("Terminal event loop failed: {e}");
            }
        });
        tokio::spawn(tick_loop(self.event_tx.clone()));

        while !self.should_quit {
            self.draw()?;

            match self.event_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }

        restore_terminal(&mut self.terminal)?;
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        let readiness = self.session.readiness();
        let streaming = self.session.is_streaming();
        let spinner_frame = self.ticks / TICKS_PER_SPINNER_FRAME;
        let notice = self.notice.as_ref().map(|(notice, _)| notice);
        let messages = self.session.transcript().messages();
        let input = self.session.input();
        let base_url = self.client.base_url();
        let scroll = &mut self.scroll;

        self.terminal.draw(|f| {
            let layout = calculate_layout(f.area(), !readiness.status.is_empty());

            render_header(f, layout.header, base_url);
            render_chat(f, layout.chat, messages, streaming, spinner_frame, scroll);
            render_banner(f, layout.banner, &readiness, spinner_frame);
            render_input(f, layout.input, input, streaming, readiness.is_ready());
            render_status(f, layout.status, streaming, spinner_frame, notice);
        })?;

        Ok(())
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(key) => self.handle_key_input(key),
            AppEvent::Paste(text) => {
                let text = text.replace(['\r', '\n'], " ");
                self.session.input_mut().push_str(&text);
            }
            AppEvent::Tick => self.tick(),
            AppEvent::Stream(event) => {
                if let StreamEvent::Failed(err) = &event {
                    self.set_notice(Notice::error(format!("Stream failed: {err}")));
                }
                self.session.apply(event);
            }
            AppEvent::Notice(notice) => self.set_notice(notice),
        }
    }

    fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        if let Some((_, shown_at)) = &self.notice
            && shown_at.elapsed() >= NOTICE_TTL
        {
            self.notice = None;
        }
    }

    fn set_notice(&mut self, notice: Notice) {
        self.notice = Some((notice, Instant::now()));
    }

    fn handle_key_input(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') if !self.session.input().is_empty() => {
                    self.session.set_input("");
                }
                KeyCode::Char('c') => self.should_quit = true,
                KeyCode::Char('d') if self.session.input().is_empty() => self.should_quit = true,
                KeyCode::Char('l') => self.clear_transcript(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Enter => self.submit_input(),
            KeyCode::Backspace => {
                self.session.input_mut().pop();
            }
            KeyCode::Esc => self.session.set_input(""),
            KeyCode::PageUp => self.scroll.scroll_up(self.scroll.page()),
            KeyCode::PageDown => self.scroll.scroll_down(self.scroll.page()),
            KeyCode::Up => self.scroll.scroll_up(1),
            KeyCode::Down => self.scroll.scroll_down(1),
            KeyCode::End => self.scroll.reset(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::ALT) => {
                self.session.input_mut().push(c);
            }
            _ => {}
        }
    }

    fn submit_input(&mut self) {
        let input = self.session.input().to_string();
        if SlashCommand::is_command(&input) {
            self.session.set_input("");
            self.handle_slash_command(&input);
            return;
        }
        if input.trim().is_empty() {
            return;
        }
        if self.session.is_streaming() {
            self.set_notice(Notice::info("Wait for the current answer to finish."));
            return;
        }
        if !self.session.is_ready() {
            self.set_notice(Notice::error(self.session.readiness().status));
            return;
        }

        let Some(query) = self.session.begin(&input) else {
            return;
        };
        self.scroll.reset();

        let backend = self.session.backend();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            stream::drive(backend.as_ref(), &query, |event| {
                let _ = tx.send(AppEvent::Stream(event));
            })
            .await;
        });
    }

    fn clear_transcript(&mut self) {
        if self.session.is_streaming() {
            self.set_notice(Notice::info("Wait for the current answer to finish."));
            return;
        }
        self.session.clear_transcript();
        self.scroll.reset();
        self.set_notice(Notice::info("Chat history cleared."));
    }

    fn handle_slash_command(&mut self, command: &str) {
        match SlashCommand::parse(command) {
            SlashCommand::Help => self.set_notice(Notice::info(HELP_TEXT)),
            SlashCommand::Clear => self.clear_transcript(),
            SlashCommand::Status => {
                let client = Arc::clone(&self.client);
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let notice = match client.status().await {
                        Ok(report) => Notice::info(report.to_string()),
                        Err(e) => Notice::error(format!("Status check failed: {e}")),
                    };
                    let _ = tx.send(AppEvent::Notice(notice));
                });
            }
            SlashCommand::Reindex => {
                self.set_notice(Notice::info("Reindexing..."));
                let client = Arc::clone(&self.client);
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let notice = match client.reindex().await {
                        Ok(report) => Notice::info(format!("Reindex requested | {report}")),
                        Err(e) => Notice::error(format!("Reindex failed: {e}")),
                    };
                    let _ = tx.send(AppEvent::Notice(notice));
                });
            }
            SlashCommand::Exit => self.should_quit = true,
            SlashCommand::Unknown(cmd) => self.set_notice(Notice::error(format!(
                "Unknown command: {cmd}. Type /help for available commands."
            ))),
        }
    }
}

impl Drop for TuiApp {
    fn drop(&mut self) {
        let _ = self.terminal.backend_mut().execute(DisableBracketedPaste);
        let _ = disable_raw_mode();
        let _ = self.terminal.backend_mut().execute(LeaveAlternateScreen);
    }
}
