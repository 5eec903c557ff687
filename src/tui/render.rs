use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use unicode_width::UnicodeWidthStr;

use super::events::{Notice, NoticeLevel};
use super::scroll::ScrollState;
use crate::backend::BaseUrl;
use crate::core::{Message, Readiness, ReadinessState, Role, STREAM_ERROR_MARKER};

pub const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const USER_PREFIX: &str = "> ";
const ASSISTANT_INDENT: &str = "  ";
const STREAM_CURSOR: &str = "▌";
const HINTS: &str = "/help commands | PgUp/PgDn scroll | Ctrl+C quit";

mod style {
    use super::{Color, Modifier, Style};

    pub fn title() -> Style {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    }

    pub fn muted() -> Style {
        Style::default().fg(Color::DarkGray)
    }

    pub fn user() -> Style {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    }

    pub fn assistant() -> Style {
        Style::default().fg(Color::Gray)
    }

    pub fn warning() -> Style {
        Style::default().fg(Color::Yellow)
    }

    pub fn error() -> Style {
        Style::default().fg(Color::Red)
    }

    pub fn border(active: bool) -> Style {
        if active {
            Style::default().fg(Color::Cyan)
        } else {
            muted()
        }
    }
}

#[must_use]
pub fn spinner(frame: usize) -> &'static str {
    SPINNER[frame % SPINNER.len()]
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    textwrap::wrap(text, width.max(1))
        .into_iter()
        .map(std::borrow::Cow::into_owned)
        .collect()
}

fn user_lines(text: &str, width: u16) -> Vec<Line<'static>> {
    let available = usize::from(width).saturating_sub(USER_PREFIX.len());
    wrap(text, available)
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let lead = if i == 0 { USER_PREFIX } else { "  " };
            Line::from(vec![
                Span::styled(lead, style::user()),
                Span::styled(line, style::user()),
            ])
        })
        .collect()
}

fn assistant_lines(text: &str, width: u16) -> Vec<Line<'static>> {
    let available = usize::from(width).saturating_sub(ASSISTANT_INDENT.len());
    wrap(text, available)
        .into_iter()
        .map(|line| {
            let line_style = if line.contains(STREAM_ERROR_MARKER) {
                style::error()
            } else {
                style::assistant()
            };
            Line::from(vec![
                Span::raw(ASSISTANT_INDENT),
                Span::styled(line, line_style),
            ])
        })
        .collect()
}

/// Flattens the transcript into wrapped display lines. While a response is
/// streaming the last assistant message shows a spinner until its first delta
/// arrives and a cursor afterwards.
#[must_use]
pub fn transcript_lines(
    messages: &[Message],
    width: u16,
    streaming: bool,
    spinner_frame: usize,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let last = messages.len().saturating_sub(1);

    for (i, message) in messages.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }

        let live = streaming && i == last && message.role == Role::Assistant;
        match message.role {
            Role::User => lines.extend(user_lines(&message.content, width)),
            Role::Assistant if live && message.content.is_empty() => {
                lines.push(Line::from(vec![
                    Span::raw(ASSISTANT_INDENT),
                    Span::styled(
                        format!("{} Thinking...", spinner(spinner_frame)),
                        style::warning(),
                    ),
                ]));
            }
            Role::Assistant => {
                lines.extend(assistant_lines(&message.content, width));
                if live && let Some(line) = lines.last_mut() {
                    line.spans.push(Span::styled(STREAM_CURSOR, style::muted()));
                }
            }
        }
    }

    lines
}

pub fn render_header(frame: &mut Frame, area: Rect, base_url: &BaseUrl) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_type(BorderType::Rounded)
        .border_style(style::muted());

    let lines = vec![
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                format!("ragchat v{}", env!("CARGO_PKG_VERSION")),
                style::title(),
            ),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("Backend: {base_url}"), style::muted()),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

pub fn render_chat(
    frame: &mut Frame,
    area: Rect,
    messages: &[Message],
    streaming: bool,
    spinner_frame: usize,
    scroll: &mut ScrollState,
) {
    if messages.is_empty() {
        scroll.update(0, usize::from(area.height));
        let hint = Line::from(Span::styled(
            "  Ask a question about your documents.",
            style::muted(),
        ));
        frame.render_widget(Paragraph::new(hint), area);
        return;
    }

    let lines = transcript_lines(messages, area.width, streaming, spinner_frame);
    scroll.update(lines.len(), usize::from(area.height));
    let top = u16::try_from(scroll.top()).unwrap_or(u16::MAX);

    frame.render_widget(Paragraph::new(lines).scroll((top, 0)), area);
}

pub fn render_banner(frame: &mut Frame, area: Rect, readiness: &Readiness, spinner_frame: usize) {
    if area.height == 0 || readiness.status.is_empty() {
        return;
    }

    let line = match readiness.state {
        ReadinessState::Ready => return,
        ReadinessState::Initializing => Line::from(vec![
            Span::raw(" "),
            Span::styled(spinner(spinner_frame), style::warning()),
            Span::raw(" "),
            Span::styled(readiness.status, style::warning()),
        ]),
        ReadinessState::Unreachable(_) => Line::from(vec![
            Span::raw(" "),
            Span::styled(format!("! {}", readiness.status), style::error()),
        ]),
    };

    frame.render_widget(Paragraph::new(line), area);
}

/// Draws the input box and places the terminal cursor at the end of the
/// text. Long input scrolls horizontally to keep the cursor visible.
pub fn render_input(frame: &mut Frame, area: Rect, input: &str, streaming: bool, ready: bool) {
    let title = if streaming {
        " Answering... "
    } else if ready {
        " Message "
    } else {
        " Waiting for backend "
    };
    let active = ready && !streaming;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(style::border(active))
        .title(Span::styled(title, style::border(active)));
    let inner = block.inner(area);

    let available = usize::from(inner.width).saturating_sub(USER_PREFIX.len() + 1);
    let visible = tail_fitting(input, available);

    let line = Line::from(vec![
        Span::styled(USER_PREFIX, style::border(active)),
        Span::raw(visible.to_string()),
    ]);
    frame.render_widget(Paragraph::new(line).block(block), area);

    if inner.width > 0 && inner.height > 0 {
        let x = inner.x + (USER_PREFIX.len() + visible.width()) as u16;
        frame.set_cursor_position((x.min(inner.right().saturating_sub(1)), inner.y));
    }
}

/// Longest suffix of `text` whose display width fits in `width` columns.
fn tail_fitting(text: &str, width: usize) -> &str {
    if text.width() <= width {
        return text;
    }
    let mut used = 0;
    for (idx, ch) in text.char_indices().rev() {
        used += unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used > width {
            return &text[idx + ch.len_utf8()..];
        }
    }
    text
}

pub fn render_status(
    frame: &mut Frame,
    area: Rect,
    streaming: bool,
    spinner_frame: usize,
    notice: Option<&Notice>,
) {
    let left = match notice {
        Some(notice) => {
            let notice_style = match notice.level {
                NoticeLevel::Info => style::assistant(),
                NoticeLevel::Error => style::error(),
            };
            Line::from(vec![
                Span::raw(" "),
                Span::styled(notice.text.clone(), notice_style),
            ])
        }
        None => Line::from(vec![Span::raw(" "), Span::styled(HINTS, style::muted())]),
    };
    frame
        .buffer_mut()
        .set_line(area.x, area.y, &left, area.width);

    if streaming {
        let right = Line::from(vec![
            Span::styled(
                format!("{} Streaming", spinner(spinner_frame)),
                style::warning(),
            ),
            Span::raw(" "),
        ]);
        let len = right.width() as u16;
        let x = area.x + area.width.saturating_sub(len);
        frame.buffer_mut().set_line(x, area.y, &right, len);
    }
}
