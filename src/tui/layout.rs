use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub struct LayoutAreas {
    pub header: Rect,
    pub chat: Rect,
    pub banner: Rect,
    pub input: Rect,
    pub status: Rect,
}

/// The banner row collapses to zero height while there is no readiness
/// message to show.
#[must_use]
pub fn calculate_layout(area: Rect, show_banner: bool) -> LayoutAreas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(u16::from(show_banner)),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    LayoutAreas {
        header: chunks[0],
        chat: chunks[1],
        banner: chunks[2],
        input: chunks[3],
        status: chunks[4],
    }
}
