// Screen layout for the draft board.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Clock Banner (4 rows)                             |
// +------------------+-------------------------------+
// | Available (35%)  | Board (65%)                   |
// |                  |  rounds x teams               |
// +------------------+-------------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Draft name, round and pick counters.
    pub status_bar: Rect,
    /// Team on the clock, countdown, last notice.
    pub clock_banner: Rect,
    /// Searchable list of undrafted players.
    pub available: Rect,
    /// Picks by round and team.
    pub board: Rect,
    /// Keyboard shortcut hints.
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Length(4), // clock banner
            Constraint::Min(8),    // available + board
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(vertical[2]);

    AppLayout {
        status_bar: vertical[0],
        clock_banner: vertical[1],
        available: horizontal[0],
        board: horizontal[1],
        help_bar: vertical[3],
    }
}

/// A `width` x `height` rectangle centered in `area`, shrunk to fit.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
