// Terminal draft board: view state, rendering, and the terminal event loop.
//
// The TUI keeps a `ViewState` holding the latest `BoardSnapshot` from the app
// task plus purely local state (selection, filter, popups) and re-renders it
// at ~30 fps.

pub mod add_player;
pub mod input;
pub mod layout;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::layout::{Alignment, Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};
use ratatui::Frame;
use tokio::sync::mpsc;

use draftboard_core::model::{Pick, Player};

use crate::protocol::{BoardSnapshot, StatsPanel, UiUpdate, UserCommand};

use add_player::AddPlayerForm;
use layout::{build_layout, centered, AppLayout};

/// Below this many seconds the clock turns orange.
const CLOCK_WARNING_SECS: i64 = 15;

const ORANGE: Color = Color::Rgb(255, 165, 0);

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ViewState {
    /// Latest state pushed by the app task.
    pub board: BoardSnapshot,
    /// Name filter for the available list.
    pub filter_text: String,
    pub filter_mode: bool,
    /// Index into `filtered_players()`.
    pub selected: usize,
    /// Player id waiting for a y/n confirmation.
    pub confirm_pick: Option<String>,
    /// Open "Create & Draft" form.
    pub add_form: Option<AddPlayerForm>,
}

impl ViewState {
    pub fn apply_snapshot(&mut self, snapshot: BoardSnapshot) {
        self.board = snapshot;
        if let Some(id) = &self.confirm_pick {
            if !self.board.available.iter().any(|p| &p.id == id) {
                self.confirm_pick = None;
            }
        }
        if self.board.completed {
            self.add_form = None;
        }
        self.clamp_selection();
    }

    /// Available players matching the filter, in display order.
    pub fn filtered_players(&self) -> Vec<&Player> {
        self.board
            .available
            .iter()
            .filter(|p| p.name_matches(&self.filter_text))
            .collect()
    }

    pub fn selected_player(&self) -> Option<&Player> {
        self.filtered_players().get(self.selected).copied()
    }

    pub fn set_filter(&mut self, text: String) {
        self.filter_text = text;
        self.selected = 0;
    }

    pub fn select_up(&mut self, rows: usize) {
        self.selected = self.selected.saturating_sub(rows);
    }

    pub fn select_down(&mut self, rows: usize) {
        self.selected = self.selected.saturating_add(rows);
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let len = self.filtered_players().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}

fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Snapshot(snapshot) => state.apply_snapshot(*snapshot),
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// `m:ss`, with a leading minus once the nominal time is used up.
pub fn format_clock(secs: i64) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let abs = secs.unsigned_abs();
    format!("{sign}{}:{:02}", abs / 60, abs % 60)
}

/// Red past zero, orange in the last seconds, green otherwise.
pub fn clock_color(secs: i64) -> Color {
    if secs < 0 {
        Color::Red
    } else if secs < CLOCK_WARNING_SECS {
        ORANGE
    } else {
        Color::Green
    }
}

/// "C. McDavid C" style cell text for the board.
fn pick_label(pick: &Pick) -> String {
    let player = &pick.player;
    if player.is_forfeit() {
        return "(forfeit)".to_string();
    }
    let initial = player
        .first_name
        .default
        .chars()
        .next()
        .map(|c| format!("{c}. "))
        .unwrap_or_default();
    format!(
        "{initial}{} {}",
        player.last_name.default,
        player.display_position()
    )
}

// ---------------------------------------------------------------------------
// Render
// ---------------------------------------------------------------------------

fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    render_status_bar(frame, &layout, state);
    render_clock_banner(frame, &layout, state);
    render_available(frame, &layout, state);
    render_board(frame, &layout, state);
    render_help_bar(frame, &layout, state);

    if let Some(panel) = &state.board.stats {
        render_stats(frame, panel);
    }
    if let Some(form) = &state.add_form {
        add_player::render(frame, form, team_on_clock(&state.board));
    }
    if let Some(id) = &state.confirm_pick {
        render_confirm(frame, state, id);
    }
}

fn team_on_clock(board: &BoardSnapshot) -> &str {
    board
        .managers
        .get(board.current_manager)
        .map(|m| m.name.as_str())
        .unwrap_or("--")
}

fn render_status_bar(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let board = &state.board;
    let round = (board.current_round + 1).min(board.rounds.max(1));
    let mut spans = vec![Span::styled(
        format!(
            " {} | Round {}/{} | Pick {}/{}",
            board.draft_name, round, board.rounds, board.picks_made, board.total_picks
        ),
        Style::default().fg(Color::White),
    )];
    if board.divergences > 0 {
        spans.push(Span::styled(
            format!(" | {} unsaved pick(s)", board.divergences),
            Style::default().fg(Color::Yellow),
        ));
    }
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.status_bar);
}

fn render_clock_banner(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let board = &state.board;

    let headline = if board.completed {
        Line::from(Span::styled(
            "Draft complete",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ))
    } else {
        let team = team_on_clock(board);
        let mut spans = vec![
            Span::raw("On the clock: "),
            Span::styled(team.to_string(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("   "),
            Span::styled(
                format_clock(board.remaining_secs),
                Style::default()
                    .fg(clock_color(board.remaining_secs))
                    .add_modifier(Modifier::BOLD),
            ),
        ];
        if board.paused {
            spans.push(Span::styled(
                "  PAUSED",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ));
        }
        if board.undo_pending {
            spans.push(Span::styled("  undoing...", Style::default().fg(Color::Gray)));
        }
        Line::from(spans)
    };

    let notice = Line::from(Span::styled(
        board.notice.clone().unwrap_or_default(),
        Style::default().fg(Color::Gray),
    ));

    let paragraph = Paragraph::new(vec![headline, notice])
        .block(Block::default().borders(Borders::ALL).title("Clock"));
    frame.render_widget(paragraph, layout.clock_banner);
}

fn render_available(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let players = state.filtered_players();

    let header = Row::new(vec!["Name", "Team", "Pos"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = players
        .iter()
        .map(|p| {
            let name = match &p.emoji {
                Some(emoji) => format!("{emoji} {}", p.full_name()),
                None => p.full_name(),
            };
            Row::new(vec![
                Cell::from(name),
                Cell::from(p.team.clone()),
                Cell::from(p.display_position().to_string()),
            ])
        })
        .collect();

    let mut title = format!("Available ({})", players.len());
    if state.filter_mode || !state.filter_text.is_empty() {
        title.push_str(&format!(" /{}", state.filter_text));
    }

    let table = Table::new(
        rows,
        [
            Constraint::Min(16),
            Constraint::Length(5),
            Constraint::Length(4),
        ],
    )
    .header(header)
    .row_highlight_style(
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .block(Block::default().borders(Borders::ALL).title(title));

    let mut table_state = TableState::default();
    if !players.is_empty() {
        table_state.select(Some(state.selected));
    }
    frame.render_stateful_widget(table, layout.available, &mut table_state);
}

fn render_board(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let board = &state.board;
    let teams = board.managers.len().max(1) as u32;

    let mut header_cells = vec![Cell::from("Rd")];
    for (i, manager) in board.managers.iter().enumerate() {
        let style = if i == board.current_manager && !board.completed {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        header_cells.push(Cell::from(manager.name.clone()).style(style));
    }

    let slots: Vec<Vec<Option<&Pick>>> = board
        .managers
        .iter()
        .map(|m| m.slots(board.rounds))
        .collect();

    let rows: Vec<Row> = (0..board.rounds)
        .map(|round| {
            let mut cells = vec![Cell::from(format!("{:>2}", round + 1))];
            for (i, manager_slots) in slots.iter().enumerate() {
                let on_clock =
                    !board.completed && round == board.current_round && i == board.current_manager;
                let cell = match manager_slots[round] {
                    Some(pick) if pick.player.is_forfeit() => {
                        Cell::from(pick_label(pick)).style(Style::default().fg(Color::Red))
                    }
                    Some(pick) => Cell::from(pick_label(pick)),
                    None if on_clock => Cell::from("  ...")
                        .style(Style::default().fg(Color::Black).bg(Color::Cyan)),
                    None => Cell::from(""),
                };
                cells.push(cell);
            }
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![Constraint::Length(3)];
    widths.extend((0..teams).map(|_| Constraint::Ratio(1, teams)));

    let table = Table::new(rows, widths)
        .header(Row::new(header_cells))
        .block(Block::default().borders(Borders::ALL).title("Board"));
    frame.render_widget(table, layout.board);
}

fn render_help_bar(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let text = if state.confirm_pick.is_some() {
        " y/Enter:Confirm | n/Esc:Cancel"
    } else if state.add_form.is_some() {
        " Tab:Next field | \u{2190}/\u{2192}:Position | Enter:Create & Draft | Esc:Cancel"
    } else if state.board.stats.is_some() {
        " Esc/Enter:Close"
    } else if state.filter_mode {
        " Type to filter | Enter:Done | Esc:Clear"
    } else {
        " \u{2191}/\u{2193}:Select | Enter:Draft | a:Add | s:Stats | u:Undo | p:Pause | /:Filter | q:Quit"
    };
    let paragraph = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(Color::White).add_modifier(Modifier::DIM),
    )))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

fn render_confirm(frame: &mut Frame, state: &ViewState, player_id: &str) {
    let board = &state.board;
    let player = board
        .available
        .iter()
        .find(|p| p.id == player_id)
        .map(|p| p.to_string())
        .unwrap_or_else(|| player_id.to_string());
    let team = team_on_clock(board);

    let area: Rect = centered(frame.area(), 56, 5);
    let paragraph = Paragraph::new(vec![
        Line::from(format!("Draft {player}")),
        Line::from(format!("for {team}?")),
        Line::from(Span::styled("y / n", Style::default().add_modifier(Modifier::DIM))),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Confirm pick"));
    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_stats(frame: &mut Frame, panel: &StatsPanel) {
    let area = centered(frame.area(), 80, 16);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Stats: {}", panel.player_name));
    frame.render_widget(Clear, area);

    let message = match (&panel.table, &panel.error) {
        (_, Some(error)) => Some(Span::styled(error.clone(), Style::default().fg(Color::Red))),
        (None, None) => Some(Span::styled("Loading stats...", Style::default().fg(Color::Gray))),
        (Some(table), None) if table.is_empty() => Some(Span::raw("No stats available.")),
        (Some(_), None) => None,
    };
    if let Some(message) = message {
        frame.render_widget(Paragraph::new(Line::from(message)).block(block), area);
        return;
    }

    let Some(table) = &panel.table else {
        return;
    };
    let header = Row::new(table.headers.clone())
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = table.rows.iter().map(|row| Row::new(row.clone())).collect();
    let widths: Vec<Constraint> = table
        .headers
        .iter()
        .map(|_| Constraint::Min(6))
        .collect();
    frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the terminal UI until the user quits or the app task goes away.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    // 1. Initialize terminal
    let mut terminal = ratatui::init();

    // 2. Restore the terminal before the default panic output.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    // 3. Render interval (~30fps)
    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // 4. Main loop
    let result = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => apply_ui_update(&mut view_state, update),
                    // App task finished
                    None => break Ok(()),
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(command) = input::handle_key(key_event, &mut view_state) {
                            let quit = command == UserCommand::Quit;
                            let _ = cmd_tx.send(command).await;
                            if quit {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(anyhow::Error::from(e)),
                    None => break Ok(()),
                }
            }

            _ = render_tick.tick() => {
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(e.into());
                }
            }
        }
    };

    // 5. Restore terminal
    ratatui::restore();

    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
