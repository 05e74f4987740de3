// "Create & Draft" popup: a small form for a player missing from the pool.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Alignment;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use draftboard_core::model::POSITION_CODES;

use super::layout::centered;
use crate::protocol::NewPlayer;

const TEAM_LEN: usize = 3;
const NAME_LEN: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormField {
    #[default]
    FirstName,
    LastName,
    Team,
    Position,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::FirstName => FormField::LastName,
            FormField::LastName => FormField::Team,
            FormField::Team => FormField::Position,
            FormField::Position => FormField::FirstName,
        }
    }

    fn prev(self) -> Self {
        match self {
            FormField::FirstName => FormField::Position,
            FormField::LastName => FormField::FirstName,
            FormField::Team => FormField::LastName,
            FormField::Position => FormField::Team,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddPlayerForm {
    pub first_name: String,
    pub last_name: String,
    pub team: String,
    /// Index into `POSITION_CODES`.
    pub position: usize,
    pub field: FormField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    Continue,
    Cancel,
    Submit(NewPlayer),
}

impl AddPlayerForm {
    pub fn position_code(&self) -> &'static str {
        POSITION_CODES[self.position % POSITION_CODES.len()]
    }

    fn has_name(&self) -> bool {
        !self.first_name.trim().is_empty() || !self.last_name.trim().is_empty()
    }

    fn to_new_player(&self) -> NewPlayer {
        NewPlayer {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            team: self.team.clone(),
            position_code: self.position_code().to_string(),
        }
    }

    fn cycle_position(&mut self, forward: bool) {
        let len = POSITION_CODES.len();
        self.position = if forward {
            (self.position + 1) % len
        } else {
            (self.position + len - 1) % len
        };
    }

    fn push_char(&mut self, c: char) {
        match self.field {
            FormField::FirstName if self.first_name.chars().count() < NAME_LEN => {
                self.first_name.push(c)
            }
            FormField::LastName if self.last_name.chars().count() < NAME_LEN => {
                self.last_name.push(c)
            }
            FormField::Team if c.is_ascii_alphabetic() && self.team.len() < TEAM_LEN => {
                self.team.push(c.to_ascii_uppercase())
            }
            FormField::Position => {
                let code = c.to_ascii_uppercase().to_string();
                if let Some(i) = POSITION_CODES.iter().position(|p| *p == code) {
                    self.position = i;
                }
            }
            _ => {}
        }
    }

    fn pop_char(&mut self) {
        match self.field {
            FormField::FirstName => {
                self.first_name.pop();
            }
            FormField::LastName => {
                self.last_name.pop();
            }
            FormField::Team => {
                self.team.pop();
            }
            FormField::Position => {}
        }
    }

    /// Apply one key press. Enter submits once either name is filled in.
    pub fn handle_key(&mut self, key_event: KeyEvent) -> FormAction {
        match key_event.code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter if self.has_name() => return FormAction::Submit(self.to_new_player()),
            KeyCode::Tab | KeyCode::Down => self.field = self.field.next(),
            KeyCode::BackTab | KeyCode::Up => self.field = self.field.prev(),
            KeyCode::Left if self.field == FormField::Position => self.cycle_position(false),
            KeyCode::Right if self.field == FormField::Position => self.cycle_position(true),
            KeyCode::Backspace => self.pop_char(),
            KeyCode::Char(c) => self.push_char(c),
            _ => {}
        }
        FormAction::Continue
    }
}

pub fn render(frame: &mut Frame, form: &AddPlayerForm, team_on_clock: &str) {
    let line = |label: &str, value: String, field: FormField| {
        let style = if form.field == field {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(format!("{label:<10}"), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format!(" {value:<20}"), style),
        ])
    };

    let area = centered(frame.area(), 48, 9);
    let paragraph = Paragraph::new(vec![
        line("First", form.first_name.clone(), FormField::FirstName),
        line("Last", form.last_name.clone(), FormField::LastName),
        line("Team", form.team.clone(), FormField::Team),
        line(
            "Position",
            format!("< {} >", form.position_code()),
            FormField::Position,
        ),
        Line::from(""),
        Line::from(Span::styled(
            format!("Enter: Create & Draft for {team_on_clock}"),
            Style::default().add_modifier(Modifier::DIM),
        )),
    ])
    .alignment(Alignment::Left)
    .block(Block::default().borders(Borders::ALL).title("Add player"));
    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}
