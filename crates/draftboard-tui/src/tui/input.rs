// Keyboard input handling.
//
// Translates crossterm key events into `UserCommand`s for the app task, or
// into local `ViewState` changes (selection, filter text, popups).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::add_player::{AddPlayerForm, FormAction};
use super::ViewState;
use crate::protocol::UserCommand;

/// Rows moved by PageUp/PageDown.
const PAGE: usize = 10;

/// Handle a key press. Returns the command to forward to the app task, if
/// any.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Some terminals report releases too.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL)
        && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_pick.is_some() {
        return handle_confirm(key_event, view_state);
    }

    if let Some(form) = view_state.add_form.as_mut() {
        return match form.handle_key(key_event) {
            FormAction::Continue => None,
            FormAction::Cancel => {
                view_state.add_form = None;
                None
            }
            FormAction::Submit(new_player) => {
                view_state.add_form = None;
                Some(UserCommand::CreateAndDraft(new_player))
            }
        };
    }

    if view_state.board.stats.is_some() {
        return handle_stats_popup(key_event, view_state);
    }

    if view_state.filter_mode {
        return handle_filter_mode(key_event, view_state);
    }

    match key_event.code {
        KeyCode::Up | KeyCode::Char('k') => {
            view_state.select_up(1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view_state.select_down(1);
            None
        }
        KeyCode::PageUp => {
            view_state.select_up(PAGE);
            None
        }
        KeyCode::PageDown => {
            view_state.select_down(PAGE);
            None
        }
        KeyCode::Enter => {
            if !view_state.board.completed && !view_state.board.undo_pending {
                view_state.confirm_pick = view_state.selected_player().map(|p| p.id.clone());
            }
            None
        }
        KeyCode::Char('a') => {
            if !view_state.board.completed && !view_state.board.undo_pending {
                view_state.add_form = Some(AddPlayerForm::default());
            }
            None
        }
        KeyCode::Char('s') => view_state
            .selected_player()
            .map(|p| UserCommand::ShowStats {
                player_id: p.id.clone(),
            }),
        KeyCode::Char('u') => Some(UserCommand::Undo),
        KeyCode::Char('p') => Some(UserCommand::TogglePause),
        KeyCode::Char('/') => {
            view_state.filter_mode = true;
            None
        }
        KeyCode::Esc => {
            view_state.set_filter(String::new());
            None
        }
        KeyCode::Char('q') => Some(UserCommand::Quit),
        _ => None,
    }
}

/// "Draft X?" prompt: y/Enter confirms, n/Esc cancels, other keys are ignored.
fn handle_confirm(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => view_state
            .confirm_pick
            .take()
            .map(|player_id| UserCommand::Draft { player_id }),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_pick = None;
            None
        }
        _ => None,
    }
}

/// The stats popup closes on Esc, Enter, `s` or `q` and swallows other keys.
fn handle_stats_popup(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('s') | KeyCode::Char('q') => {
            view_state.board.stats = None;
            Some(UserCommand::CloseStats)
        }
        _ => None,
    }
}

fn handle_filter_mode(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            view_state.filter_mode = false;
            view_state.set_filter(String::new());
        }
        KeyCode::Enter => {
            view_state.filter_mode = false;
        }
        KeyCode::Backspace => {
            let mut text = view_state.filter_text.clone();
            text.pop();
            view_state.set_filter(text);
        }
        KeyCode::Up => view_state.select_up(1),
        KeyCode::Down => view_state.select_down(1),
        KeyCode::Char(c) => {
            let mut text = view_state.filter_text.clone();
            text.push(c);
            view_state.set_filter(text);
        }
        _ => {}
    }
    None
}
