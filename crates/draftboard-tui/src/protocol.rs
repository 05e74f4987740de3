// Messages between the board's app task, the terminal UI, and background
// backend calls.

use std::path::PathBuf;

use draftboard_core::model::{Manager, Player};

use crate::stats::StatsTable;

/// Commands from the TUI to the app task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Draft the available player with this id for the team on the clock.
    Draft { player_id: String },
    /// Add a hand-made player to the pool and draft them at once.
    CreateAndDraft(NewPlayer),
    /// Fetch season stats for an available player.
    ShowStats { player_id: String },
    CloseStats,
    Undo,
    TogglePause,
    Quit,
}

/// Fields of the add-player form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPlayer {
    pub first_name: String,
    pub last_name: String,
    pub team: String,
    pub position_code: String,
}

/// Updates from the app task to the TUI.
#[derive(Debug, Clone)]
pub enum UiUpdate {
    Snapshot(Box<BoardSnapshot>),
}

/// Everything the board screen draws.
#[derive(Debug, Clone, Default)]
pub struct BoardSnapshot {
    pub draft_name: String,
    pub managers: Vec<Manager>,
    /// Undrafted players in display order.
    pub available: Vec<Player>,
    pub current_manager: usize,
    /// 0-based round of the next pick.
    pub current_round: usize,
    pub rounds: usize,
    pub picks_made: usize,
    pub total_picks: usize,
    pub remaining_secs: i64,
    pub paused: bool,
    pub completed: bool,
    pub undo_pending: bool,
    /// Pick writes that failed after the board moved on.
    pub divergences: usize,
    /// Last message worth showing to the user.
    pub notice: Option<String>,
    /// Open stats popup.
    pub stats: Option<StatsPanel>,
}

/// Stats popup contents. Loading while neither `table` nor `error` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsPanel {
    pub player_id: String,
    pub player_name: String,
    pub table: Option<StatsTable>,
    pub error: Option<String>,
}

/// Results of backend calls spawned by the app task.
#[derive(Debug)]
pub enum BackendOutcome {
    /// A pick write finished.
    PickPersisted {
        player_id: String,
        result: Result<(), String>,
    },
    /// The store answered an undo request with the removed player or a refusal.
    UndoResolved(Result<Player, String>),
    /// The draft was marked complete and the export written to disk.
    ExportSaved(Result<PathBuf, String>),
    /// A hand-made player was added to the service's pool.
    PlayerCreated {
        player_id: String,
        result: Result<(), String>,
    },
    StatsLoaded {
        player_id: String,
        result: Result<StatsTable, String>,
    },
}
