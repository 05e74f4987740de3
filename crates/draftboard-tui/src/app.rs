// Board orchestrator: owns the draft session and mirrors it to the service.
//
// The app task runs a select loop over user commands from the TUI, results
// of spawned backend calls, and a one-second clock. Picks change local state
// first and are written in the background; undo waits for the store before
// touching anything. Backend writes run one after another in issue order.
// After each event a fresh snapshot goes to the TUI.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use draftboard_core::export::results_file_name;
use draftboard_core::model::Player;
use draftboard_core::session::{DraftSession, PickEffects, SessionSettings};

use crate::client::DraftBackend;
use crate::protocol::{
    BackendOutcome, BoardSnapshot, NewPlayer, StatsPanel, UiUpdate, UserCommand,
};
use crate::stats::StatsTable;

/// Clock resolution.
const CLOCK_TICK: Duration = Duration::from_secs(1);

/// How long to wait for in-flight writes on shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// BoardApp
// ---------------------------------------------------------------------------

pub struct BoardApp<B: DraftBackend> {
    session: DraftSession,
    backend: Arc<B>,
    outcome_tx: mpsc::Sender<BackendOutcome>,
    export_dir: PathBuf,
    export_requested: bool,
    /// Most recent backend write; each new write waits for it.
    write_chain: Option<JoinHandle<()>>,
    stats: Option<StatsPanel>,
    notice: Option<String>,
}

impl<B: DraftBackend> BoardApp<B> {
    /// Wrap a session. Returns the receiver on which spawned backend calls
    /// report back.
    pub fn new(
        session: DraftSession,
        backend: Arc<B>,
        export_dir: PathBuf,
    ) -> (Self, mpsc::Receiver<BackendOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::channel(64);
        let app = BoardApp {
            session,
            backend,
            outcome_tx,
            export_dir,
            export_requested: false,
            write_chain: None,
            stats: None,
            notice: None,
        };
        (app, outcome_rx)
    }

    /// Fetch a draft and the player pool and start a session on them.
    ///
    /// A draft whose picks are all in but that the store has not flagged
    /// complete gets its completion requested right away.
    pub async fn load(
        backend: Arc<B>,
        draft_id: &str,
        settings: SessionSettings,
        export_dir: PathBuf,
    ) -> anyhow::Result<(Self, mpsc::Receiver<BackendOutcome>)> {
        let (draft, players) =
            tokio::try_join!(backend.load_draft(draft_id), backend.list_players())
                .with_context(|| format!("failed to load draft {draft_id}"))?;
        let flagged = draft.completed;

        let session = DraftSession::from_draft(draft, players, settings)
            .with_context(|| format!("draft {draft_id} cannot be run"))?;

        let (mut app, outcome_rx) = Self::new(session, backend, export_dir);
        if app.session.is_complete() && !flagged {
            info!("All picks are in but the draft is not marked complete; completing it");
            app.request_completion();
        }
        Ok((app, outcome_rx))
    }

    pub fn session(&self) -> &DraftSession {
        &self.session
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn stats(&self) -> Option<&StatsPanel> {
        self.stats.as_ref()
    }

    // -- events ------------------------------------------------------------

    /// Apply one user command. Returns `false` when the board should close.
    pub fn handle_command(&mut self, command: UserCommand) -> bool {
        match command {
            UserCommand::Draft { player_id } => self.draft(&player_id),
            UserCommand::CreateAndDraft(new_player) => self.create_and_draft(new_player),
            UserCommand::ShowStats { player_id } => self.show_stats(&player_id),
            UserCommand::CloseStats => self.stats = None,
            UserCommand::Undo => self.undo(),
            UserCommand::TogglePause => {
                let paused = self.session.toggle_pause();
                info!("Clock {}", if paused { "paused" } else { "running" });
            }
            UserCommand::Quit => return false,
        }
        true
    }

    /// Advance the clock; dispatches the forfeit pick when one fires.
    pub fn handle_tick(&mut self, delta_secs: i64) {
        let outcome = self.session.tick(delta_secs);
        if let Some(effects) = outcome.forfeit {
            let name = self
                .session
                .managers()
                .get(effects.persist.manager_index)
                .map(|m| m.name.clone())
                .unwrap_or_default();
            self.notice = Some(format!("{name} ran out of time: pick forfeited"));
            self.dispatch_pick(effects);
        }
    }

    pub fn handle_outcome(&mut self, outcome: BackendOutcome) {
        match outcome {
            BackendOutcome::PickPersisted {
                player_id,
                result: Ok(()),
            } => {
                debug!("Pick of {player_id} saved");
            }
            BackendOutcome::PickPersisted {
                player_id,
                result: Err(e),
            } => {
                warn!("Pick of {player_id} was not saved: {e}");
                self.session.record_divergence();
                self.notice = Some(format!("Pick of {player_id} was not saved"));
            }
            BackendOutcome::UndoResolved(Ok(player)) => {
                self.notice = Some(format!("Undid {}", player.full_name()));
                self.session.finish_undo(player);
            }
            BackendOutcome::UndoResolved(Err(e)) => {
                self.session.abort_undo();
                self.notice = Some(format!("Undo failed: {e}"));
            }
            BackendOutcome::ExportSaved(Ok(path)) => {
                info!("Results saved to {}", path.display());
                self.notice = Some(format!("Results saved to {}", path.display()));
            }
            BackendOutcome::ExportSaved(Err(e)) => {
                warn!("Results export failed: {e}");
                self.notice = Some(format!("Results export failed: {e}"));
            }
            BackendOutcome::PlayerCreated {
                player_id,
                result: Ok(()),
            } => {
                debug!("Player {player_id} added to the pool");
            }
            BackendOutcome::PlayerCreated {
                player_id,
                result: Err(e),
            } => {
                warn!("Player {player_id} was not added to the pool: {e}");
                self.notice = Some(format!("New player {player_id} was not saved to the pool"));
            }
            BackendOutcome::StatsLoaded { player_id, result } => {
                // Results for a popup that was closed or replaced are dropped.
                let Some(panel) = self.stats.as_mut().filter(|p| p.player_id == player_id) else {
                    debug!("Discarding stats for {player_id}");
                    return;
                };
                match result {
                    Ok(table) => panel.table = Some(table),
                    Err(e) => panel.error = Some(e),
                }
            }
        }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let s = &self.session;
        BoardSnapshot {
            draft_name: s.name().to_string(),
            managers: s.managers().to_vec(),
            available: s.pool().to_vec(),
            current_manager: s.current_manager(),
            current_round: s.current_round(),
            rounds: s.rounds(),
            picks_made: s.picks_made(),
            total_picks: s.total_picks(),
            remaining_secs: s.timer().remaining(),
            paused: s.is_paused(),
            completed: s.is_complete(),
            undo_pending: s.undo_pending(),
            divergences: s.divergences(),
            notice: self.notice.clone(),
            stats: self.stats.clone(),
        }
    }

    // -- operations --------------------------------------------------------

    fn draft(&mut self, player_id: &str) {
        let Some(player) = self.session.find_available(player_id).cloned() else {
            self.notice = Some(format!("Player {player_id} is not available"));
            return;
        };
        match self.session.draft_player(player) {
            Ok(effects) => {
                self.notice = None;
                self.dispatch_pick(effects);
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    /// Draft a hand-made player for the team on the clock. The player is
    /// written to the pool before the pick is.
    fn create_and_draft(&mut self, new_player: NewPlayer) {
        if new_player.first_name.trim().is_empty() && new_player.last_name.trim().is_empty() {
            self.notice = Some("A new player needs a first or last name".to_string());
            return;
        }
        let player = Player::manual(
            format!("new-{}", Uuid::new_v4()),
            &new_player.first_name,
            &new_player.last_name,
            &new_player.team,
            &new_player.position_code,
        );

        let effects = match self.session.draft_player(player.clone()) {
            Ok(effects) => effects,
            Err(e) => {
                self.notice = Some(e.to_string());
                return;
            }
        };
        info!("Created {} ({}) for drafting", player.full_name(), player.id);

        let backend = self.backend.clone();
        let tx = self.outcome_tx.clone();
        self.enqueue(async move {
            let result = backend
                .create_player(&player)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string());
            let _ = tx
                .send(BackendOutcome::PlayerCreated {
                    player_id: player.id,
                    result,
                })
                .await;
        });

        self.notice = None;
        self.dispatch_pick(effects);
    }

    /// Open the stats popup for an available player and fetch the report in
    /// the background.
    fn show_stats(&mut self, player_id: &str) {
        let Some(player) = self.session.find_available(player_id).cloned() else {
            self.notice = Some(format!("Player {player_id} is not available"));
            return;
        };
        self.stats = Some(StatsPanel {
            player_id: player.id.clone(),
            player_name: player.full_name(),
            table: None,
            error: None,
        });

        let backend = self.backend.clone();
        let tx = self.outcome_tx.clone();
        let goalie = player.is_goalie();
        tokio::spawn(async move {
            let result = backend
                .player_stats(&player.id, &player.position_code)
                .await
                .map(|report| StatsTable::from_report(&report, goalie))
                .map_err(|e| e.to_string());
            let _ = tx
                .send(BackendOutcome::StatsLoaded {
                    player_id: player.id,
                    result,
                })
                .await;
        });
    }

    fn undo(&mut self) {
        let Some(request) = self.session.begin_undo() else {
            debug!("Nothing to undo");
            return;
        };

        let backend = self.backend.clone();
        let tx = self.outcome_tx.clone();
        let draft_id = self.session.draft_id().to_string();
        self.enqueue(async move {
            let result = backend
                .undraft(&draft_id, &request)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(BackendOutcome::UndoResolved(result)).await;
        });
    }

    /// Write a pick in the background. The last pick also marks the draft
    /// complete and saves the export, after the pick write has finished.
    fn dispatch_pick(&mut self, effects: PickEffects) {
        let complete = effects.complete && !self.export_requested;
        if complete {
            self.export_requested = true;
        }

        let backend = self.backend.clone();
        let tx = self.outcome_tx.clone();
        let draft_id = self.session.draft_id().to_string();
        let name = self.session.name().to_string();
        let export_dir = self.export_dir.clone();
        let request = effects.persist;

        self.enqueue(async move {
            let player_id = request.player.id.clone();
            let result = backend
                .draft_pick(&draft_id, &request)
                .await
                .map_err(|e| e.to_string());
            let _ = tx
                .send(BackendOutcome::PickPersisted { player_id, result })
                .await;

            if complete {
                let saved = save_export(backend.as_ref(), &draft_id, &name, &export_dir).await;
                let _ = tx.send(BackendOutcome::ExportSaved(saved)).await;
            }
        });
    }

    fn request_completion(&mut self) {
        if self.export_requested {
            return;
        }
        self.export_requested = true;

        let backend = self.backend.clone();
        let tx = self.outcome_tx.clone();
        let draft_id = self.session.draft_id().to_string();
        let name = self.session.name().to_string();
        let export_dir = self.export_dir.clone();
        self.enqueue(async move {
            let saved = save_export(backend.as_ref(), &draft_id, &name, &export_dir).await;
            let _ = tx.send(BackendOutcome::ExportSaved(saved)).await;
        });
    }

    /// Spawn `job` after every previously queued write has finished.
    fn enqueue<F>(&mut self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let previous = self.write_chain.take();
        self.write_chain = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            job.await;
        }));
    }

    /// Wait (bounded) for queued writes to finish. Outcomes keep being
    /// consumed meanwhile so no write stalls on a full channel.
    async fn drain(&mut self, outcome_rx: &mut mpsc::Receiver<BackendOutcome>) {
        if let Some(mut pending) = self.write_chain.take() {
            if !pending.is_finished() {
                info!("Waiting for queued backend writes to finish");
            }
            let deadline = tokio::time::sleep(DRAIN_TIMEOUT);
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    _ = &mut pending => break,
                    Some(outcome) = outcome_rx.recv() => self.handle_outcome(outcome),
                    _ = &mut deadline => {
                        warn!("Gave up waiting for backend writes after {DRAIN_TIMEOUT:?}");
                        break;
                    }
                }
            }
        }
        while let Ok(outcome) = outcome_rx.try_recv() {
            self.handle_outcome(outcome);
        }
    }
}

/// Mark the draft complete and write the returned export under `dir`.
async fn save_export<B: DraftBackend>(
    backend: &B,
    draft_id: &str,
    name: &str,
    dir: &Path,
) -> Result<PathBuf, String> {
    let text = backend.complete(draft_id).await.map_err(|e| e.to_string())?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| format!("cannot create {}: {e}", dir.display()))?;
    let path = dir.join(results_file_name(name, draft_id));
    tokio::fs::write(&path, text)
        .await
        .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the board until the user quits or the TUI goes away.
pub async fn run<B: DraftBackend>(
    mut app: BoardApp<B>,
    mut outcome_rx: mpsc::Receiver<BackendOutcome>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
) -> anyhow::Result<()> {
    info!("Board event loop started for draft {}", app.session.draft_id());

    let mut clock = tokio::time::interval(CLOCK_TICK);
    clock.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    clock.tick().await;

    let _ = ui_tx
        .send(UiUpdate::Snapshot(Box::new(app.snapshot())))
        .await;

    loop {
        tokio::select! {
            command = cmd_rx.recv() => {
                match command {
                    Some(command) => {
                        if !app.handle_command(command) {
                            info!("Quit requested");
                            break;
                        }
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            Some(outcome) = outcome_rx.recv() => {
                app.handle_outcome(outcome);
            }

            _ = clock.tick() => {
                app.handle_tick(CLOCK_TICK.as_secs() as i64);
            }
        }

        if ui_tx
            .send(UiUpdate::Snapshot(Box::new(app.snapshot())))
            .await
            .is_err()
        {
            break;
        }
    }

    app.drain(&mut outcome_rx).await;
    if app.session.divergences() > 0 {
        warn!(
            "{} pick(s) may be missing on the server",
            app.session.divergences()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
