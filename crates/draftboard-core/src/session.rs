// Draft session: the pick sequencer.
//
// One `DraftSession` owns everything a client needs to run a draft: the
// available pool, every manager's picks, the pick counter, the clock, and the
// pause flag. All mutation goes through `draft_player`, `begin_undo` /
// `finish_undo`, `tick`, and `toggle_pause`. Network effects are returned to
// the caller as plain data; the session never performs I/O.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{Draft, Manager, Pick, Player};
use crate::protocol::{DraftPickRequest, UndraftRequest};
use crate::timer::PickTimer;
use crate::turn;

// ---------------------------------------------------------------------------
// Settings / errors / effects
// ---------------------------------------------------------------------------

/// Draft-wide rules for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub rounds: usize,
    pub pick_seconds: i64,
    pub grace_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("draft has no managers")]
    NoManagers,

    #[error("draft is already complete")]
    Completed,

    #[error("an undo is still waiting for the server")]
    UndoPending,
}

/// What the caller must send to the draft service after a pick.
#[derive(Debug, Clone, PartialEq)]
pub struct PickEffects {
    /// Append this pick to the manager's array (fire-and-forget).
    pub persist: DraftPickRequest,
    /// This was the last pick: mark the draft complete and fetch the export.
    pub complete: bool,
}

/// Result of one clock tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub remaining: i64,
    /// Set when the clock ran out and a forfeit pick was recorded.
    pub forfeit: Option<PickEffects>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingUndo {
    manager_index: usize,
    picks_made: usize,
}

// ---------------------------------------------------------------------------
// DraftSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DraftSession {
    draft_id: String,
    name: String,
    managers: Vec<Manager>,
    /// Undrafted players, kept sorted by display name.
    pool: Vec<Player>,
    picks_made: usize,
    rounds: usize,
    timer: PickTimer,
    completed: bool,
    /// `picks_made` value for which a forfeit has already fired.
    last_forfeit: Option<usize>,
    pending_undo: Option<PendingUndo>,
    /// Pick writes that failed after the local state had already moved on.
    divergences: usize,
}

impl DraftSession {
    /// Start a session from a stored draft and the full player pool.
    ///
    /// The pick counter is seeded from the picks already on the rosters, and
    /// every drafted player is removed from the pool. Duplicate pool entries
    /// (same id) are collapsed.
    pub fn from_draft(
        draft: Draft,
        players: Vec<Player>,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        if draft.managers.is_empty() {
            return Err(SessionError::NoManagers);
        }

        let mut pool: Vec<Player> = Vec::with_capacity(players.len());
        for player in players {
            if player.is_forfeit() || draft.is_drafted(&player.id) {
                continue;
            }
            if pool.iter().any(|p| p.id == player.id) {
                continue;
            }
            pool.push(player);
        }
        pool.sort_by_key(pool_key);

        let picks_made = draft.total_picks();
        let total = turn::total_picks(settings.rounds, draft.managers.len());
        let completed = draft.completed || picks_made >= total;

        let mut timer = PickTimer::new(settings.pick_seconds, settings.grace_seconds);
        if completed {
            timer.freeze();
        }

        info!(
            "Session for draft {} loaded: {} managers, {}/{} picks, {} players available",
            draft.id,
            draft.managers.len(),
            picks_made,
            total,
            pool.len()
        );

        Ok(DraftSession {
            draft_id: draft.id,
            name: draft.name,
            managers: draft.managers,
            pool,
            picks_made,
            rounds: settings.rounds,
            timer,
            completed,
            last_forfeit: None,
            pending_undo: None,
            divergences: 0,
        })
    }

    // -- accessors ---------------------------------------------------------

    pub fn draft_id(&self) -> &str {
        &self.draft_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn managers(&self) -> &[Manager] {
        &self.managers
    }

    pub fn pool(&self) -> &[Player] {
        &self.pool
    }

    pub fn picks_made(&self) -> usize {
        self.picks_made
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn total_picks(&self) -> usize {
        turn::total_picks(self.rounds, self.managers.len())
    }

    pub fn timer(&self) -> &PickTimer {
        &self.timer
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn is_paused(&self) -> bool {
        self.timer.is_paused()
    }

    pub fn undo_pending(&self) -> bool {
        self.pending_undo.is_some()
    }

    pub fn divergences(&self) -> usize {
        self.divergences
    }

    /// Manager on the clock.
    pub fn current_manager(&self) -> usize {
        turn::turn_index(self.picks_made, self.managers.len())
    }

    /// 0-based round of the next pick.
    pub fn current_round(&self) -> usize {
        turn::round_of(self.picks_made, self.managers.len())
    }

    /// Look up an available player by id.
    pub fn find_available(&self, player_id: &str) -> Option<&Player> {
        self.pool.iter().find(|p| p.id == player_id)
    }

    /// Available players whose first or last name contains `query`
    /// (case-insensitive), in display order.
    pub fn search(&self, query: &str) -> Vec<&Player> {
        self.pool.iter().filter(|p| p.name_matches(query)).collect()
    }

    // -- pick --------------------------------------------------------------

    /// Draft `player` for the manager on the clock.
    ///
    /// Local state changes immediately; the returned effects describe the
    /// store write (and, on the last pick, the completion request) for the
    /// caller to dispatch.
    pub fn draft_player(&mut self, player: Player) -> Result<PickEffects, SessionError> {
        if self.completed {
            return Err(SessionError::Completed);
        }
        if self.pending_undo.is_some() {
            return Err(SessionError::UndoPending);
        }

        let manager_index = self.current_manager();
        let round = self.current_round();

        self.pool.retain(|p| p.id != player.id);
        self.managers[manager_index]
            .picks
            .push(Pick::new(player.clone(), round));

        self.picks_made += 1;
        self.timer.reset();

        info!(
            "Pick {}/{}: {} -> {} (round {})",
            self.picks_made,
            self.total_picks(),
            player.full_name(),
            self.managers[manager_index].name,
            round + 1
        );

        let complete = self.picks_made >= self.total_picks();
        if complete {
            self.completed = true;
            self.timer.freeze();
            info!("Draft {} complete after {} picks", self.draft_id, self.picks_made);
        }

        Ok(PickEffects {
            persist: DraftPickRequest {
                manager_index,
                player,
                pick_index: Some(round),
            },
            complete,
        })
    }

    // -- undo --------------------------------------------------------------

    /// Start undoing the most recent pick.
    ///
    /// Returns the store request to send, or `None` when there is nothing to
    /// undo (no picks, draft complete, or an undo already in flight). Local
    /// state is not touched until `finish_undo`.
    pub fn begin_undo(&mut self) -> Option<UndraftRequest> {
        if self.picks_made == 0 || self.completed || self.pending_undo.is_some() {
            return None;
        }

        let manager_index = turn::turn_index(self.picks_made - 1, self.managers.len());
        let last = self.managers[manager_index].picks.last();
        let request = UndraftRequest {
            manager_index,
            pick_index: last.and_then(|p| p.pick),
            player_id: last.map(|p| p.player.id.clone()),
        };

        self.pending_undo = Some(PendingUndo {
            manager_index,
            picks_made: self.picks_made,
        });
        debug!(?request, "Undo requested");
        Some(request)
    }

    /// Apply a confirmed removal: splice the pick out, return the player to
    /// the pool (never the forfeit player), and step the counter back. The
    /// clock is left alone.
    pub fn finish_undo(&mut self, removed: Player) {
        let Some(pending) = self.pending_undo.take() else {
            warn!("Undo confirmation for {} with no undo in flight", removed.id);
            return;
        };

        let picks = &mut self.managers[pending.manager_index].picks;
        match picks.iter().rposition(|p| p.player.id == removed.id) {
            Some(idx) => {
                picks.remove(idx);
            }
            None => {
                picks.pop();
            }
        }

        if !removed.is_forfeit() && !self.pool.iter().any(|p| p.id == removed.id) {
            let key = pool_key(&removed);
            let idx = self.pool.partition_point(|p| pool_key(p) < key);
            self.pool.insert(idx, removed.clone());
        }

        self.picks_made = pending.picks_made.saturating_sub(1);
        info!(
            "Undid pick {}: {} removed from {}",
            pending.picks_made,
            removed.full_name(),
            self.managers[pending.manager_index].name
        );
    }

    /// The store refused the removal: drop the in-flight undo, change nothing.
    pub fn abort_undo(&mut self) {
        if self.pending_undo.take().is_some() {
            warn!("Undo rejected by the draft service; local state unchanged");
        }
    }

    // -- clock -------------------------------------------------------------

    /// Advance the clock by `delta_secs`. When the grace period runs out the
    /// team on the clock forfeits its pick, once per pick index.
    pub fn tick(&mut self, delta_secs: i64) -> TickOutcome {
        if self.completed {
            return TickOutcome {
                remaining: self.timer.remaining(),
                forfeit: None,
            };
        }

        let tick = self.timer.advance(delta_secs);
        let already_forfeited = self.last_forfeit == Some(self.picks_made);
        if !tick.forfeit_now || already_forfeited || self.pending_undo.is_some() {
            return TickOutcome {
                remaining: tick.remaining,
                forfeit: None,
            };
        }

        self.last_forfeit = Some(self.picks_made);
        warn!(
            "{} ran out of time on pick {}; recording a forfeit",
            self.managers[self.current_manager()].name,
            self.picks_made + 1
        );
        let forfeit = self.draft_player(Player::forfeit()).ok();
        TickOutcome {
            remaining: self.timer.remaining(),
            forfeit,
        }
    }

    /// Pause or resume the clock. Returns the new paused state.
    pub fn toggle_pause(&mut self) -> bool {
        if self.completed {
            return true;
        }
        self.timer.toggle_pause()
    }

    /// Note a pick write that failed after the local update.
    pub fn record_divergence(&mut self) {
        self.divergences += 1;
    }
}

fn pool_key(player: &Player) -> (String, String) {
    (player.full_name().to_lowercase(), player.id.clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LocalizedName;

    fn player(id: &str, first: &str, last: &str) -> Player {
        Player {
            id: id.to_string(),
            first_name: LocalizedName::new(first),
            last_name: LocalizedName::new(last),
            team: "EDM".to_string(),
            position_code: "C".to_string(),
            headshot: None,
            emoji: None,
            sweater_number: None,
        }
    }

    fn pool() -> Vec<Player> {
        vec![
            player("1", "Connor", "McDavid"),
            player("2", "Leon", "Draisaitl"),
            player("3", "Nathan", "MacKinnon"),
            player("4", "Auston", "Matthews"),
            player("5", "Cale", "Makar"),
            player("6", "Igor", "Shesterkin"),
        ]
    }

    fn settings(rounds: usize) -> SessionSettings {
        SessionSettings {
            rounds,
            pick_seconds: 90,
            grace_seconds: 30,
        }
    }

    fn session(managers: usize, rounds: usize) -> DraftSession {
        let names: Vec<String> = (1..=managers).map(|i| format!("Team {i}")).collect();
        let draft = Draft::new("draft-1", "Test Draft", &names);
        DraftSession::from_draft(draft, pool(), settings(rounds)).unwrap()
    }

    fn pool_ids(session: &DraftSession) -> Vec<String> {
        session.pool().iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn scenario_a_single_pick_advances_cursor_and_resets_clock() {
        let mut s = session(2, 1);
        for _ in 0..10 {
            assert!(s.tick(1).forfeit.is_none());
        }
        assert_eq!(s.timer().remaining(), 80);

        let mcdavid = s.find_available("1").cloned().unwrap();
        let effects = s.draft_player(mcdavid).unwrap();

        assert_eq!(effects.persist.manager_index, 0);
        assert_eq!(effects.persist.pick_index, Some(0));
        assert!(!effects.complete);
        assert_eq!(s.picks_made(), 1);
        assert_eq!(s.current_manager(), 1);
        assert_eq!(s.timer().remaining(), 90);
        assert!(s.find_available("1").is_none());
    }

    #[test]
    fn scenario_b_completion_requested_once() {
        let mut s = session(2, 2);
        let mut completions = 0;
        for id in ["1", "2", "3", "4"] {
            let p = s.find_available(id).cloned().unwrap();
            if s.draft_player(p).unwrap().complete {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
        assert!(s.is_complete());
        assert_eq!(s.timer().remaining(), 0);

        let next = s.find_available("5").cloned().unwrap();
        assert_eq!(s.draft_player(next), Err(SessionError::Completed));
        assert_eq!(s.picks_made(), 4);
    }

    #[test]
    fn snake_assignment_across_rounds() {
        let mut s = session(2, 2);
        let mut managers = Vec::new();
        for id in ["1", "2", "3", "4"] {
            let p = s.find_available(id).cloned().unwrap();
            managers.push(s.draft_player(p).unwrap().persist.manager_index);
        }
        assert_eq!(managers, vec![0, 1, 1, 0]);
        assert_eq!(s.managers()[1].picks[1].pick, Some(1));
    }

    #[test]
    fn scenario_c_forfeit_fires_once_and_never_returns_to_pool() {
        let mut s = session(2, 3);
        let before = pool_ids(&s);

        let mut forfeits = Vec::new();
        for _ in 0..200 {
            if let Some(effects) = s.tick(1).forfeit {
                forfeits.push(effects);
            }
            if !forfeits.is_empty() {
                break;
            }
        }
        assert_eq!(forfeits.len(), 1);
        let forfeit = &forfeits[0];
        assert_eq!(forfeit.persist.manager_index, 0);
        assert!(forfeit.persist.player.is_forfeit());
        assert_eq!(s.picks_made(), 1);
        assert_eq!(s.timer().remaining(), 90);

        let request = s.begin_undo().unwrap();
        assert_eq!(request.manager_index, 0);
        assert_eq!(request.player_id.as_deref(), Some("forfeit"));
        s.finish_undo(Player::forfeit());

        assert_eq!(s.picks_made(), 0);
        assert_eq!(pool_ids(&s), before);
        assert!(s.managers()[0].picks.is_empty());
    }

    #[test]
    fn forfeit_guard_holds_after_undo_of_forfeit() {
        let mut s = session(2, 3);
        while s.tick(1).forfeit.is_none() {}
        s.begin_undo().unwrap();
        s.finish_undo(Player::forfeit());

        // The clock kept its reset value across the undo; run it out again.
        let mut fired = 0;
        for _ in 0..500 {
            if s.tick(1).forfeit.is_some() {
                fired += 1;
            }
        }
        assert_eq!(fired, 0);
        assert_eq!(s.picks_made(), 0);
    }

    #[test]
    fn paused_clock_never_forfeits() {
        let mut s = session(2, 1);
        assert!(s.toggle_pause());
        for _ in 0..500 {
            assert!(s.tick(1).forfeit.is_none());
        }
        assert_eq!(s.timer().remaining(), 90);
    }

    #[test]
    fn scenario_d_undo_with_no_picks_is_noop() {
        let mut s = session(2, 1);
        assert!(s.begin_undo().is_none());
        assert!(!s.undo_pending());
        assert_eq!(s.picks_made(), 0);
    }

    #[test]
    fn undo_restores_pre_pick_state() {
        let mut s = session(3, 2);
        let p = s.find_available("1").cloned().unwrap();
        s.draft_player(p).unwrap();

        let pool_before = pool_ids(&s);
        let picks_before = s.picks_made();
        let cursor_before = s.current_manager();

        let p = s.find_available("4").cloned().unwrap();
        s.draft_player(p.clone()).unwrap();
        assert_eq!(s.current_manager(), 2);

        let request = s.begin_undo().unwrap();
        assert_eq!(request.manager_index, 1);
        assert_eq!(request.pick_index, Some(0));
        assert_eq!(request.player_id.as_deref(), Some("4"));
        assert!(s.undo_pending());

        s.finish_undo(p);
        assert_eq!(s.picks_made(), picks_before);
        assert_eq!(s.current_manager(), cursor_before);
        assert_eq!(pool_ids(&s), pool_before);
        assert!(s.find_available("4").is_some());
        assert!(s.managers()[1].picks.is_empty());
    }

    #[test]
    fn undo_round_trip_restores_exact_pool_order() {
        let mut s = session(2, 2);
        let before = pool_ids(&s);
        let p = s.find_available("3").cloned().unwrap();
        s.draft_player(p.clone()).unwrap();
        s.begin_undo().unwrap();
        s.finish_undo(p);
        assert_eq!(pool_ids(&s), before);
    }

    #[test]
    fn rejected_undo_changes_nothing() {
        let mut s = session(2, 2);
        let p = s.find_available("2").cloned().unwrap();
        s.draft_player(p).unwrap();

        s.begin_undo().unwrap();
        s.abort_undo();

        assert!(!s.undo_pending());
        assert_eq!(s.picks_made(), 1);
        assert_eq!(s.managers()[0].picks.len(), 1);
        assert!(s.find_available("2").is_none());
    }

    #[test]
    fn picks_refused_while_undo_in_flight() {
        let mut s = session(2, 2);
        let p = s.find_available("2").cloned().unwrap();
        s.draft_player(p).unwrap();
        s.begin_undo().unwrap();

        let next = s.find_available("3").cloned().unwrap();
        assert_eq!(s.draft_player(next), Err(SessionError::UndoPending));
        assert!(s.begin_undo().is_none());
    }

    #[test]
    fn undo_does_not_touch_clock() {
        let mut s = session(2, 2);
        let p = s.find_available("2").cloned().unwrap();
        s.draft_player(p.clone()).unwrap();
        s.tick(25);
        s.toggle_pause();

        s.begin_undo().unwrap();
        s.finish_undo(p);
        assert_eq!(s.timer().remaining(), 65);
        assert!(s.is_paused());
    }

    #[test]
    fn undo_falls_back_to_last_pick_when_id_unknown() {
        let mut s = session(2, 2);
        let p = s.find_available("2").cloned().unwrap();
        s.draft_player(p).unwrap();
        s.begin_undo().unwrap();
        s.finish_undo(player("999", "Ghost", "Skater"));
        assert!(s.managers()[0].picks.is_empty());
        assert_eq!(s.picks_made(), 0);
    }

    #[test]
    fn drafting_an_absent_player_is_idempotent_on_pool() {
        let mut s = session(2, 2);
        let before = s.pool().len();
        s.draft_player(player("77", "Not", "Pooled")).unwrap();
        assert_eq!(s.pool().len(), before);
        assert_eq!(s.picks_made(), 1);
    }

    #[test]
    fn from_draft_seeds_counter_and_filters_pool() {
        let names = vec!["A".to_string(), "B".to_string()];
        let mut draft = Draft::new("d", "Seeded", &names);
        draft.managers[0].picks.push(Pick::new(player("1", "Connor", "McDavid"), 0));
        draft.managers[1].picks.push(Pick::new(player("2", "Leon", "Draisaitl"), 0));
        draft.managers[1].picks.push(Pick::new(player("3", "Nathan", "MacKinnon"), 1));

        let mut players = pool();
        players.push(player("4", "Auston", "Matthews"));
        players.push(Player::forfeit());

        let s = DraftSession::from_draft(draft, players, settings(4)).unwrap();
        assert_eq!(s.picks_made(), 3);
        assert_eq!(s.current_manager(), 0);
        assert_eq!(s.current_round(), 1);
        assert_eq!(pool_ids(&s), vec!["4", "5", "6"]);
    }

    #[test]
    fn from_draft_detects_finished_draft() {
        let names = vec!["A".to_string(), "B".to_string()];
        let mut draft = Draft::new("d", "Done", &names);
        draft.managers[0].picks.push(Pick::new(player("1", "Connor", "McDavid"), 0));
        draft.managers[1].picks.push(Pick::new(player("2", "Leon", "Draisaitl"), 0));

        let mut s = DraftSession::from_draft(draft, pool(), settings(1)).unwrap();
        assert!(s.is_complete());
        assert!(s.tick(500).forfeit.is_none());
        assert!(s.begin_undo().is_none());
    }

    #[test]
    fn from_draft_rejects_empty_manager_list() {
        let draft = Draft::new("d", "Empty", &[]);
        let err = DraftSession::from_draft(draft, pool(), settings(1)).unwrap_err();
        assert_eq!(err, SessionError::NoManagers);
    }

    #[test]
    fn search_matches_first_or_last_name() {
        let s = session(2, 2);
        let hits: Vec<&str> = s.search("ma").iter().map(|p| p.id.as_str()).collect();
        assert_eq!(hits, vec!["4", "5", "3"]);
        assert_eq!(s.search("").len(), 6);
        assert!(s.search("zzz").is_empty());
    }
}
