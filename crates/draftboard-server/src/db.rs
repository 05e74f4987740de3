// SQLite document store for the player pool and drafts.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use uuid::Uuid;

use draftboard_core::model::{Draft, Manager, Pick, Player};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("draft {0} not found")]
    DraftNotFound(String),

    #[error("draft {draft_id} has no manager at index {index}")]
    ManagerNotFound { draft_id: String, index: usize },

    #[error("manager {index} has no matching pick")]
    PickNotFound { index: usize },

    #[error("manager {index} already has a pick in slot {slot}")]
    SlotTaken { index: usize, slot: usize },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::DraftNotFound(_)
                | StoreError::ManagerNotFound { .. }
                | StoreError::PickNotFound { .. }
        )
    }
}

/// Two document collections: `players` (the cached pool) and `drafts`.
/// Each row carries the full JSON document; drafts also get a row number
/// that is accepted wherever a draft id is.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the store at `path`. Pass `":memory:"` for an
    /// ephemeral database.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                id  TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS drafts (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id  TEXT NOT NULL UNIQUE,
                doc TEXT NOT NULL
            );
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Every pooled player in insertion order.
    pub fn list_players(&self) -> Result<Vec<Player>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT doc FROM players ORDER BY rowid")?;
        let docs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        docs.iter()
            .map(|doc| serde_json::from_str(doc).map_err(StoreError::from))
            .collect()
    }

    pub fn find_player(&self, id: &str) -> Result<Option<Player>, StoreError> {
        let conn = self.conn();
        let doc: Option<String> = conn
            .query_row("SELECT doc FROM players WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        doc.map(|d| serde_json::from_str(&d).map_err(StoreError::from))
            .transpose()
    }

    pub fn player_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Insert or replace players by id in one transaction. Returns the
    /// number written.
    pub fn upsert_players(&self, players: &[Player]) -> Result<usize, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for player in players {
            let doc = serde_json::to_string(player)?;
            tx.execute(
                "INSERT INTO players (id, doc) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET doc = excluded.doc",
                params![player.id, doc],
            )?;
        }
        tx.commit()?;
        Ok(players.len())
    }

    // ------------------------------------------------------------------
    // Drafts
    // ------------------------------------------------------------------

    pub fn list_drafts(&self) -> Result<Vec<Draft>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT doc FROM drafts ORDER BY seq")?;
        let docs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        docs.iter()
            .map(|doc| serde_json::from_str(doc).map_err(StoreError::from))
            .collect()
    }

    /// Fetch a draft by id, falling back to its row number.
    pub fn get_draft(&self, key: &str) -> Result<Draft, StoreError> {
        let (_, draft) = load_draft(&self.conn(), key)?;
        Ok(draft)
    }

    /// Create an empty draft with a fresh UUID.
    pub fn create_draft(&self, name: &str, managers: &[String]) -> Result<Draft, StoreError> {
        let draft = Draft::new(Uuid::new_v4().to_string(), name, managers);
        let doc = serde_json::to_string(&draft)?;
        self.conn().execute(
            "INSERT INTO drafts (id, doc) VALUES (?1, ?2)",
            params![draft.id, doc],
        )?;
        Ok(draft)
    }

    pub fn delete_draft(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let (seq, _) = load_draft(&tx, key)?;
        tx.execute("DELETE FROM drafts WHERE seq = ?1", params![seq])?;
        tx.commit()?;
        Ok(())
    }

    /// Append a pick to one manager's array. Returns the updated draft.
    ///
    /// A slotted pick is refused when the manager already holds that slot.
    pub fn append_pick(
        &self,
        key: &str,
        manager_index: usize,
        player: Player,
        pick_index: Option<usize>,
    ) -> Result<Draft, StoreError> {
        self.update_draft(key, |draft| {
            let manager = manager_mut(draft, manager_index)?;
            if let Some(slot) = pick_index {
                if manager.picks.iter().any(|p| p.pick == Some(slot)) {
                    return Err(StoreError::SlotTaken {
                        index: manager_index,
                        slot,
                    });
                }
            }
            manager.picks.push(Pick {
                player,
                pick: pick_index,
            });
            Ok(())
        })
    }

    /// Remove one pick from a manager and return the removed player.
    ///
    /// The pick is matched by player id (preferring one in `pick_index`'s
    /// slot), otherwise by slot, otherwise the manager's last pick is taken.
    pub fn remove_pick(
        &self,
        key: &str,
        manager_index: usize,
        pick_index: Option<usize>,
        player_id: Option<&str>,
    ) -> Result<Player, StoreError> {
        let mut removed = None;
        self.update_draft(key, |draft| {
            let manager = manager_mut(draft, manager_index)?;
            let picks = &manager.picks;
            let idx = match (player_id, pick_index) {
                (Some(id), slot) => picks
                    .iter()
                    .rposition(|p| p.player.id == id && slot.is_none_or(|s| p.pick == Some(s)))
                    .or_else(|| picks.iter().rposition(|p| p.player.id == id)),
                (None, Some(slot)) => picks.iter().rposition(|p| p.pick == Some(slot)),
                (None, None) => picks.len().checked_sub(1),
            }
            .ok_or(StoreError::PickNotFound {
                index: manager_index,
            })?;
            removed = Some(manager.picks.remove(idx).player);
            Ok(())
        })?;
        removed.ok_or(StoreError::PickNotFound {
            index: manager_index,
        })
    }

    /// Flag a draft completed. Idempotent.
    pub fn mark_completed(&self, key: &str) -> Result<Draft, StoreError> {
        self.update_draft(key, |draft| {
            draft.completed = true;
            Ok(())
        })
    }

    /// Read-modify-write of one draft document inside a transaction.
    fn update_draft<F>(&self, key: &str, apply: F) -> Result<Draft, StoreError>
    where
        F: FnOnce(&mut Draft) -> Result<(), StoreError>,
    {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let (seq, mut draft) = load_draft(&tx, key)?;
        apply(&mut draft)?;
        let doc = serde_json::to_string(&draft)?;
        tx.execute("UPDATE drafts SET doc = ?1 WHERE seq = ?2", params![doc, seq])?;
        tx.commit()?;
        Ok(draft)
    }
}

fn load_draft(conn: &Connection, key: &str) -> Result<(i64, Draft), StoreError> {
    let seq_key: Option<i64> = key.parse().ok();
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT seq, doc FROM drafts WHERE id = ?1 OR seq = ?2
             ORDER BY (id = ?1) DESC LIMIT 1",
            params![key, seq_key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (seq, doc) = row.ok_or_else(|| StoreError::DraftNotFound(key.to_string()))?;
    Ok((seq, serde_json::from_str(&doc)?))
}

fn manager_mut(draft: &mut Draft, index: usize) -> Result<&mut Manager, StoreError> {
    let draft_id = draft.id.clone();
    draft
        .managers
        .get_mut(index)
        .ok_or(StoreError::ManagerNotFound { draft_id, index })
}
