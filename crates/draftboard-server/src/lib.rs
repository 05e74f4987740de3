// Library root: the draft service's store, provider client, and HTTP routes,
// exposed so integration tests can run the real router.

pub mod api;
pub mod db;
pub mod nhl;

use tracing::info;

use draftboard_core::config::ProviderConfig;

use crate::db::{Database, StoreError};
use crate::nhl::NhlClient;

/// Fill an empty player pool from the configured team rosters.
///
/// Returns the number of players written; zero when the pool already had
/// players or seeding is switched off.
pub async fn seed_player_pool(
    db: &Database,
    nhl: &NhlClient,
    provider: &ProviderConfig,
) -> Result<usize, StoreError> {
    if !provider.seed_on_startup {
        return Ok(0);
    }
    let existing = db.player_count()?;
    if existing > 0 {
        info!("Player pool already holds {existing} players; skipping seed");
        return Ok(0);
    }

    let players = nhl.fetch_all_players(&provider.teams, &provider.season).await;
    let written = db.upsert_players(&players)?;
    info!("Seeded player pool with {written} players for season {}", provider.season);
    Ok(written)
}
