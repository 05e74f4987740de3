// Draft service entry point.
//
// Startup sequence:
// 1. Initialize tracing (stdout)
// 2. Load config
// 3. Open database (fatal on failure)
// 4. Build the NHL client and seed the player pool if it is empty
// 5. Bind and serve the HTTP API until Ctrl+C

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use draftboard_core::config;
use draftboard_server::api::{self, ApiState};
use draftboard_server::db::Database;
use draftboard_server::nhl::NhlClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Draft service starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {} rounds, {}s per pick, season {}",
        config.draft.rounds, config.draft.pick_seconds, config.provider.season
    );

    // 3. Open database
    let db = Database::open(&config.database.path)
        .with_context(|| format!("failed to open database at {}", config.database.path))?;
    info!("Database opened at {}", config.database.path);

    // 4. Provider client and pool seeding
    let nhl = NhlClient::new(&config.provider).context("failed to build NHL client")?;
    if let Err(e) = draftboard_server::seed_player_pool(&db, &nhl, &config.provider).await {
        warn!("Player pool seeding failed: {e}");
    }

    let state = ApiState {
        db: Arc::new(db),
        nhl: Arc::new(nhl),
    };

    // 5. Serve
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Draft service shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {e}");
    }
}

/// Initialize tracing to stdout.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("draftboard_server=info,warn")),
        )
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
