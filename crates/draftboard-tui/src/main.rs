// Draft board client entry point.
//
// `board` startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Load the draft and player pool from the draft service
// 4. Create mpsc channels
// 5. Spawn the app task
// 6. Run the TUI until the user quits
// 7. Wait for the app task to flush in-flight writes

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info};

use draftboard_core::config::{self, Config};
use draftboard_tui::app::{self, BoardApp};
use draftboard_tui::client::{DraftBackend, HttpBackend};
use draftboard_tui::tui;

/// Minimum number of teams in a draft.
const MIN_TEAMS: usize = 2;

#[derive(Parser)]
#[command(name = "draftboard")]
#[command(about = "Snake-draft board for fantasy hockey", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List drafts that are still open
    List,

    /// Create a draft; teams pick in the order given
    Create {
        /// Draft name
        #[arg(long)]
        name: String,

        /// Team (manager) name; repeat for each team
        #[arg(long = "team", required = true)]
        teams: Vec<String>,
    },

    /// Delete a draft
    Delete {
        /// Draft id (or row number)
        id: String,
    },

    /// Run the interactive board for a draft
    Board {
        /// Draft id (or row number)
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize tracing
    init_tracing()?;

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    let backend = HttpBackend::new(
        &config.client.server_url,
        Duration::from_secs(config.provider.timeout_secs),
    )
    .context("failed to build HTTP client")?;

    match cli.command {
        Commands::List => list(&backend).await,
        Commands::Create { name, teams } => create(&backend, &name, &teams).await,
        Commands::Delete { id } => {
            backend
                .delete_draft(&id)
                .await
                .with_context(|| format!("failed to delete draft {id}"))?;
            println!("Deleted draft {id}");
            Ok(())
        }
        Commands::Board { id } => board(config, backend, &id).await,
    }
}

async fn list(backend: &HttpBackend) -> anyhow::Result<()> {
    let drafts = backend.list_drafts().await.context("failed to list drafts")?;
    let open: Vec<_> = drafts.iter().filter(|d| !d.completed).collect();
    if open.is_empty() {
        println!("No open drafts");
    }
    for draft in open {
        let teams: Vec<&str> = draft.managers.iter().map(|m| m.name.as_str()).collect();
        println!(
            "{}  {}  ({} picks)  {}",
            draft.id,
            draft.name,
            draft.total_picks(),
            teams.join(", ")
        );
    }
    Ok(())
}

async fn create(backend: &HttpBackend, name: &str, teams: &[String]) -> anyhow::Result<()> {
    if teams.len() < MIN_TEAMS {
        bail!("a draft needs at least {MIN_TEAMS} teams, got {}", teams.len());
    }
    let draft = backend
        .create_draft(name, teams)
        .await
        .context("failed to create draft")?;
    info!("Created draft {} ({})", draft.name, draft.id);
    println!("{}", draft.id);
    Ok(())
}

async fn board(config: Config, backend: HttpBackend, draft_id: &str) -> anyhow::Result<()> {
    // 3. Load draft and pool
    let (app_state, outcome_rx) = BoardApp::load(
        Arc::new(backend),
        draft_id,
        config.draft.session_settings(),
        PathBuf::from(&config.client.export_dir),
    )
    .await?;
    info!("Board ready for draft {draft_id}");

    // 4. Channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 5. App task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(app_state, outcome_rx, cmd_rx, ui_tx).await {
            error!("Board loop error: {e}");
        }
    });

    // 6. TUI (blocks until quit)
    let tui_result = tui::run(ui_rx, cmd_tx).await;
    if let Err(e) = &tui_result {
        error!("TUI error: {e}");
    }

    // 7. The app task exits once the command channel closes.
    let _ = tokio::time::timeout(Duration::from_secs(10), app_handle).await;

    info!("Board closed");
    tui_result
}

/// Initialize tracing to log to a file (the terminal belongs to the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draftboard.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("draftboard_tui=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
