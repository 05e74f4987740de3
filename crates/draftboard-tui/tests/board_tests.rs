// End-to-end tests for the board client against the real draft service.
//
// The service router runs on an ephemeral port over an in-memory store; the
// board talks to it through `HttpBackend` exactly as the binary does. A small
// local app answers the service's stats lookups.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use draftboard_core::config::ProviderConfig;
use draftboard_core::model::{LocalizedName, Player};
use draftboard_core::session::SessionSettings;
use draftboard_server::api::{self, ApiState};
use draftboard_server::db::Database;
use draftboard_server::nhl::NhlClient;
use draftboard_tui::app::BoardApp;
use draftboard_tui::client::{BackendError, DraftBackend, HttpBackend};
use draftboard_tui::protocol::{BackendOutcome, NewPlayer, UserCommand};

// ===========================================================================
// Test helpers
// ===========================================================================

fn player(id: &str, first: &str, last: &str, pos: &str) -> Player {
    Player {
        id: id.to_string(),
        first_name: LocalizedName::new(first),
        last_name: LocalizedName::new(last),
        team: "TOR".to_string(),
        position_code: pos.to_string(),
        headshot: None,
        emoji: None,
        sweater_number: None,
    }
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Stats provider with one season row per report kind.
fn fake_stats() -> Router {
    async fn skater() -> Json<Value> {
        Json(json!({ "data": [{ "seasonId": 20242025, "gamesPlayed": 82, "goals": 33, "points": 85 }] }))
    }
    async fn goalie() -> Json<Value> {
        Json(json!({ "data": [{ "seasonId": 20242025, "gamesPlayed": 58, "wins": 31, "savePct": 0.9049 }] }))
    }
    Router::new()
        .route("/skater/summary", get(skater))
        .route("/goalie/summary", get(goalie))
}

async fn start_service() -> (HttpBackend, Arc<Database>) {
    let db = Arc::new(Database::open(":memory:").unwrap());
    db.upsert_players(&[
        player("1", "Auston", "Matthews", "C"),
        player("2", "Mitch", "Marner", "R"),
        player("3", "William", "Nylander", "R"),
        player("4", "Morgan", "Rielly", "D"),
        player("5", "Anthony", "Stolarz", "G"),
    ])
    .unwrap();

    let stats_url = spawn(fake_stats()).await;
    let provider = ProviderConfig {
        roster_base_url: "http://127.0.0.1:9".to_string(),
        stats_base_url: stats_url,
        season: "20242025".to_string(),
        teams: vec![],
        seed_on_startup: false,
        timeout_secs: 2,
    };
    let state = ApiState {
        db: db.clone(),
        nhl: Arc::new(NhlClient::new(&provider).unwrap()),
    };

    let url = spawn(api::router(state)).await;
    let backend = HttpBackend::new(&url, Duration::from_secs(5)).unwrap();
    (backend, db)
}

fn settings(rounds: usize) -> SessionSettings {
    SessionSettings {
        rounds,
        pick_seconds: 90,
        grace_seconds: 30,
    }
}

fn export_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn teams() -> Vec<String> {
    vec!["Leafs Fan".to_string(), "Habs Fan".to_string()]
}

async fn next(rx: &mut mpsc::Receiver<BackendOutcome>) -> BackendOutcome {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("backend outcome timed out")
        .expect("outcome channel closed")
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn picks_and_undo_reach_the_store() {
    let (backend, db) = start_service().await;
    let draft = backend.create_draft("Toronto Pool", &teams()).await.unwrap();
    let backend = Arc::new(backend);

    let (mut app, mut rx) = BoardApp::load(
        backend.clone(),
        &draft.id,
        settings(2),
        export_dir("draftboard_board_undo"),
    )
    .await
    .unwrap();
    assert_eq!(app.session().pool().len(), 5);

    app.handle_command(UserCommand::Draft {
        player_id: "2".to_string(),
    });
    let outcome = next(&mut rx).await;
    app.handle_outcome(outcome);
    assert_eq!(app.session().divergences(), 0);

    let stored = db.get_draft(&draft.id).unwrap();
    assert_eq!(stored.managers[0].picks.len(), 1);
    assert_eq!(stored.managers[0].picks[0].player.id, "2");
    assert_eq!(stored.managers[0].picks[0].pick, Some(0));

    app.handle_command(UserCommand::Undo);
    let outcome = next(&mut rx).await;
    app.handle_outcome(outcome);

    assert_eq!(app.session().picks_made(), 0);
    assert!(app.session().find_available("2").is_some());
    assert_eq!(db.get_draft(&draft.id).unwrap().total_picks(), 0);
}

#[tokio::test]
async fn finishing_the_draft_marks_it_complete_and_saves_results() {
    let (backend, db) = start_service().await;
    let draft = backend.create_draft("Toronto Pool", &teams()).await.unwrap();
    let dir = export_dir("draftboard_board_complete");

    let (mut app, mut rx) = BoardApp::load(Arc::new(backend), &draft.id, settings(1), dir.clone())
        .await
        .unwrap();

    for id in ["1", "4"] {
        app.handle_command(UserCommand::Draft {
            player_id: id.to_string(),
        });
    }
    assert!(app.session().is_complete());

    let mut saved = None;
    while saved.is_none() {
        match next(&mut rx).await {
            BackendOutcome::ExportSaved(result) => saved = Some(result.unwrap()),
            other => app.handle_outcome(other),
        }
    }
    assert_eq!(app.session().divergences(), 0);

    let path = saved.unwrap();
    assert_eq!(path, dir.join("toronto-pool-results.txt"));
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("Toronto Pool\n"));
    assert!(text.contains("Auston Matthews"));
    assert!(text.contains("Morgan Rielly"));

    let stored = db.get_draft(&draft.id).unwrap();
    assert!(stored.completed);
    assert_eq!(stored.total_picks(), 2);
}

#[tokio::test]
async fn reload_resumes_turn_order_from_store() {
    let (backend, _db) = start_service().await;
    let draft = backend.create_draft("Toronto Pool", &teams()).await.unwrap();
    let backend = Arc::new(backend);

    let (mut app, mut rx) = BoardApp::load(
        backend.clone(),
        &draft.id,
        settings(2),
        export_dir("draftboard_board_reload"),
    )
    .await
    .unwrap();
    for id in ["1", "2", "3"] {
        app.handle_command(UserCommand::Draft {
            player_id: id.to_string(),
        });
    }
    for _ in 0..3 {
        let outcome = next(&mut rx).await;
        app.handle_outcome(outcome);
    }

    let (reloaded, _rx) = BoardApp::load(
        backend,
        &draft.id,
        settings(2),
        export_dir("draftboard_board_reload"),
    )
    .await
    .unwrap();
    assert_eq!(reloaded.session().picks_made(), 3);
    assert_eq!(reloaded.session().current_manager(), 0);
    let pool: Vec<&str> = reloaded.session().pool().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(pool, vec!["5", "4"]);
}

#[tokio::test]
async fn missing_draft_surfaces_service_error() {
    let (backend, _db) = start_service().await;
    let err = backend.load_draft("does-not-exist").await.unwrap_err();
    match err {
        BackendError::Status { status, message } => {
            assert_eq!(status, 404);
            assert!(message.contains("not found"));
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn created_player_joins_the_pool_and_the_draft() {
    let (backend, db) = start_service().await;
    let draft = backend.create_draft("Toronto Pool", &teams()).await.unwrap();
    let (mut app, mut rx) = BoardApp::load(
        Arc::new(backend),
        &draft.id,
        settings(2),
        export_dir("draftboard_board_create"),
    )
    .await
    .unwrap();

    app.handle_command(UserCommand::CreateAndDraft(NewPlayer {
        first_name: "Easton".to_string(),
        last_name: "Cowan".to_string(),
        team: "tor".to_string(),
        position_code: "R".to_string(),
    }));
    for _ in 0..2 {
        let outcome = next(&mut rx).await;
        match &outcome {
            BackendOutcome::PlayerCreated { result, .. } => assert!(result.is_ok()),
            BackendOutcome::PickPersisted { result, .. } => assert!(result.is_ok()),
            other => panic!("unexpected outcome {other:?}"),
        }
        app.handle_outcome(outcome);
    }
    assert_eq!(app.session().divergences(), 0);

    let stored = db.get_draft(&draft.id).unwrap();
    let pick = &stored.managers[0].picks[0];
    assert_eq!(pick.player.full_name(), "Easton Cowan");
    assert_eq!(pick.player.team, "TOR");
    let in_pool = db.find_player(&pick.player.id).unwrap().unwrap();
    assert_eq!(in_pool.position_code, "R");
}

#[tokio::test]
async fn stats_popup_uses_the_report_for_the_position() {
    let (backend, _db) = start_service().await;
    let draft = backend.create_draft("Toronto Pool", &teams()).await.unwrap();
    let (mut app, mut rx) = BoardApp::load(
        Arc::new(backend),
        &draft.id,
        settings(2),
        export_dir("draftboard_board_stats"),
    )
    .await
    .unwrap();

    app.handle_command(UserCommand::ShowStats {
        player_id: "5".to_string(),
    });
    let outcome = next(&mut rx).await;
    app.handle_outcome(outcome);
    let table = app.stats().unwrap().table.clone().unwrap();
    assert_eq!(table.headers, vec!["Season", "GP", "W", "SV%"]);
    assert_eq!(table.rows[0], vec!["2024-25", "58", "31", "0.905"]);

    app.handle_command(UserCommand::ShowStats {
        player_id: "1".to_string(),
    });
    let outcome = next(&mut rx).await;
    app.handle_outcome(outcome);
    let panel = app.stats().unwrap();
    assert_eq!(panel.player_name, "Auston Matthews");
    assert_eq!(panel.table.as_ref().unwrap().headers, vec!["Season", "GP", "G", "P"]);
}
