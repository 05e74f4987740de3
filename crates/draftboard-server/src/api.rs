// HTTP routes of the draft service.
//
// A thin layer over `Database` and `NhlClient`: handlers validate the request,
// run one store operation or one upstream fetch, and turn the outcome into a
// response. Every failure becomes a JSON error body; nothing here panics on
// bad input.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{middleware, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use draftboard_core::export::{render_results, results_file_name};
use draftboard_core::model::{Draft, Player, GOALIE_POSITION_CODE};
use draftboard_core::protocol::{
    CreateDraftRequest, DraftPickRequest, ErrorBody, UndraftRequest, UndraftResponse,
};

use crate::db::{Database, StoreError};
use crate::nhl::{NhlClient, ProviderError, StatsReport};

/// Minimum number of managers in a draft.
const MIN_MANAGERS: usize = 2;

// ---------------------------------------------------------------------------
// State / router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<Database>,
    pub nhl: Arc<NhlClient>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/players", get(list_players).post(create_player))
        .route("/drafts", get(list_drafts).post(create_draft))
        .route("/drafts/{id}", get(get_draft).delete(delete_draft))
        .route("/drafts/{id}/draft", patch(draft_player))
        .route("/drafts/{id}/undraft", patch(undraft_player))
        .route("/drafts/{id}/complete", post(complete_draft))
        .route("/stats/{player_id}", get(player_stats))
        .route("/roster/{team}/{season}", get(team_roster))
        .layer(middleware::map_response(allow_any_origin))
        .with_state(state)
}

async fn allow_any_origin(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Upstream(#[from] ProviderError),

    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_not_found() {
            ApiError::NotFound(err.to_string())
        } else if matches!(err, StoreError::SlotTaken { .. }) {
            ApiError::Validation(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, upstream_status) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::Upstream(e) => {
                warn!("Upstream failure: {e}");
                (StatusCode::BAD_GATEWAY, e.upstream_status())
            }
            ApiError::Internal(msg) => {
                warn!("Internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };
        let body = ErrorBody {
            error: self.to_string(),
            upstream_status,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_players(State(state): State<ApiState>) -> ApiResult<Json<Vec<Player>>> {
    Ok(Json(state.db.list_players()?))
}

async fn create_player(
    State(state): State<ApiState>,
    payload: Result<Json<Player>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Player>)> {
    let Json(mut player) = payload?;
    if player.full_name().is_empty() {
        return Err(ApiError::Validation("player needs a first or last name".into()));
    }
    if player.is_forfeit() {
        return Err(ApiError::Validation("`forfeit` is a reserved player id".into()));
    }
    if player.id.trim().is_empty() {
        player.id = format!("new-{}", Uuid::new_v4());
    }

    state.db.upsert_players(std::slice::from_ref(&player))?;
    info!("Added player {} ({})", player.full_name(), player.id);
    Ok((StatusCode::CREATED, Json(player)))
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

async fn list_drafts(State(state): State<ApiState>) -> ApiResult<Json<Vec<Draft>>> {
    Ok(Json(state.db.list_drafts()?))
}

async fn create_draft(
    State(state): State<ApiState>,
    payload: Result<Json<CreateDraftRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Draft>)> {
    let Json(request) = payload?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("draft name must not be empty".into()));
    }
    let managers: Vec<String> = request
        .managers
        .iter()
        .map(|m| m.name().trim().to_string())
        .collect();
    if managers.len() < MIN_MANAGERS {
        return Err(ApiError::Validation(format!(
            "a draft needs at least {MIN_MANAGERS} managers, got {}",
            managers.len()
        )));
    }
    if managers.iter().any(String::is_empty) {
        return Err(ApiError::Validation("manager names must not be empty".into()));
    }

    let draft = state.db.create_draft(name, &managers)?;
    info!("Created draft {} ({}) with {} managers", draft.name, draft.id, managers.len());
    Ok((StatusCode::CREATED, Json(draft)))
}

async fn get_draft(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Draft>> {
    Ok(Json(state.db.get_draft(&id)?))
}

async fn delete_draft(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_draft(&id)?;
    info!("Deleted draft {id}");
    Ok(StatusCode::NO_CONTENT)
}

async fn draft_player(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<DraftPickRequest>, JsonRejection>,
) -> ApiResult<Json<Draft>> {
    let Json(request) = payload?;
    if request.player.id.trim().is_empty() {
        return Err(ApiError::Validation("player.id must not be empty".into()));
    }

    debug!(
        "Draft {id}: manager {} takes {}",
        request.manager_index, request.player.id
    );
    let draft = state.db.append_pick(
        &id,
        request.manager_index,
        request.player,
        request.pick_index,
    )?;
    Ok(Json(draft))
}

async fn undraft_player(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<UndraftRequest>, JsonRejection>,
) -> ApiResult<Json<UndraftResponse>> {
    let Json(request) = payload?;
    let removed = state.db.remove_pick(
        &id,
        request.manager_index,
        request.pick_index,
        request.player_id.as_deref(),
    )?;
    debug!(
        "Draft {id}: removed {} from manager {}",
        removed.id, request.manager_index
    );
    Ok(Json(UndraftResponse { removed }))
}

/// Flag the draft completed and return the plain-text results export as an
/// attachment.
async fn complete_draft(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let draft = state.db.mark_completed(&id)?;
    info!("Draft {} ({}) completed", draft.name, draft.id);

    let file_name = results_file_name(&draft.name, &draft.id);
    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ];
    Ok((headers, render_results(&draft)))
}

// ---------------------------------------------------------------------------
// Provider pass-through
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StatsQuery {
    position: Option<String>,
}

/// Season summary for a player. `position=G` selects the goalie report;
/// without a position the pool decides, defaulting to skater.
async fn player_stats(
    State(state): State<ApiState>,
    Path(player_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<Value>> {
    let goalie = match query.position.as_deref().map(str::trim) {
        Some(position) if !position.is_empty() => {
            position.eq_ignore_ascii_case(GOALIE_POSITION_CODE)
        }
        _ => state
            .db
            .find_player(&player_id)?
            .is_some_and(|p| p.is_goalie()),
    };
    let report = if goalie {
        StatsReport::Goalie
    } else {
        StatsReport::Skater
    };

    Ok(Json(state.nhl.stats(&player_id, report).await?))
}

async fn team_roster(
    State(state): State<ApiState>,
    Path((team, season)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.nhl.roster(&team, &season).await?))
}
