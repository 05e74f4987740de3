// Request and response bodies of the draft service HTTP API.

use serde::{Deserialize, Serialize};

use crate::model::Player;

/// `POST /drafts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateDraftRequest {
    pub name: String,
    pub managers: Vec<NewManager>,
}

/// A manager entry in a create request: either `{"name": "..."}` or a bare
/// string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NewManager {
    Named { name: String },
    Bare(String),
}

impl NewManager {
    pub fn name(&self) -> &str {
        match self {
            NewManager::Named { name } | NewManager::Bare(name) => name,
        }
    }
}

/// `PATCH /drafts/{id}/draft`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPickRequest {
    #[serde(alias = "managerPosition")]
    pub manager_index: usize,
    pub player: Player,
    /// Round slot to record with the pick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick_index: Option<usize>,
}

/// `PATCH /drafts/{id}/undraft`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndraftRequest {
    #[serde(alias = "managerPosition")]
    pub manager_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
}

/// Response of `PATCH /drafts/{id}/undraft`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndraftResponse {
    pub removed: Player,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}
