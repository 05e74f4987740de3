// Draft service client used by the board and the CLI subcommands.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use draftboard_core::model::{Draft, Player};
use draftboard_core::protocol::{
    CreateDraftRequest, DraftPickRequest, ErrorBody, NewManager, UndraftRequest, UndraftResponse,
};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("draft service unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("draft service returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// Operations the board needs from the draft service.
#[async_trait]
pub trait DraftBackend: Send + Sync + 'static {
    async fn list_drafts(&self) -> Result<Vec<Draft>, BackendError>;
    async fn create_draft(&self, name: &str, managers: &[String]) -> Result<Draft, BackendError>;
    async fn delete_draft(&self, draft_id: &str) -> Result<(), BackendError>;
    async fn load_draft(&self, draft_id: &str) -> Result<Draft, BackendError>;
    async fn list_players(&self) -> Result<Vec<Player>, BackendError>;
    /// Add a player to the pool; returns the stored player.
    async fn create_player(&self, player: &Player) -> Result<Player, BackendError>;
    /// Season summary for a player. `position` picks the goalie or skater
    /// report.
    async fn player_stats(&self, player_id: &str, position: &str) -> Result<Value, BackendError>;
    async fn draft_pick(
        &self,
        draft_id: &str,
        request: &DraftPickRequest,
    ) -> Result<(), BackendError>;
    /// Remove a pick; returns the player the store took off the roster.
    async fn undraft(
        &self,
        draft_id: &str,
        request: &UndraftRequest,
    ) -> Result<Player, BackendError>;
    /// Mark the draft complete; returns the plain-text results export.
    async fn complete(&self, draft_id: &str) -> Result<String, BackendError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Turn a non-2xx response into `BackendError::Status`, reading the JSON
/// error body when there is one.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    Ok(check(response).await?.json().await?)
}

#[async_trait]
impl DraftBackend for HttpBackend {
    async fn list_drafts(&self) -> Result<Vec<Draft>, BackendError> {
        json(self.http.get(self.url("/drafts")).send().await?).await
    }

    async fn create_draft(&self, name: &str, managers: &[String]) -> Result<Draft, BackendError> {
        let body = CreateDraftRequest {
            name: name.to_string(),
            managers: managers
                .iter()
                .map(|name| NewManager::Named { name: name.clone() })
                .collect(),
        };
        json(self.http.post(self.url("/drafts")).json(&body).send().await?).await
    }

    async fn delete_draft(&self, draft_id: &str) -> Result<(), BackendError> {
        let response = self
            .http
            .delete(self.url(&format!("/drafts/{draft_id}")))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn load_draft(&self, draft_id: &str) -> Result<Draft, BackendError> {
        json(self.http.get(self.url(&format!("/drafts/{draft_id}"))).send().await?).await
    }

    async fn list_players(&self) -> Result<Vec<Player>, BackendError> {
        json(self.http.get(self.url("/players")).send().await?).await
    }

    async fn create_player(&self, player: &Player) -> Result<Player, BackendError> {
        debug!("POST player {}", player.id);
        json(self.http.post(self.url("/players")).json(player).send().await?).await
    }

    async fn player_stats(&self, player_id: &str, position: &str) -> Result<Value, BackendError> {
        let mut request = self.http.get(self.url(&format!("/stats/{player_id}")));
        if !position.is_empty() {
            request = request.query(&[("position", position)]);
        }
        json(request.send().await?).await
    }

    async fn draft_pick(
        &self,
        draft_id: &str,
        request: &DraftPickRequest,
    ) -> Result<(), BackendError> {
        debug!("PATCH draft {draft_id}: {}", request.player.id);
        let response = self
            .http
            .patch(self.url(&format!("/drafts/{draft_id}/draft")))
            .json(request)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn undraft(
        &self,
        draft_id: &str,
        request: &UndraftRequest,
    ) -> Result<Player, BackendError> {
        debug!("PATCH undraft {draft_id}: {request:?}");
        let response = self
            .http
            .patch(self.url(&format!("/drafts/{draft_id}/undraft")))
            .json(request)
            .send()
            .await?;
        let body: UndraftResponse = json(response).await?;
        Ok(body.removed)
    }

    async fn complete(&self, draft_id: &str) -> Result<String, BackendError> {
        let response = self
            .http
            .post(self.url(&format!("/drafts/{draft_id}/complete")))
            .send()
            .await?;
        Ok(check(response).await?.text().await?)
    }
}
