// NHL web API client: team rosters and per-player season statistics.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use draftboard_core::config::ProviderConfig;
use draftboard_core::model::Player;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ProviderError {
    /// Upstream HTTP status, when the provider answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            ProviderError::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// Which season summary report to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsReport {
    Skater,
    Goalie,
}

impl StatsReport {
    fn path(self) -> &'static str {
        match self {
            StatsReport::Skater => "skater",
            StatsReport::Goalie => "goalie",
        }
    }
}

/// Roster payload: players grouped by position.
#[derive(Debug, Default, Deserialize)]
struct Roster {
    #[serde(default)]
    forwards: Vec<Player>,
    #[serde(default)]
    defensemen: Vec<Player>,
    #[serde(default)]
    goalies: Vec<Player>,
}

pub struct NhlClient {
    http: reqwest::Client,
    roster_base_url: String,
    stats_base_url: String,
}

impl NhlClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            roster_base_url: config.roster_base_url.trim_end_matches('/').to_string(),
            stats_base_url: config.stats_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Raw roster JSON for one team and season.
    pub async fn roster(&self, team: &str, season: &str) -> Result<Value, ProviderError> {
        let url = format!("{}/roster/{team}/{season}", self.roster_base_url);
        self.get_json(self.http.get(url)).await
    }

    /// Season summary for one player.
    pub async fn stats(&self, player_id: &str, report: StatsReport) -> Result<Value, ProviderError> {
        let url = format!("{}/{}/summary", self.stats_base_url, report.path());
        let filter = format!("playerId={player_id}");
        self.get_json(self.http.get(url).query(&[("cayenneExp", filter.as_str())]))
            .await
    }

    /// All rostered players of one team, stamped with the team abbreviation.
    pub async fn team_players(&self, team: &str, season: &str) -> Result<Vec<Player>, ProviderError> {
        let value = self.roster(team, season).await?;
        let roster: Roster = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                warn!("Roster for {team} has an unexpected shape: {e}");
                Roster::default()
            }
        };

        let players: Vec<Player> = roster
            .forwards
            .into_iter()
            .chain(roster.defensemen)
            .chain(roster.goalies)
            .map(|mut p| {
                p.team = team.to_string();
                p
            })
            .collect();
        debug!("{team}: {} players", players.len());
        Ok(players)
    }

    /// Rosters of every listed team, flattened. A team whose fetch fails is
    /// logged and skipped.
    pub async fn fetch_all_players(&self, teams: &[String], season: &str) -> Vec<Player> {
        let mut all = Vec::new();
        for team in teams {
            match self.team_players(team, season).await {
                Ok(players) => all.extend(players),
                Err(e) => warn!("Skipping {team}: {e}"),
            }
        }
        info!("Fetched {} players from {} teams", all.len(), teams.len());
        all
    }

    async fn get_json(&self, request: reqwest::RequestBuilder) -> Result<Value, ProviderError> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        debug!("GET {url} -> {status}");
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.json().await?)
    }
}
