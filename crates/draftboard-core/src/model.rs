// Draft documents: drafts, managers, picks, and pool players.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Forfeit sentinel
// ---------------------------------------------------------------------------

/// Identifier of the synthetic player recorded when a team runs out of time.
pub const FORFEIT_PLAYER_ID: &str = "forfeit";

/// Position code carried by the forfeit player.
pub const FORFEIT_POSITION_CODE: &str = "FF";

/// Position code the provider uses for goaltenders.
pub const GOALIE_POSITION_CODE: &str = "G";

/// Position codes a hand-made player may take.
pub const POSITION_CODES: [&str; 5] = ["C", "L", "R", "D", "G"];

/// Team abbreviation for a hand-made player with no team.
pub const UNKNOWN_TEAM: &str = "UNK";

/// Marker on players created by hand rather than fetched from the provider.
const MANUAL_PLAYER_EMOJI: &str = "\u{1F922}";

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A localized name field as served by the NHL web API (`{"default": "..."}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedName {
    #[serde(default)]
    pub default: String,
}

impl LocalizedName {
    pub fn new(value: impl Into<String>) -> Self {
        LocalizedName {
            default: value.into(),
        }
    }
}

/// A player in the cached pool.
///
/// Provider records carry many more fields; only the ones the board uses are
/// kept. The provider serves numeric ids, which are stored as strings so that
/// manually-created players (`new-...`) share one identifier type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub first_name: LocalizedName,
    #[serde(default)]
    pub last_name: LocalizedName,
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub position_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweater_number: Option<u32>,
}

impl Player {
    /// The synthetic player drafted on behalf of a team whose clock expired.
    pub fn forfeit() -> Self {
        Player {
            id: FORFEIT_PLAYER_ID.to_string(),
            first_name: LocalizedName::new("Forfeited"),
            last_name: LocalizedName::new("Pick"),
            team: String::new(),
            position_code: FORFEIT_POSITION_CODE.to_string(),
            headshot: None,
            emoji: Some("\u{23F0}".to_string()),
            sweater_number: None,
        }
    }

    /// A player entered by hand. Blank names and teams fall back to
    /// placeholders; an unknown position becomes `C`.
    pub fn manual(
        id: impl Into<String>,
        first_name: &str,
        last_name: &str,
        team: &str,
        position_code: &str,
    ) -> Self {
        let first = first_name.trim();
        let last = last_name.trim();
        let team = team.trim().to_ascii_uppercase();
        let position = position_code.trim().to_ascii_uppercase();
        Player {
            id: id.into(),
            first_name: LocalizedName::new(if first.is_empty() { "New" } else { first }),
            last_name: LocalizedName::new(if last.is_empty() { "Player" } else { last }),
            team: if team.is_empty() { UNKNOWN_TEAM.to_string() } else { team },
            position_code: if POSITION_CODES.contains(&position.as_str()) {
                position
            } else {
                POSITION_CODES[0].to_string()
            },
            headshot: None,
            emoji: Some(MANUAL_PLAYER_EMOJI.to_string()),
            sweater_number: None,
        }
    }

    pub fn is_forfeit(&self) -> bool {
        self.id == FORFEIT_PLAYER_ID
    }

    pub fn is_goalie(&self) -> bool {
        self.position_code.eq_ignore_ascii_case(GOALIE_POSITION_CODE)
    }

    /// "First Last", trimmed when either part is missing.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.default, self.last_name.default)
            .trim()
            .to_string()
    }

    /// Case-insensitive substring match on the first or last name. An empty
    /// query matches every player.
    pub fn name_matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.first_name.default.to_lowercase().contains(&query)
            || self.last_name.default.to_lowercase().contains(&query)
    }

    /// Display form of the position code: wingers are shown as LW/RW.
    pub fn display_position(&self) -> &str {
        match self.position_code.as_str() {
            "L" => "LW",
            "R" => "RW",
            other => other,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} | {})", self.full_name(), self.team, self.display_position())
    }
}

/// Accept either a JSON string or a JSON integer for an identifier.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Pick
// ---------------------------------------------------------------------------

/// A drafted player plus the round slot it was taken in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    #[serde(flatten)]
    pub player: Player,
    /// 0-based round index. `None` for picks recorded without a slot, whose
    /// slot is their position in the manager's sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick: Option<usize>,
}

impl Pick {
    pub fn new(player: Player, slot: usize) -> Self {
        Pick {
            player,
            pick: Some(slot),
        }
    }
}

// ---------------------------------------------------------------------------
// Manager / Draft
// ---------------------------------------------------------------------------

/// A participant in a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manager {
    pub name: String,
    /// 1-based, equal to the manager's index in the draft plus one.
    pub position: u32,
    #[serde(rename = "players", default, deserialize_with = "skip_empty_picks")]
    pub picks: Vec<Pick>,
}

impl Manager {
    pub fn new(name: impl Into<String>, position: u32) -> Self {
        Manager {
            name: name.into(),
            position,
            picks: Vec::new(),
        }
    }

    /// Lay the picks out by round. A pick with an explicit slot goes to that
    /// round; the others take their sequence index. When two picks claim the
    /// same slot the later one wins.
    pub fn slots(&self, rounds: usize) -> Vec<Option<&Pick>> {
        let mut slots: Vec<Option<&Pick>> = vec![None; rounds];
        for (i, pick) in self.picks.iter().enumerate() {
            let slot = pick.pick.unwrap_or(i);
            if let Some(cell) = slots.get_mut(slot) {
                *cell = Some(pick);
            }
        }
        slots
    }
}

/// Picks arrays written by older clients may contain `null` holes.
fn skip_empty_picks<'de, D>(deserializer: D) -> Result<Vec<Pick>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Option<Pick>> = Vec::deserialize(deserializer)?;
    Ok(raw.into_iter().flatten().collect())
}

/// One draft event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub managers: Vec<Manager>,
    #[serde(default)]
    pub completed: bool,
    pub started: DateTime<Utc>,
}

impl Draft {
    /// Build an empty draft with managers numbered in the given order.
    pub fn new(id: impl Into<String>, name: impl Into<String>, manager_names: &[String]) -> Self {
        let managers = manager_names
            .iter()
            .enumerate()
            .map(|(i, name)| Manager::new(name.clone(), i as u32 + 1))
            .collect();
        Draft {
            id: id.into(),
            name: name.into(),
            managers,
            completed: false,
            started: Utc::now(),
        }
    }

    /// Number of picks recorded across all managers.
    pub fn total_picks(&self) -> usize {
        self.managers.iter().map(|m| m.picks.len()).sum()
    }

    /// Whether the player with `player_id` is on any roster.
    pub fn is_drafted(&self, player_id: &str) -> bool {
        self.managers
            .iter()
            .any(|m| m.picks.iter().any(|p| p.player.id == player_id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_accepts_numeric_provider_id() {
        let json = r#"{
            "id": 8478402,
            "firstName": {"default": "Connor"},
            "lastName": {"default": "McDavid"},
            "positionCode": "C",
            "sweaterNumber": 97,
            "team": "EDM"
        }"#;
        let player: Player = serde_json::from_str(json).unwrap();
        assert_eq!(player.id, "8478402");
        assert_eq!(player.full_name(), "Connor McDavid");
        assert_eq!(player.sweater_number, Some(97));
    }

    #[test]
    fn player_ignores_unknown_provider_fields() {
        let json = r#"{
            "id": "new-1",
            "firstName": {"default": "Ada", "cs": "Ada"},
            "lastName": {"default": "Skater"},
            "positionCode": "R",
            "birthCity": {"default": "Oslo"}
        }"#;
        let player: Player = serde_json::from_str(json).unwrap();
        assert_eq!(player.display_position(), "RW");
        assert!(player.team.is_empty());
    }

    #[test]
    fn manual_player_fills_placeholders() {
        let player = Player::manual("new-1", " Ada ", "", "nyr", "g");
        assert_eq!(player.full_name(), "Ada Player");
        assert_eq!(player.team, "NYR");
        assert!(player.is_goalie());
        assert!(player.emoji.is_some());

        let player = Player::manual("new-2", "", "Skater", "", "X");
        assert_eq!(player.first_name.default, "New");
        assert_eq!(player.team, UNKNOWN_TEAM);
        assert_eq!(player.position_code, "C");
    }

    #[test]
    fn forfeit_player_is_recognized() {
        let forfeit = Player::forfeit();
        assert!(forfeit.is_forfeit());
        assert_eq!(forfeit.position_code, FORFEIT_POSITION_CODE);
        assert!(!forfeit.is_goalie());
    }

    #[test]
    fn pick_serializes_flat_with_slot() {
        let mut player = Player::forfeit();
        player.id = "42".into();
        let value = serde_json::to_value(Pick::new(player, 3)).unwrap();
        assert_eq!(value["id"], "42");
        assert_eq!(value["pick"], 3);
        assert_eq!(value["positionCode"], "FF");
    }

    #[test]
    fn manager_skips_null_picks() {
        let json = r#"{
            "name": "Alice",
            "position": 1,
            "players": [null, {"id": 1, "positionCode": "C", "pick": 1}, null]
        }"#;
        let manager: Manager = serde_json::from_str(json).unwrap();
        assert_eq!(manager.picks.len(), 1);
        assert_eq!(manager.picks[0].pick, Some(1));
    }

    #[test]
    fn manager_slots_honor_explicit_pick_index() {
        let json = r#"{
            "name": "Bob",
            "position": 2,
            "players": [
                {"id": 1, "positionCode": "C", "pick": 2},
                {"id": 2, "positionCode": "D"}
            ]
        }"#;
        let manager: Manager = serde_json::from_str(json).unwrap();
        let slots = manager.slots(3);
        assert!(slots[0].is_none());
        assert_eq!(slots[1].map(|p| p.player.id.as_str()), Some("2"));
        assert_eq!(slots[2].map(|p| p.player.id.as_str()), Some("1"));
    }

    #[test]
    fn draft_new_numbers_managers_from_one() {
        let names = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let draft = Draft::new("d1", "League", &names);
        let positions: Vec<u32> = draft.managers.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert!(!draft.completed);
        assert_eq!(draft.total_picks(), 0);
    }
}
