// Season summary rows from `GET /stats/{id}`, reduced to a printable table.

use serde_json::{Map, Value};

/// Skater columns: (provider key, header).
const SKATER_COLUMNS: &[(&str, &str)] = &[
    ("seasonId", "Season"),
    ("teamAbbrevs", "Team"),
    ("gamesPlayed", "GP"),
    ("goals", "G"),
    ("assists", "A"),
    ("points", "P"),
    ("plusMinus", "+/-"),
];

const GOALIE_COLUMNS: &[(&str, &str)] = &[
    ("seasonId", "Season"),
    ("teamAbbrevs", "Team"),
    ("gamesPlayed", "GP"),
    ("wins", "W"),
    ("losses", "L"),
    ("savePct", "SV%"),
    ("goalsAgainstAverage", "GAA"),
];

/// Columns shown when a report carries none of the known keys.
const MAX_RAW_COLUMNS: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl StatsTable {
    /// Build a table from a stats response (`{"data": [{...}, ...]}`).
    ///
    /// Known skater or goalie columns are picked when the rows carry them;
    /// otherwise the first row's own keys are used as headers.
    pub fn from_report(report: &Value, goalie: bool) -> Self {
        let rows: Vec<&Map<String, Value>> = report
            .get("data")
            .and_then(Value::as_array)
            .map(|data| data.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default();
        let Some(first) = rows.first() else {
            return StatsTable::default();
        };

        let known = if goalie { GOALIE_COLUMNS } else { SKATER_COLUMNS };
        let mut columns: Vec<(String, String)> = known
            .iter()
            .filter(|(key, _)| first.contains_key(*key))
            .map(|(key, header)| (key.to_string(), header.to_string()))
            .collect();
        if columns.is_empty() {
            columns = first
                .keys()
                .take(MAX_RAW_COLUMNS)
                .map(|key| (key.clone(), key.clone()))
                .collect();
        }

        StatsTable {
            headers: columns.iter().map(|(_, header)| header.clone()).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|(key, _)| format_cell(key, row.get(key)))
                        .collect()
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn format_cell(key: &str, value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if key == "seasonId" => season_label(&n.to_string()),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) => format!("{f:.3}"),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// `20242025` -> `2024-25`.
fn season_label(raw: &str) -> String {
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}", &raw[..4], &raw[6..])
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skater_report_uses_known_columns() {
        let report = json!({
            "data": [{
                "seasonId": 20242025,
                "teamAbbrevs": "EDM",
                "gamesPlayed": 67,
                "goals": 26,
                "assists": 74,
                "points": 100,
                "plusMinus": 12,
                "shootingPct": 0.1257
            }],
            "total": 1
        });
        let table = StatsTable::from_report(&report, false);
        assert_eq!(table.headers, vec!["Season", "Team", "GP", "G", "A", "P", "+/-"]);
        assert_eq!(table.rows, vec![vec!["2024-25", "EDM", "67", "26", "74", "100", "12"]]);
    }

    #[test]
    fn goalie_report_formats_fractions() {
        let report = json!({
            "data": [{
                "seasonId": 20232024,
                "teamAbbrevs": "NYR",
                "gamesPlayed": 55,
                "wins": 36,
                "losses": 17,
                "savePct": 0.91283,
                "goalsAgainstAverage": 2.5801
            }]
        });
        let table = StatsTable::from_report(&report, true);
        assert_eq!(table.headers[5], "SV%");
        assert_eq!(table.rows[0][5], "0.913");
        assert_eq!(table.rows[0][6], "2.580");
    }

    #[test]
    fn unknown_rows_fall_back_to_their_keys() {
        let report = json!({ "data": [{ "filter": "playerId=1", "report": "skater" }] });
        let table = StatsTable::from_report(&report, false);
        assert_eq!(table.headers.len(), 2);
        assert!(table.headers.contains(&"report".to_string()));
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn missing_data_is_empty() {
        assert!(StatsTable::from_report(&json!({}), false).is_empty());
        assert!(StatsTable::from_report(&json!({ "data": [] }), true).is_empty());
    }
}
