/// Fangraphs projections wire types.
/// Endpoint: https://www.fangraphs.com/api/projections?type={system}&stats={bat|pit}&...
///
/// Rows are loosely typed: columns come and go between systems and numbers are
/// sometimes sent as strings or null, so a row keeps the raw JSON object and
/// exposes lenient accessors instead of a fixed struct.
use crate::{lenient_f64, lenient_i64};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatGroup {
    Batting,
    Pitching,
}

impl StatGroup {
    /// Value of the `stats` query parameter.
    pub fn query_value(&self) -> &'static str {
        match self {
            StatGroup::Batting => "bat",
            StatGroup::Pitching => "pit",
        }
    }

    pub fn plural_noun(&self) -> &'static str {
        match self {
            StatGroup::Batting => "batters",
            StatGroup::Pitching => "pitchers",
        }
    }
}

impl fmt::Display for StatGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_value())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FangraphsRow(pub Map<String, Value>);

impl FangraphsRow {
    /// Raw value for a column; absent and null are both `None`.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// First column present in the row, in priority order. Unlike [`Self::value`]
    /// a present-but-null column still wins, so `Team: null` does not fall
    /// through to `teamid`.
    pub fn first_present(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|k| self.0.get(*k))
    }

    /// Column rendered as trimmed text. Numbers are stringified.
    pub fn text(&self, key: &str) -> Option<String> {
        self.value(key).map(value_text)
    }

    pub fn int(&self, key: &str) -> i64 {
        self.value(key).map(lenient_i64).unwrap_or(0)
    }

    pub fn float(&self, key: &str) -> f64 {
        self.value(key).map(lenient_f64).unwrap_or(0.0)
    }

    /// MLBAM person id, from whichever id column the system ships.
    pub fn mlbam_id(&self) -> Option<u64> {
        ["xMLBAMID", "mlbamid", "MLBAMID"]
            .iter()
            .filter_map(|k| self.value(k))
            .map(lenient_i64)
            .find(|id| *id > 0)
            .map(|id| id as u64)
    }

    pub fn player_name(&self) -> String {
        match self.first_present(&["PlayerName", "Name"]) {
            Some(v) if !v.is_null() => value_text(v),
            _ => "Unknown".to_owned(),
        }
    }
}

pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
