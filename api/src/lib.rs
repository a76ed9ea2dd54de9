pub mod client;
pub mod fangraphs;
pub mod scoring;
pub mod table;
pub mod weekly;
pub mod yahoo;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// League history — the records the site's season/manager pages are built from
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Season {
    #[serde(deserialize_with = "loose::year")]
    pub year: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub champion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner_up: Option<String>,
    pub teams: Vec<Team>,
    pub awards: Vec<Award>,
}

impl Season {
    /// Teams ordered by final rank; unranked teams keep their file order at the end.
    pub fn standings(&self) -> Vec<&Team> {
        let mut teams: Vec<&Team> = self.teams.iter().collect();
        teams.sort_by_key(|t| t.rank.unwrap_or(u16::MAX));
        teams
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Team {
    pub team_key: String,
    pub team_name: String,
    pub manager: String,
    pub team_logo: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "loose::opt_f64")]
    pub points: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "loose::opt_u16")]
    pub wins: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "loose::opt_u16")]
    pub losses: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "loose::opt_u16")]
    pub rank: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roster: Vec<Player>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Manager {
    pub manager_name: String,
    pub seasons: Vec<ManagerSeason>,
}

impl Manager {
    /// First season the manager played in, if any are recorded. Seasons
    /// without a year are ignored.
    pub fn join_year(&self) -> Option<u16> {
        self.seasons.iter().map(|s| s.year).filter(|y| *y > 0).min()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSeason {
    #[serde(deserialize_with = "loose::year")]
    pub year: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "loose::opt_u16")]
    pub rank: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "loose::opt_f64")]
    pub points: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Player {
    pub name: String,
    pub team: String,
    pub position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mlb_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headshot_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Award {
    pub name: String,
    #[serde(deserialize_with = "loose::year")]
    pub year: u16,
    pub manager: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ---------------------------------------------------------------------------
// Projections — one file per projection system
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerType {
    Batter,
    Pitcher,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatterStats {
    #[serde(rename = "G")]
    pub games: i64,
    #[serde(rename = "HR")]
    pub home_runs: i64,
    #[serde(rename = "RBI")]
    pub rbi: i64,
    #[serde(rename = "R")]
    pub runs: i64,
    #[serde(rename = "SB")]
    pub stolen_bases: i64,
    #[serde(rename = "H")]
    pub hits: i64,
    #[serde(rename = "1B")]
    pub singles: i64,
    #[serde(rename = "2B")]
    pub doubles: i64,
    #[serde(rename = "3B")]
    pub triples: i64,
    #[serde(rename = "BB")]
    pub walks: i64,
    #[serde(rename = "SO")]
    pub strikeouts: i64,
    #[serde(rename = "AVG")]
    pub avg: f64,
    #[serde(rename = "OPS")]
    pub ops: f64,
    #[serde(rename = "PA")]
    pub plate_appearances: i64,
}

impl BatterStats {
    /// Value of a stat by its scoring abbreviation. Unknown stats count as zero.
    pub fn stat(&self, key: &str) -> f64 {
        match key {
            "G" => self.games as f64,
            "HR" => self.home_runs as f64,
            "RBI" => self.rbi as f64,
            "R" => self.runs as f64,
            "SB" => self.stolen_bases as f64,
            "H" => self.hits as f64,
            "1B" => self.singles as f64,
            "2B" => self.doubles as f64,
            "3B" => self.triples as f64,
            "BB" => self.walks as f64,
            "SO" => self.strikeouts as f64,
            "AVG" => self.avg,
            "OPS" => self.ops,
            "PA" => self.plate_appearances as f64,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PitcherStats {
    #[serde(rename = "W")]
    pub wins: i64,
    #[serde(rename = "L")]
    pub losses: i64,
    #[serde(rename = "SV")]
    pub saves: i64,
    #[serde(rename = "HLD")]
    pub holds: i64,
    #[serde(rename = "IP")]
    pub innings: f64,
    #[serde(rename = "K")]
    pub strikeouts: i64,
    #[serde(rename = "SO")]
    pub so: i64,
    #[serde(rename = "ER")]
    pub earned_runs: i64,
    #[serde(rename = "H")]
    pub hits: i64,
    #[serde(rename = "BB")]
    pub walks: i64,
    #[serde(rename = "ERA")]
    pub era: f64,
    #[serde(rename = "WHIP")]
    pub whip: f64,
    #[serde(rename = "G")]
    pub games: i64,
    #[serde(rename = "GS")]
    pub games_started: i64,
}

impl PitcherStats {
    pub fn stat(&self, key: &str) -> f64 {
        match key {
            "W" => self.wins as f64,
            "L" => self.losses as f64,
            "SV" => self.saves as f64,
            "HLD" => self.holds as f64,
            "IP" => self.innings,
            "K" => self.strikeouts as f64,
            "SO" => self.so as f64,
            "ER" => self.earned_runs as f64,
            "H" => self.hits as f64,
            "BB" => self.walks as f64,
            "ERA" => self.era,
            "WHIP" => self.whip,
            "G" => self.games as f64,
            "GS" => self.games_started as f64,
            _ => 0.0,
        }
    }
}

/// Batter lines always carry `PA` and pitcher lines never carry `HR`, so the
/// untagged representation round-trips without a discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectedStats {
    Batter(BatterStats),
    Pitcher(PitcherStats),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPlayer {
    pub name: String,
    pub team: String,
    pub position: String,
    #[serde(rename = "type")]
    pub kind: PlayerType,
    pub projected_points: f64,
    pub stats: ProjectedStats,
    pub headshot_url: String,
    /// Always written as null; the site keys players by name and headshot.
    pub mlb_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionFile {
    pub generated_at: String,
    pub year: u16,
    pub projection_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_ros: Option<bool>,
    pub scoring: scoring::ScoringTable,
    pub batters: Vec<ProjectedPlayer>,
    pub pitchers: Vec<ProjectedPlayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ---------------------------------------------------------------------------
// In-season weekly dashboard
// ---------------------------------------------------------------------------

/// One team's hitting or pitching line for a week (or the season so far).
///
/// Numeric fields become `stats`; anything else stored on a line (logos,
/// notes) is kept in `extra` and written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StatLineRecord", into = "StatLineRecord")]
pub struct TeamStatLine {
    pub team_key: String,
    pub team_name: String,
    pub manager: String,
    pub points: f64,
    pub stats: BTreeMap<String, f64>,
    pub extra: BTreeMap<String, Value>,
}

/// On-disk shape of a [`TeamStatLine`]: stats sit beside the identity fields.
#[derive(Serialize, Deserialize)]
struct StatLineRecord {
    #[serde(default)]
    team_key: String,
    #[serde(default)]
    team_name: String,
    #[serde(default)]
    manager: String,
    #[serde(rename = "Points", default)]
    points: f64,
    #[serde(flatten)]
    fields: serde_json::Map<String, Value>,
}

impl From<StatLineRecord> for TeamStatLine {
    fn from(record: StatLineRecord) -> Self {
        let mut line = TeamStatLine::new(&record.team_key, &record.team_name, &record.manager);
        line.points = record.points;
        for (key, value) in record.fields {
            match value.as_f64() {
                Some(n) => {
                    line.stats.insert(key, n);
                }
                None => {
                    line.extra.insert(key, value);
                }
            }
        }
        line
    }
}

impl From<TeamStatLine> for StatLineRecord {
    fn from(line: TeamStatLine) -> Self {
        let mut fields: serde_json::Map<String, Value> =
            line.stats.into_iter().map(|(k, v)| (k, Value::from(v))).collect();
        fields.extend(line.extra);
        StatLineRecord {
            team_key: line.team_key,
            team_name: line.team_name,
            manager: line.manager,
            points: line.points,
            fields,
        }
    }
}

impl TeamStatLine {
    pub fn new(team_key: &str, team_name: &str, manager: &str) -> Self {
        Self {
            team_key: team_key.to_owned(),
            team_name: team_name.to_owned(),
            manager: manager.to_owned(),
            points: 0.0,
            stats: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn get(&self, stat: &str) -> f64 {
        self.stats.get(stat).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub team1_key: String,
    pub team1_score: f64,
    pub team2_key: String,
    pub team2_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLeader {
    pub team_key: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekStats {
    pub hitting: Vec<TeamStatLine>,
    pub pitching: Vec<TeamStatLine>,
    pub matchups: Vec<Matchup>,
    #[serde(rename = "topHitters", default)]
    pub top_hitters: Vec<Value>,
    #[serde(rename = "topPitchers", default)]
    pub top_pitchers: Vec<Value>,
    #[serde(rename = "categoryLeaders", default)]
    pub category_leaders: BTreeMap<String, CategoryLeader>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CumulativeStats {
    pub hitting: Vec<TeamStatLine>,
    pub pitching: Vec<TeamStatLine>,
}

/// `data/<season>/weekly_stats.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyStatsFile {
    #[serde(rename = "currentWeek")]
    pub current_week: u32,
    pub weeks: BTreeMap<u32, WeekStats>,
    pub cumulative: CumulativeStats,
    #[serde(rename = "lastUpdated", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u16>,
}

impl WeeklyStatsFile {
    pub fn new(current_week: u32) -> Self {
        Self { current_week, ..Default::default() }
    }
}

// ---------------------------------------------------------------------------
// Keepers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeeperConfig {
    pub season: u16,
    pub max_keepers: u8,
    pub deadline: String,
    pub teams: BTreeMap<String, KeeperTeam>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeeperTeam {
    pub team_name: String,
    pub manager: String,
    pub password_hash: String,
    pub team_logo: String,
    pub keepers_locked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeeperPick {
    pub player_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Anything else the frontend stored with the pick.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepersFile {
    pub last_updated: String,
    pub keepers: BTreeMap<String, Vec<KeeperPick>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeeperSubmission {
    pub team_key: Option<String>,
    pub keepers: Vec<KeeperPick>,
}

// ---------------------------------------------------------------------------
// Lenient number coercion for loosely typed provider payloads
// ---------------------------------------------------------------------------

/// Coerce a JSON value into a float. Null, NaN and non-numeric text become 0.
pub fn lenient_f64(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).unwrap_or(0.0)
}

/// Same as [`lenient_f64`], truncated toward zero.
pub fn lenient_i64(value: &Value) -> i64 {
    lenient_f64(value).trunc() as i64
}

/// Field deserializers for hand-maintained history files, where numbers are
/// sometimes stored as strings. Anything unreadable becomes absent.
mod loose {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|f| f.is_finite())
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(number))
    }

    pub fn opt_u16<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u16>, D::Error> {
        Ok(opt_f64(d)?
            .filter(|f| (0.0..=f64::from(u16::MAX)).contains(f))
            .map(|f| f as u16))
    }

    pub fn year<'de, D: Deserializer<'de>>(d: D) -> Result<u16, D::Error> {
        Ok(opt_u16(d)?.unwrap_or(0))
    }
}
