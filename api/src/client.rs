use crate::fangraphs::{FangraphsRow, StatGroup};
use crate::scoring::ScoringTable;
use crate::{BatterStats, PitcherStats, PlayerType, ProjectedPlayer, ProjectedStats};
use reqwest::Client;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const FANGRAPHS_API_BASE: &str = "https://www.fangraphs.com/api/projections";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const FANGRAPHS_REFERER: &str = "https://www.fangraphs.com/projections";

const HEADSHOT_PREFIX: &str = "https://img.mlbstatic.com/mlb-photos/image/upload/d_people:generic:headshot:67:current.png/w_213,q_auto:best/v1/people";
/// MLB's generic silhouette lives under person id 1.
const PLACEHOLDER_PERSON_ID: u64 = 1;

/// Positions that never get the `,Util` eligibility suffix.
const BARE_POSITIONS: [&str; 4] = ["Util", "P", "SP", "RP"];

/// Projections client for Fangraphs' public JSON endpoint.
#[derive(Debug, Clone)]
pub struct FangraphsApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Default for FangraphsApi {
    fn default() -> Self {
        Self::with_base_url(FANGRAPHS_API_BASE)
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    NotFound(String),
    Auth(String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Auth(msg) => write!(f, "Authorization error: {msg}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl FangraphsApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at another host (a mirror, or a mock server in tests).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .user_agent(BROWSER_USER_AGENT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Fetch every projected player of one stat group for a projection system.
    ///
    /// `proj_type` is Fangraphs' own system id (`steamer`, `zipsp1`, `rthebatx`, ...).
    pub async fn fetch_projections(
        &self,
        proj_type: &str,
        group: StatGroup,
    ) -> ApiResult<Vec<FangraphsRow>> {
        let url = format!(
            "{}?type={proj_type}&stats={group}&pos=all&team=0&lg=all&players=0",
            self.base_url
        );
        self.get(&url).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::REFERER, FANGRAPHS_REFERER)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.to_owned())),
            Err(e) => Err(ApiError::Api(e, url.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping: Fangraphs rows → projected players
// ---------------------------------------------------------------------------

/// Turn raw batter rows into scored players, dropping anyone under `min_pa`
/// plate appearances. Sorted by projected points, best first.
pub fn process_batters(
    rows: &[FangraphsRow],
    scoring: &ScoringTable,
    min_pa: i64,
) -> Vec<ProjectedPlayer> {
    let mut players: Vec<ProjectedPlayer> = rows
        .iter()
        .map(|row| map_batter(row, scoring))
        .filter(|p| match &p.stats {
            ProjectedStats::Batter(s) => s.plate_appearances >= min_pa,
            ProjectedStats::Pitcher(_) => false,
        })
        .collect();
    sort_by_points(&mut players);
    players
}

/// Turn raw pitcher rows into scored players, dropping anyone under `min_ip`
/// innings. Sorted by projected points, best first.
pub fn process_pitchers(
    rows: &[FangraphsRow],
    scoring: &ScoringTable,
    min_ip: f64,
) -> Vec<ProjectedPlayer> {
    let mut players: Vec<ProjectedPlayer> = rows
        .iter()
        .map(|row| map_pitcher(row, scoring))
        .filter(|p| match &p.stats {
            ProjectedStats::Pitcher(s) => s.innings >= min_ip,
            ProjectedStats::Batter(_) => false,
        })
        .collect();
    sort_by_points(&mut players);
    players
}

/// Stable, descending: equal scores keep the provider's order.
fn sort_by_points(players: &mut [ProjectedPlayer]) {
    players.sort_by(|a, b| b.projected_points.total_cmp(&a.projected_points));
}

fn map_batter(row: &FangraphsRow, scoring: &ScoringTable) -> ProjectedPlayer {
    let hits = row.int("H");
    let doubles = row.int("2B");
    let triples = row.int("3B");
    let home_runs = row.int("HR");

    let stats = BatterStats {
        games: row.int("G"),
        home_runs,
        rbi: row.int("RBI"),
        runs: row.int("R"),
        stolen_bases: row.int("SB"),
        hits,
        singles: hits - doubles - triples - home_runs,
        doubles,
        triples,
        walks: row.int("BB"),
        strikeouts: row.int("SO"),
        avg: row.float("AVG"),
        ops: row.float("OPS"),
        plate_appearances: row.int("PA"),
    };

    ProjectedPlayer {
        name: row.player_name(),
        team: team_abbrev(row),
        position: batter_position(row.text("minpos").as_deref()),
        kind: PlayerType::Batter,
        projected_points: scoring.batter_points(&stats),
        stats: ProjectedStats::Batter(stats),
        headshot_url: headshot_url(row.mlbam_id()),
        mlb_id: None,
    }
}

fn map_pitcher(row: &FangraphsRow, scoring: &ScoringTable) -> ProjectedPlayer {
    let games = row.int("G");
    let games_started = row.int("GS");
    let strikeouts = match row.first_present(&["SO", "K"]) {
        Some(v) => crate::lenient_i64(v),
        None => 0,
    };

    let stats = PitcherStats {
        wins: row.int("W"),
        losses: row.int("L"),
        saves: row.int("SV"),
        holds: row.int("HLD"),
        innings: row.float("IP"),
        strikeouts,
        so: strikeouts,
        earned_runs: row.int("ER"),
        hits: row.int("H"),
        walks: row.int("BB"),
        era: row.float("ERA"),
        whip: row.float("WHIP"),
        games,
        games_started,
    };

    ProjectedPlayer {
        name: row.player_name(),
        team: team_abbrev(row),
        position: pitcher_role(games, games_started).to_owned(),
        kind: PlayerType::Pitcher,
        projected_points: scoring.pitcher_points(&stats),
        stats: ProjectedStats::Pitcher(stats),
        headshot_url: headshot_url(row.mlbam_id()),
        mlb_id: None,
    }
}

/// Free agents come through as an empty team or the literal `- - -`.
fn team_abbrev(row: &FangraphsRow) -> String {
    let team = match row.first_present(&["Team", "teamid"]) {
        Some(v) => crate::fangraphs::value_text(v),
        None => String::new(),
    };
    if team.is_empty() || team == "- - -" {
        "FA".to_owned()
    } else {
        team
    }
}

/// Yahoo-style eligibility string: `SS` becomes `SS,Util`.
fn batter_position(minpos: Option<&str>) -> String {
    let position = minpos.map(str::trim).unwrap_or("");
    if position.is_empty() || position == "-" || position == "nan" {
        return "Util".to_owned();
    }
    if BARE_POSITIONS.contains(&position) {
        position.to_owned()
    } else {
        format!("{position},Util")
    }
}

/// Starters are pitchers who start at least half their appearances.
fn pitcher_role(games: i64, games_started: i64) -> &'static str {
    if games_started > 0 && games_started as f64 / games.max(1) as f64 >= 0.5 {
        "SP"
    } else {
        "RP"
    }
}

pub fn headshot_url(mlb_id: Option<u64>) -> String {
    let id = mlb_id.unwrap_or(PLACEHOLDER_PERSON_ID);
    format!("{HEADSHOT_PREFIX}/{id}/headshot/67/current")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::{Value, json};

    fn rows(value: Value) -> Vec<FangraphsRow> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn batter_position_normalisation() {
        assert_eq!(batter_position(Some("SS")), "SS,Util");
        assert_eq!(batter_position(Some(" 1B/OF ")), "1B/OF,Util");
        assert_eq!(batter_position(Some("Util")), "Util");
        assert_eq!(batter_position(Some("-")), "Util");
        assert_eq!(batter_position(Some("nan")), "Util");
        assert_eq!(batter_position(None), "Util");
    }

    #[test]
    fn pitcher_role_split_at_half_starts() {
        assert_eq!(pitcher_role(30, 30), "SP");
        assert_eq!(pitcher_role(20, 10), "SP");
        assert_eq!(pitcher_role(20, 9), "RP");
        assert_eq!(pitcher_role(60, 0), "RP");
        assert_eq!(pitcher_role(0, 3), "SP");
    }

    #[test]
    fn headshot_falls_back_to_placeholder() {
        assert!(headshot_url(Some(592450)).contains("/people/592450/headshot/67/current"));
        assert!(headshot_url(None).contains("/people/1/headshot/67/current"));
    }

    #[test]
    fn batters_are_scored_filtered_and_sorted() {
        let raw = rows(json!([
            {"PlayerName": "Bench Bat", "Team": "SEA", "minpos": "C", "PA": 40, "H": 10, "HR": 1},
            {"PlayerName": "Slugger", "Team": "NYY", "minpos": "OF", "PA": 650,
             "H": 170, "2B": 30, "3B": 2, "HR": 45, "RBI": 120, "R": 110, "BB": 90, "SO": 160,
             "AVG": 0.290, "OPS": 1.000, "xMLBAMID": 592450},
            {"PlayerName": "Free Agent", "Team": "- - -", "minpos": "2B", "PA": 300, "H": 70},
        ]));
        let players = process_batters(&raw, &ScoringTable::projections(), 50);

        assert_eq!(players.len(), 2, "sub-50 PA batter is dropped");
        assert_eq!(players[0].name, "Slugger");
        assert_eq!(players[0].position, "OF,Util");
        assert_eq!(players[1].team, "FA");
        assert_eq!(players[0].kind, PlayerType::Batter);
        assert!(players[0].mlb_id.is_none());

        let ProjectedStats::Batter(stats) = &players[0].stats else {
            panic!("expected batter stats");
        };
        assert_eq!(stats.singles, 93);
        assert!(players[0].projected_points > players[1].projected_points);
    }

    #[test]
    fn lower_thresholds_keep_more_players() {
        let raw = rows(json!([{"PlayerName": "Callup", "PA": 25, "H": 6}]));
        assert!(process_batters(&raw, &ScoringTable::projections(), 50).is_empty());
        assert_eq!(process_batters(&raw, &ScoringTable::projections(), 20).len(), 1);
    }

    #[test]
    fn pitchers_take_strikeouts_from_so_then_k() {
        let raw = rows(json!([
            {"PlayerName": "Ace", "Team": "LAD", "G": 32, "GS": 32, "IP": 200.0, "SO": 230, "W": 15},
            {"PlayerName": "Closer", "Team": "CLE", "G": 65, "GS": 0, "IP": 65.0, "K": 80, "SV": 38},
            {"PlayerName": "Mopup", "G": 4, "IP": 6.0},
        ]));
        let players = process_pitchers(&raw, &ScoringTable::projections(), 10.0);

        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "Ace");
        assert_eq!(players[0].position, "SP");
        assert_eq!(players[1].position, "RP");
        let ProjectedStats::Pitcher(closer) = &players[1].stats else {
            panic!("expected pitcher stats");
        };
        assert_eq!(closer.strikeouts, 80);
        assert_eq!(closer.so, 80);
    }

    #[test]
    fn equal_scores_keep_provider_order() {
        let raw = rows(json!([
            {"PlayerName": "First", "PA": 100},
            {"PlayerName": "Second", "PA": 100},
        ]));
        let players = process_batters(&raw, &ScoringTable::projections(), 50);
        let names: Vec<&str> = players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn fetch_projections_sends_expected_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/projections")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "steamer".into()),
                Matcher::UrlEncoded("stats".into(), "bat".into()),
                Matcher::UrlEncoded("pos".into(), "all".into()),
            ]))
            .match_header("referer", FANGRAPHS_REFERER)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"PlayerName": "Aaron Judge", "PA": 650}]"#)
            .create_async()
            .await;

        let api = FangraphsApi::with_base_url(&format!("{}/api/projections", server.url()));
        let rows = api.fetch_projections("steamer", StatGroup::Batting).await.unwrap();

        mock.assert_async().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].player_name(), "Aaron Judge");
    }

    #[tokio::test]
    async fn server_errors_surface_as_api_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/projections")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let api = FangraphsApi::with_base_url(&format!("{}/api/projections", server.url()));
        let err = api
            .fetch_projections("rthebatx", StatGroup::Pitching)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Api(_, _)));
        assert!(err.to_string().contains("type=rthebatx"));
    }
}
