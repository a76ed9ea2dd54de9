//! Yahoo Fantasy Sports v2 client with OAuth2 refresh-token handling.
//!
//! Responses are requested with `?format=json`, which Yahoo renders as
//! numerically keyed objects (`"0"`, `"1"`, ..., `"count"`) and arrays of
//! single-key objects. The helpers at the bottom of this file flatten those
//! shapes into something addressable.

use crate::client::{ApiError, ApiResult};
use crate::fangraphs::value_text;
use crate::{Matchup, lenient_f64};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

pub const YAHOO_FANTASY_V2: &str = "https://fantasysports.yahooapis.com/fantasy/v2";
pub const YAHOO_TOKEN_URL: &str = "https://api.login.yahoo.com/oauth2/get_token";

pub const ENV_CONSUMER_KEY: &str = "YAHOO_CONSUMER_KEY";
pub const ENV_CONSUMER_SECRET: &str = "YAHOO_CONSUMER_SECRET";
pub const ENV_ACCESS_TOKEN: &str = "YAHOO_ACCESS_TOKEN";
pub const ENV_REFRESH_TOKEN: &str = "YAHOO_REFRESH_TOKEN";
pub const ENV_TOKEN_TIME: &str = "YAHOO_TOKEN_TIME";

/// Access tokens live for an hour; treat them as stale a minute early.
const TOKEN_LIFETIME_SECS: f64 = 3540.0;

/// Contents of `oauth2.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds at which `access_token` was issued.
    #[serde(default)]
    pub token_time: f64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

impl OAuthCredentials {
    /// Credentials from the `YAHOO_*` environment variables.
    ///
    /// Key, secret, access token and refresh token must all be non-empty.
    /// A missing token time means "issued now"; an unparsable one forces a refresh.
    pub fn from_env(now: f64) -> Option<Self> {
        Self::from_env_with(|k| std::env::var(k).ok(), now)
    }

    pub fn from_env_with<F>(lookup: F, now: f64) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let token_time = match get(ENV_TOKEN_TIME) {
            Some(raw) => raw.trim().parse::<f64>().unwrap_or(0.0),
            None => now,
        };
        Some(Self {
            consumer_key: get(ENV_CONSUMER_KEY)?,
            consumer_secret: get(ENV_CONSUMER_SECRET)?,
            access_token: get(ENV_ACCESS_TOKEN)?,
            refresh_token: get(ENV_REFRESH_TOKEN)?,
            token_time,
            token_type: default_token_type(),
            guid: None,
        })
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now - self.token_time >= TOKEN_LIFETIME_SECS
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    token_type: Option<String>,
    xoauth_yahoo_guid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeagueMetadata {
    pub league_key: String,
    pub name: String,
    pub current_week: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeagueTeam {
    pub team_key: String,
    pub name: String,
    /// Nickname of the first listed manager.
    pub manager: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawStat {
    pub stat_id: u32,
    pub value: f64,
}

/// Read-only Yahoo Fantasy client for one set of OAuth2 credentials.
#[derive(Debug, Clone)]
pub struct YahooApi {
    client: Client,
    base_url: String,
    token_url: String,
    timeout: Duration,
    credentials: OAuthCredentials,
}

impl YahooApi {
    pub fn with_endpoints(credentials: OAuthCredentials, base_url: &str, token_url: &str) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("fbcw/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            token_url: token_url.to_owned(),
            timeout: Duration::from_secs(30),
            credentials,
        }
    }

    pub fn credentials(&self) -> &OAuthCredentials {
        &self.credentials
    }

    /// Refresh the access token if it is stale. Returns whether a refresh happened.
    pub async fn ensure_fresh_token(&mut self, now: f64) -> ApiResult<bool> {
        if !self.credentials.is_expired(now) {
            return Ok(false);
        }
        self.refresh_access_token(now).await?;
        Ok(true)
    }

    /// Exchange the refresh token for a new access token.
    pub async fn refresh_access_token(&mut self, now: f64) -> ApiResult<()> {
        let form = [
            ("grant_type", "refresh_token"),
            ("redirect_uri", "oob"),
            ("refresh_token", self.credentials.refresh_token.as_str()),
        ];
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(
                &self.credentials.consumer_key,
                Some(&self.credentials.consumer_secret),
            )
            .form(&form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, self.token_url.clone()))?;

        let response = response
            .error_for_status()
            .map_err(|e| ApiError::Auth(format!("token refresh rejected: {e}")))?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parsing(e, self.token_url.clone()))?;

        self.credentials.access_token = token.access_token;
        if let Some(refresh) = token.refresh_token.filter(|t| !t.is_empty()) {
            self.credentials.refresh_token = refresh;
        }
        if let Some(kind) = token.token_type {
            self.credentials.token_type = kind.to_lowercase();
        }
        if token.xoauth_yahoo_guid.is_some() {
            self.credentials.guid = token.xoauth_yahoo_guid;
        }
        self.credentials.token_time = now;
        Ok(())
    }

    /// League keys the authenticated user has in the MLB game for `season`.
    pub async fn league_keys(&self, season: u16) -> ApiResult<Vec<String>> {
        let body = self
            .get_json(&format!(
                "users;use_login=1/games;game_codes=mlb;seasons={season}/leagues"
            ))
            .await?;
        Ok(parse_league_keys(&body))
    }

    pub async fn league_metadata(&self, league_key: &str) -> ApiResult<LeagueMetadata> {
        let body = self.get_json(&format!("league/{league_key}")).await?;
        parse_league_metadata(&body)
            .ok_or_else(|| ApiError::NotFound(format!("no metadata for league {league_key}")))
    }

    pub async fn teams(&self, league_key: &str) -> ApiResult<Vec<LeagueTeam>> {
        let body = self.get_json(&format!("league/{league_key}/teams")).await?;
        Ok(parse_teams(&body))
    }

    /// Team totals for a single scoring week, as raw stat-id/value pairs.
    pub async fn team_week_stats(&self, team_key: &str, week: u32) -> ApiResult<Vec<RawStat>> {
        let body = self
            .get_json(&format!("team/{team_key}/stats;type=week;week={week}"))
            .await?;
        parse_team_stats(&body)
            .ok_or_else(|| ApiError::NotFound(format!("no week {week} stats for {team_key}")))
    }

    pub async fn scoreboard(&self, league_key: &str, week: u32) -> ApiResult<Vec<Matchup>> {
        let body = self
            .get_json(&format!("league/{league_key}/scoreboard;week={week}"))
            .await?;
        parse_scoreboard(&body)
            .ok_or_else(|| ApiError::NotFound(format!("no week {week} scoreboard for {league_key}")))
    }

    async fn get_json(&self, resource: &str) -> ApiResult<Value> {
        let url = format!("{}/{resource}?format=json", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.credentials.access_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.clone()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Auth(format!("access token rejected for {url}")));
        }
        match response.error_for_status() {
            Ok(res) => res
                .json::<Value>()
                .await
                .map_err(|e| ApiError::Parsing(e, url)),
            Err(e) => Err(ApiError::Api(e, url)),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing: Yahoo's JSON rendering → plain records
// ---------------------------------------------------------------------------

pub fn parse_league_keys(body: &Value) -> Vec<String> {
    let mut keys = Vec::new();
    collect_strings(body, "league_key", &mut keys);
    let mut seen = std::collections::HashSet::new();
    keys.retain(|k| seen.insert(k.clone()));
    keys
}

pub fn parse_league_metadata(body: &Value) -> Option<LeagueMetadata> {
    let meta = flatten_record(body.pointer("/fantasy_content/league/0")?);
    Some(LeagueMetadata {
        league_key: meta.get("league_key").map(value_text).unwrap_or_default(),
        name: meta
            .get("name")
            .map(value_text)
            .unwrap_or_else(|| "Unknown".to_owned()),
        current_week: meta
            .get("current_week")
            .map(lenient_f64)
            .filter(|w| *w >= 1.0)
            .map(|w| w as u32)
            .unwrap_or(1),
    })
}

pub fn parse_teams(body: &Value) -> Vec<LeagueTeam> {
    let Some(teams) = find_key(body, "teams") else {
        return Vec::new();
    };
    numbered(teams)
        .filter_map(|entry| {
            let meta = flatten_record(entry.get("team")?.get(0)?);
            let team_key = meta.get("team_key").map(value_text)?;
            let manager = meta
                .get("managers")
                .and_then(|m| m.pointer("/0/manager/nickname"))
                .map(value_text)
                .unwrap_or_default();
            Some(LeagueTeam {
                team_key,
                name: meta.get("name").map(value_text).unwrap_or_default(),
                manager,
            })
        })
        .collect()
}

pub fn parse_team_stats(body: &Value) -> Option<Vec<RawStat>> {
    let stats = find_key(body, "team_stats")?.get("stats")?.as_array()?;
    Some(
        stats
            .iter()
            .filter_map(|entry| {
                let stat = entry.get("stat")?;
                let stat_id = stat.get("stat_id").map(lenient_f64)? as u32;
                Some(RawStat {
                    stat_id,
                    value: stat.get("value").map(lenient_f64).unwrap_or(0.0),
                })
            })
            .collect(),
    )
}

/// Matchups from a league scoreboard. Malformed matchups are skipped.
pub fn parse_scoreboard(body: &Value) -> Option<Vec<Matchup>> {
    let matchups = find_key(body, "scoreboard")?.get("0")?.get("matchups")?;
    Some(
        numbered(matchups)
            .filter_map(|entry| {
                let teams = entry.pointer("/matchup/0/teams")?;
                let (team1_key, team1_score) = matchup_side(teams.get("0")?.get("team")?)?;
                let (team2_key, team2_score) = matchup_side(teams.get("1")?.get("team")?)?;
                Some(Matchup { team1_key, team1_score, team2_key, team2_score })
            })
            .collect(),
    )
}

fn matchup_side(team: &Value) -> Option<(String, f64)> {
    let meta = flatten_record(team.get(0)?);
    let key = meta.get("team_key").map(value_text)?;
    let score = team
        .pointer("/1/team_points/total")
        .map(lenient_f64)
        .unwrap_or(0.0);
    Some((key, score))
}

/// Values under `"0"`, `"1"`, ... until the first gap. Skips `"count"`.
fn numbered(obj: &Value) -> impl Iterator<Item = &Value> {
    (0..).map_while(move |i: usize| obj.get(i.to_string()))
}

/// Merge an array of single-key objects (possibly nested, possibly with empty
/// arrays mixed in) into one map. Earlier keys win.
fn flatten_record(value: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    merge_into(value, &mut out);
    out
}

fn merge_into(value: &Value, out: &mut Map<String, Value>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                out.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        Value::Array(items) => items.iter().for_each(|item| merge_into(item, out)),
        _ => {}
    }
}

/// Depth-first search for the first value stored under `key`.
fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|v| find_key(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}

fn collect_strings(value: &Value, key: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key
                    && let Value::String(s) = v
                {
                    out.push(s.clone());
                } else {
                    collect_strings(v, key, out);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, key, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::collections::HashMap;

    fn credentials(token_time: f64) -> OAuthCredentials {
        OAuthCredentials {
            consumer_key: "key".into(),
            consumer_secret: "secret".into(),
            access_token: "old-access".into(),
            refresh_token: "refresh".into(),
            token_time,
            token_type: "bearer".into(),
            guid: None,
        }
    }

    fn team_entry(key: &str, name: &str, nickname: &str) -> Value {
        json!({"team": [[
            {"team_key": key},
            {"team_id": "1"},
            {"name": name},
            [],
            {"managers": [{"manager": {"manager_id": "1", "nickname": nickname}}]}
        ]]})
    }

    fn lookup(vars: &HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        let vars = vars.clone();
        move |k: &str| vars.get(k).map(|v| v.to_string())
    }

    #[test]
    fn env_credentials_require_all_four_tokens() {
        let mut vars: HashMap<&'static str, &'static str> = HashMap::from([
            (ENV_CONSUMER_KEY, "k"),
            (ENV_CONSUMER_SECRET, "s"),
            (ENV_ACCESS_TOKEN, "a"),
            (ENV_REFRESH_TOKEN, "r"),
        ]);

        let creds = OAuthCredentials::from_env_with(lookup(&vars), 1_000.0).unwrap();
        assert_eq!(creds.token_time, 1_000.0, "missing token time means issued now");
        assert_eq!(creds.token_type, "bearer");

        vars.insert(ENV_TOKEN_TIME, "1700000000.5");
        let creds = OAuthCredentials::from_env_with(lookup(&vars), 1_000.0).unwrap();
        assert_eq!(creds.token_time, 1_700_000_000.5);

        vars.insert(ENV_REFRESH_TOKEN, "  ");
        assert!(OAuthCredentials::from_env_with(lookup(&vars), 1_000.0).is_none());
    }

    #[test]
    fn token_expires_a_minute_before_the_hour() {
        let creds = credentials(1_000.0);
        assert!(!creds.is_expired(1_000.0 + 3_539.0));
        assert!(creds.is_expired(1_000.0 + 3_540.0));
    }

    #[test]
    fn league_keys_are_collected_from_nested_games() {
        let body = json!({"fantasy_content": {"users": {"0": {"user": [
            {"guid": "ABC"},
            {"games": {"0": {"game": [
                {"game_key": "458", "code": "mlb", "season": "2026"},
                {"leagues": {
                    "0": {"league": [{"league_key": "458.l.1234", "name": "FBCW"}]},
                    "1": {"league": [{"league_key": "458.l.9999", "name": "Other"}]},
                    "count": 2
                }}
            ]}, "count": 1}}
        ]}, "count": 1}}});
        assert_eq!(parse_league_keys(&body), vec!["458.l.1234", "458.l.9999"]);
        assert!(parse_league_keys(&json!({"fantasy_content": {}})).is_empty());
    }

    #[test]
    fn league_metadata_reads_current_week() {
        let body = json!({"fantasy_content": {"league": [{
            "league_key": "458.l.1234", "name": "Fantasy Baseball Civil War", "current_week": "7"
        }]}});
        let meta = parse_league_metadata(&body).unwrap();
        assert_eq!(meta.name, "Fantasy Baseball Civil War");
        assert_eq!(meta.current_week, 7);

        let body = json!({"fantasy_content": {"league": [{"league_key": "x"}]}});
        assert_eq!(parse_league_metadata(&body).unwrap().current_week, 1);
    }

    #[test]
    fn teams_are_flattened() {
        let body = json!({"fantasy_content": {"league": [
            {"league_key": "458.l.1234"},
            {"teams": {
                "0": team_entry("458.l.1234.t.1", "Bronx Bombers", "Josh"),
                "1": team_entry("458.l.1234.t.2", "Sox Nation", "Mike"),
                "count": 2
            }}
        ]}});
        let teams = parse_teams(&body);
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].team_key, "458.l.1234.t.1");
        assert_eq!(teams[0].name, "Bronx Bombers");
        assert_eq!(teams[1].manager, "Mike");
    }

    #[test]
    fn team_stats_parse_string_values() {
        let body = json!({"fantasy_content": {"team": [
            [{"team_key": "458.l.1234.t.1"}],
            {"team_stats": {"coverage_type": "week", "week": "3", "stats": [
                {"stat": {"stat_id": "60", "value": "12"}},
                {"stat": {"stat_id": "50", "value": "41.2"}},
                {"stat": {"stat_id": "26", "value": "-"}}
            ]}}
        ]}});
        let stats = parse_team_stats(&body).unwrap();
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0], RawStat { stat_id: 60, value: 12.0 });
        assert_eq!(stats[1].value, 41.2);
        assert_eq!(stats[2].value, 0.0);
    }

    #[test]
    fn scoreboard_yields_matchups_and_skips_broken_ones() {
        let side = |key: &str, total: &str| {
            json!({"team": [[{"team_key": key}, {"name": "n"}], {"team_points": {"coverage_type": "week", "total": total}}]})
        };
        let body = json!({"fantasy_content": {"league": [
            {"league_key": "458.l.1234"},
            {"scoreboard": {"0": {"matchups": {
                "0": {"matchup": {"week": "3", "0": {"teams": {
                    "0": side("t.1", "101.50"), "1": side("t.2", "88.1"), "count": 2
                }}}},
                "1": {"matchup": {"week": "3", "0": {"teams": {"0": side("t.3", "70")}}}},
                "count": 2
            }}, "week": "3"}}
        ]}});
        let matchups = parse_scoreboard(&body).unwrap();
        assert_eq!(matchups.len(), 1);
        assert_eq!(
            matchups[0],
            Matchup {
                team1_key: "t.1".into(),
                team1_score: 101.5,
                team2_key: "t.2".into(),
                team2_score: 88.1,
            }
        );
    }

    #[tokio::test]
    async fn stale_token_is_refreshed_with_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/oauth2/get_token")
            .match_header("authorization", Matcher::Regex("^Basic ".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "refresh".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "new-access", "refresh_token": "new-refresh", "token_type": "Bearer", "expires_in": 3600}"#)
            .create_async()
            .await;

        let mut api = YahooApi::with_endpoints(
            credentials(0.0),
            &server.url(),
            &format!("{}/oauth2/get_token", server.url()),
        );
        assert!(api.ensure_fresh_token(10_000.0).await.unwrap());
        token_mock.assert_async().await;

        let creds = api.credentials();
        assert_eq!(creds.access_token, "new-access");
        assert_eq!(creds.refresh_token, "new-refresh");
        assert_eq!(creds.token_type, "bearer");
        assert_eq!(creds.token_time, 10_000.0);

        assert!(!api.ensure_fresh_token(10_001.0).await.unwrap());
    }

    #[tokio::test]
    async fn requests_carry_bearer_token_and_json_format() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/league/458.l.1234")
            .match_query(Matcher::UrlEncoded("format".into(), "json".into()))
            .match_header("authorization", "Bearer old-access")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"fantasy_content": {"league": [{"league_key": "458.l.1234", "name": "FBCW", "current_week": 4}]}}"#)
            .create_async()
            .await;

        let api = YahooApi::with_endpoints(credentials(0.0), &server.url(), "unused");
        let meta = api.league_metadata("458.l.1234").await.unwrap();
        mock.assert_async().await;
        assert_eq!(meta.current_week, 4);
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/league/458.l.1234/teams")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let api = YahooApi::with_endpoints(credentials(0.0), &server.url(), "unused");
        let err = api.teams("458.l.1234").await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }
}
