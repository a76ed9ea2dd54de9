//! In-season weekly stats from Yahoo Fantasy, merged into
//! `<data>/<season>/weekly_stats.json`.

use super::{banner, local_timestamp, unix_now};
use crate::config::Settings;
use crate::store::{read_json, read_json_opt, write_json};
use anyhow::{Context, anyhow};
use chrono::{Datelike, Local};
use fbcw_api::scoring::ScoringTable;
use fbcw_api::weekly::{build_team_lines, build_week, completed_week, cumulative};
use fbcw_api::yahoo::{LeagueTeam, OAuthCredentials, YahooApi};
use fbcw_api::{WeekStats, WeeklyStatsFile};
use log::{info, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};

const NO_CREDENTIALS: &str = "No OAuth credentials found!\n\
    For scheduled runs: set YAHOO_CONSUMER_KEY, YAHOO_CONSUMER_SECRET, \
    YAHOO_ACCESS_TOKEN and YAHOO_REFRESH_TOKEN (optionally YAHOO_TOKEN_TIME).\n\
    For local development: create an oauth2.json credential file.";

#[derive(Debug, Clone, Copy, Default)]
pub struct WeeklyOptions {
    /// Collect this week instead of the last completed one.
    pub week: Option<u32>,
    /// Collect every week from 1 through the last completed one.
    pub all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CredentialSource {
    Environment,
    File(PathBuf),
}

/// Environment variables win over the credential file.
pub fn load_credentials(
    oauth_file: &Path,
    now: f64,
) -> anyhow::Result<(OAuthCredentials, CredentialSource)> {
    if let Some(credentials) = OAuthCredentials::from_env(now) {
        info!("Using credentials from environment variables");
        return Ok((credentials, CredentialSource::Environment));
    }
    load_credentials_file(oauth_file)
}

fn load_credentials_file(oauth_file: &Path) -> anyhow::Result<(OAuthCredentials, CredentialSource)> {
    if !oauth_file.exists() {
        anyhow::bail!(NO_CREDENTIALS);
    }
    info!("Using credentials from {}", oauth_file.display());
    let credentials = read_json(oauth_file)?;
    Ok((credentials, CredentialSource::File(oauth_file.to_path_buf())))
}

/// Keep refreshed tokens for the next run.
fn persist_refreshed(source: &CredentialSource, credentials: &OAuthCredentials) -> anyhow::Result<()> {
    match source {
        CredentialSource::File(path) => {
            write_json(path, credentials)?;
            info!("Refreshed tokens written to {}", path.display());
        }
        CredentialSource::Environment => {
            warn!(
                "OAuth tokens were refreshed; update YAHOO_ACCESS_TOKEN, YAHOO_REFRESH_TOKEN \
                 and YAHOO_TOKEN_TIME ({}) wherever they are stored",
                credentials.token_time
            );
        }
    }
    Ok(())
}

/// Existing dashboard file, or a fresh one if it is missing or not valid
/// JSON. A file that parses but does not look like a dashboard is an error,
/// so earlier weeks are never overwritten.
pub fn load_existing(path: &Path, current_week: u32) -> anyhow::Result<WeeklyStatsFile> {
    let value = match read_json_opt::<Value>(path) {
        Ok(Some(value)) => value,
        Ok(None) => return Ok(WeeklyStatsFile::new(current_week)),
        Err(e) => {
            warn!("Could not load existing data: {e:#}");
            return Ok(WeeklyStatsFile::new(current_week));
        }
    };
    let file: WeeklyStatsFile = serde_json::from_value(value).with_context(|| {
        format!("{} is not a weekly stats file; fix or move it before collecting", path.display())
    })?;
    info!("Loaded existing data with {} weeks", file.weeks.len());
    Ok(file)
}

/// Weeks to collect for this run.
pub fn weeks_to_collect(options: WeeklyOptions, completed: u32) -> Vec<u32> {
    if options.all {
        (1..=completed).collect()
    } else {
        vec![options.week.unwrap_or(completed)]
    }
}

async fn collect_week(api: &YahooApi, league_key: &str, teams: &[LeagueTeam], week: u32) -> WeekStats {
    let scoring = ScoringTable::weekly();
    let mut hitting = Vec::with_capacity(teams.len());
    let mut pitching = Vec::with_capacity(teams.len());

    for team in teams {
        match api.team_week_stats(&team.team_key, week).await {
            Ok(stats) => {
                let (h, p) = build_team_lines(team, &stats, &scoring);
                hitting.push(h);
                pitching.push(p);
            }
            Err(e) => warn!("Could not get stats for {}: {e}", team.team_key),
        }
    }

    let matchups = api.scoreboard(league_key, week).await.unwrap_or_else(|e| {
        warn!("Could not get matchups for week {week}: {e}");
        Vec::new()
    });

    build_week(hitting, pitching, matchups)
}

pub async fn run(settings: &Settings, options: WeeklyOptions) -> anyhow::Result<()> {
    banner(&format!(
        "WEEKLY STATS COLLECTION - {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));

    let now = unix_now();
    let (credentials, source) = load_credentials(&settings.oauth_file, now)?;
    let mut api = YahooApi::with_endpoints(credentials, &settings.yahoo_url, &settings.yahoo_token_url);
    if api
        .ensure_fresh_token(now)
        .await
        .context("refreshing the Yahoo access token")?
    {
        persist_refreshed(&source, api.credentials())?;
    }

    let season = settings.season;
    let league_key = api
        .league_keys(season)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No league found for {season}"))?;
    let league = api.league_metadata(&league_key).await?;
    println!("League: {}", league.name);

    let completed = completed_week(league.current_week, Local::now().weekday());
    let weeks = weeks_to_collect(options, completed);
    let teams = api.teams(&league_key).await?;
    info!("{} teams in {league_key}", teams.len());

    let path = settings.data_dir.join(season.to_string()).join("weekly_stats.json");
    let mut file = load_existing(&path, completed)?;

    let mut last_matchups = 0;
    for week in weeks {
        println!("\nCollecting Week {week} stats...");
        let stats = collect_week(&api, &league_key, &teams, week).await;
        last_matchups = stats.matchups.len();
        file.weeks.insert(week, stats);
    }

    file.current_week = completed;
    file.cumulative = cumulative(&file.weeks);
    file.last_updated = Some(local_timestamp());
    file.season = Some(season);
    write_json(&path, &file)?;

    println!("\nSaved to {}", path.display());
    println!("  - Weeks collected: {}", file.weeks.len());
    println!("  - Current week: {completed}");
    println!("  - Matchups this week: {last_matchups}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn credential_file_is_read_when_env_is_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("oauth2.json");
        fs::write(
            &path,
            json!({
                "consumer_key": "k",
                "consumer_secret": "s",
                "access_token": "a",
                "refresh_token": "r",
                "token_time": 1700000000.0
            })
            .to_string(),
        )
        .unwrap();

        let (creds, source) = load_credentials_file(&path).unwrap();
        assert_eq!(creds.token_type, "bearer");
        assert_eq!(creds.token_time, 1_700_000_000.0);
        assert_eq!(source, CredentialSource::File(path));
    }

    #[test]
    fn missing_credentials_explain_the_setup() {
        let dir = TempDir::new().unwrap();
        let err = load_credentials_file(&dir.path().join("oauth2.json")).unwrap_err();
        assert!(err.to_string().starts_with("No OAuth credentials found"));
    }

    #[test]
    fn refreshed_tokens_are_written_back_to_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("oauth2.json");
        let creds = OAuthCredentials {
            consumer_key: "k".into(),
            consumer_secret: "s".into(),
            access_token: "fresh".into(),
            refresh_token: "r2".into(),
            token_time: 42.0,
            token_type: "bearer".into(),
            guid: None,
        };
        persist_refreshed(&CredentialSource::File(path.clone()), &creds).unwrap();
        let back: OAuthCredentials = read_json(&path).unwrap();
        assert_eq!(back, creds);

        persist_refreshed(&CredentialSource::Environment, &creds).unwrap();
    }

    #[test]
    fn unreadable_existing_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weekly_stats.json");
        assert_eq!(load_existing(&path, 4).unwrap(), WeeklyStatsFile::new(4));

        fs::write(&path, "{\"weeks\": [").unwrap();
        assert_eq!(load_existing(&path, 4).unwrap().current_week, 4);

        let mut stored = WeeklyStatsFile::new(2);
        stored.weeks.insert(1, WeekStats::default());
        stored.weeks.insert(2, WeekStats::default());
        write_json(&path, &stored).unwrap();
        assert_eq!(load_existing(&path, 4).unwrap().weeks.len(), 2);
    }

    fn hitting_line(team_key: &str) -> serde_json::Value {
        json!({"team_key": team_key, "team_name": "Aces", "manager": "Josh", "Points": 12.5, "HR": 2})
    }

    #[test]
    fn earlier_weeks_survive_extra_fields_on_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weekly_stats.json");
        let mut decorated = hitting_line("t.1");
        decorated["team_logo"] = json!("x.png");
        let week = |hitting: serde_json::Value| json!({"hitting": [hitting], "pitching": [], "matchups": []});
        fs::write(
            &path,
            json!({
                "currentWeek": 2,
                "weeks": {"1": week(hitting_line("t.1")), "2": week(decorated)},
                "cumulative": {}
            })
            .to_string(),
        )
        .unwrap();

        let file = load_existing(&path, 3).unwrap();
        assert_eq!(file.weeks.len(), 2);
        assert_eq!(file.weeks[&2].hitting[0].extra["team_logo"], "x.png");
        assert_eq!(file.weeks[&2].hitting[0].get("HR"), 2.0);
    }

    #[test]
    fn mismatched_existing_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weekly_stats.json");
        let original = json!({"currentWeek": 2, "weeks": ["not", "a", "map"]}).to_string();
        fs::write(&path, &original).unwrap();

        assert!(load_existing(&path, 3).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn week_selection() {
        assert_eq!(weeks_to_collect(WeeklyOptions::default(), 5), vec![5]);
        assert_eq!(weeks_to_collect(WeeklyOptions { week: Some(2), all: false }, 5), vec![2]);
        assert_eq!(weeks_to_collect(WeeklyOptions { week: None, all: true }, 3), vec![1, 2, 3]);
    }
}
