use fbcw_api::client::FANGRAPHS_API_BASE;
use fbcw_api::yahoo::{YAHOO_FANTASY_V2, YAHOO_TOKEN_URL};
use log::warn;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_SEASON: u16 = 2026;

/// Values given on the command line. Anything left `None` falls back to the
/// environment, then to the built-in default.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub site_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub bind: Option<String>,
    pub season: Option<u16>,
    pub oauth_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of the static site (HTML, JS, images and the data tree).
    pub site_dir: PathBuf,
    pub data_dir: PathBuf,
    pub bind: String,
    pub season: u16,
    pub oauth_file: PathBuf,
    pub fangraphs_url: String,
    pub yahoo_url: String,
    pub yahoo_token_url: String,
}

impl Settings {
    pub fn load(overrides: Overrides) -> Self {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    fn from_lookup<F>(overrides: Overrides, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let site_dir = overrides
            .site_dir
            .or_else(|| env("FBCW_SITE_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));
        let data_dir = overrides
            .data_dir
            .or_else(|| env("FBCW_DATA_DIR").map(PathBuf::from))
            .unwrap_or_else(|| site_dir.join("data"));
        let season = overrides
            .season
            .or_else(|| {
                env("FBCW_SEASON").and_then(|raw| match raw.trim().parse::<u16>() {
                    Ok(season) => Some(season),
                    Err(_) => {
                        warn!("Ignoring FBCW_SEASON={raw:?}; using {DEFAULT_SEASON}");
                        None
                    }
                })
            })
            .unwrap_or(DEFAULT_SEASON);

        Self {
            bind: overrides
                .bind
                .or_else(|| env("FBCW_BIND"))
                .unwrap_or_else(|| DEFAULT_BIND.to_owned()),
            oauth_file: overrides
                .oauth_file
                .or_else(|| env("FBCW_OAUTH_FILE").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("oauth2.json")),
            fangraphs_url: env("FBCW_FANGRAPHS_URL").unwrap_or_else(|| FANGRAPHS_API_BASE.to_owned()),
            yahoo_url: env("FBCW_YAHOO_URL").unwrap_or_else(|| YAHOO_FANTASY_V2.to_owned()),
            yahoo_token_url: env("FBCW_YAHOO_TOKEN_URL").unwrap_or_else(|| YAHOO_TOKEN_URL.to_owned()),
            site_dir,
            data_dir,
            season,
        }
    }
}
