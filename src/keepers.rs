//! Keeper selection support: per-team passwords, the shared keepers file and
//! offline merging of exported submissions.

use crate::collect::local_timestamp;
use crate::config::Settings;
use crate::store::{read_json, read_json_opt, write_json};
use anyhow::Context;
use fbcw_api::{KeeperConfig, KeeperSubmission, KeeperTeam, KeepersFile, Manager, Team};
use log::{info, warn};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Join year assumed for managers missing from the history file.
pub const DEFAULT_JOIN_YEAR: u16 = 2020;
pub const MAX_KEEPERS: u8 = 5;

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn join_years(managers: &[Manager]) -> HashMap<String, u16> {
    managers
        .iter()
        .filter_map(|m| Some((m.manager_name.clone(), m.join_year()?)))
        .collect()
}

/// A manager's password is their name followed by the year they joined,
/// e.g. `Josh2019`.
pub fn password_for(manager: &str, join_years: &HashMap<String, u16>) -> String {
    let year = join_years.get(manager).copied().unwrap_or(DEFAULT_JOIN_YEAR);
    format!("{manager}{year}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct IssuedPassword {
    pub manager: String,
    pub password: String,
    pub team_name: String,
}

pub fn build_config(
    teams: &[Team],
    managers: &[Manager],
    season: u16,
) -> (KeeperConfig, Vec<IssuedPassword>) {
    let years = join_years(managers);
    let mut issued = Vec::with_capacity(teams.len());
    let mut config = KeeperConfig {
        season,
        max_keepers: MAX_KEEPERS,
        deadline: format!("{season}-03-15T23:59:59"),
        teams: Default::default(),
    };

    for team in teams {
        let password = password_for(&team.manager, &years);
        config.teams.insert(
            team.team_key.clone(),
            KeeperTeam {
                team_name: team.team_name.clone(),
                manager: team.manager.clone(),
                password_hash: hash_password(&password),
                team_logo: team.team_logo.clone(),
                keepers_locked: false,
            },
        );
        issued.push(IssuedPassword {
            manager: team.manager.clone(),
            password,
            team_name: team.team_name.clone(),
        });
    }
    (config, issued)
}

/// A keepers file with an empty pick list for every configured team.
pub fn empty_keepers(config: &KeeperConfig) -> KeepersFile {
    KeepersFile {
        last_updated: String::new(),
        keepers: config.teams.keys().map(|k| (k.clone(), Vec::new())).collect(),
    }
}

/// Apply one submission. Submissions for teams not in the file are ignored.
pub fn apply_submission(keepers: &mut KeepersFile, submission: KeeperSubmission) -> Option<String> {
    let team_key = submission.team_key?;
    let picks = keepers.keepers.get_mut(&team_key)?;
    *picks = submission.keepers;
    Some(team_key)
}

pub fn render_status(keepers: &KeepersFile) -> String {
    let rule = "=".repeat(60);
    let mut out = format!("\nCurrent Keeper Selections\n{rule}\n");
    for (team_key, picks) in &keepers.keepers {
        out.push_str(&format!("\n{team_key}:\n"));
        if picks.is_empty() {
            out.push_str("  (no keepers selected)\n");
        }
        for pick in picks {
            let name = if pick.player_name.is_empty() { "Unknown" } else { pick.player_name.as_str() };
            out.push_str(&format!("  - {name} ({})\n", pick.position.as_deref().unwrap_or("?")));
        }
    }
    let updated = if keepers.last_updated.is_empty() { "Never" } else { keepers.last_updated.as_str() };
    out.push_str(&format!("\n{rule}\nLast updated: {updated}\n"));
    out
}

struct KeeperPaths {
    teams: PathBuf,
    managers: PathBuf,
    config: PathBuf,
    keepers: PathBuf,
    submissions: PathBuf,
}

impl KeeperPaths {
    fn new(data_dir: &Path, season: u16) -> Self {
        let keepers_dir = data_dir.join("keepers");
        Self {
            teams: data_dir.join("current_season").join("teams.json"),
            managers: data_dir.join("managers").join("manager_history.json"),
            config: keepers_dir.join("keeper_config.json"),
            keepers: keepers_dir.join(format!("keepers_{season}.json")),
            submissions: keepers_dir.join("submissions"),
        }
    }
}

pub fn generate(settings: &Settings) -> anyhow::Result<()> {
    let paths = KeeperPaths::new(&settings.data_dir, settings.season);
    let teams: Vec<Team> = read_json(&paths.teams)?;
    let managers: Vec<Manager> = match read_json_opt(&paths.managers)? {
        Some(managers) => managers,
        None => {
            warn!("{} not found; every manager gets join year {DEFAULT_JOIN_YEAR}", paths.managers.display());
            Vec::new()
        }
    };

    let (config, issued) = build_config(&teams, &managers, settings.season);
    println!("\nGenerating keeper config...");
    println!("{}", "-".repeat(50));
    for entry in &issued {
        println!("  {:<15} | Password: {:<20} | Team: {}", entry.manager, entry.password, entry.team_name);
    }
    println!("{}", "-".repeat(50));

    write_json(&paths.config, &config)?;
    println!("Saved: {}", paths.config.display());

    if !paths.keepers.exists() {
        write_json(&paths.keepers, &empty_keepers(&config))?;
        println!("Saved: {}", paths.keepers.display());
    }

    println!("\nConfig generated for {} teams", config.teams.len());
    println!("Max keepers: {}", config.max_keepers);
    println!("Deadline: {}", config.deadline);
    Ok(())
}

pub fn merge(settings: &Settings) -> anyhow::Result<()> {
    let paths = KeeperPaths::new(&settings.data_dir, settings.season);
    let mut keepers: KeepersFile = read_json(&paths.keepers)
        .with_context(|| "run `fbcw keepers generate` first".to_owned())?;

    if !paths.submissions.is_dir() {
        println!("No submissions directory found at {}", paths.submissions.display());
        return Ok(());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(&paths.submissions)
        .with_context(|| format!("listing {}", paths.submissions.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    for file in files {
        let name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        match read_json::<KeeperSubmission>(&file) {
            Ok(submission) => match apply_submission(&mut keepers, submission) {
                Some(team_key) => println!("Merged keepers for {team_key} from {name}"),
                None => info!("Ignoring {name}: no matching team"),
            },
            Err(e) => println!("Error loading {name}: {e:#}"),
        }
    }

    keepers.last_updated = local_timestamp();
    write_json(&paths.keepers, &keepers)?;
    println!("\nMerged keepers saved to {}", paths.keepers.display());
    Ok(())
}

pub fn status(settings: &Settings) -> anyhow::Result<()> {
    let paths = KeeperPaths::new(&settings.data_dir, settings.season);
    match read_json_opt::<KeepersFile>(&paths.keepers)? {
        Some(keepers) => print!("{}", render_status(&keepers)),
        None => println!("No keepers file found at {}", paths.keepers.display()),
    }
    Ok(())
}
