//! Preseason and rest-of-season projection files from Fangraphs.

use super::{banner, local_timestamp};
use crate::config::Settings;
use crate::store::write_json;
use fbcw_api::ProjectionFile;
use fbcw_api::client::{FangraphsApi, process_batters, process_pitchers};
use fbcw_api::fangraphs::{FangraphsRow, StatGroup};
use fbcw_api::scoring::ScoringTable;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Preseason files keep the best this many batters and pitchers.
const PRESEASON_LIMIT: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemKind {
    Preseason,
    RestOfSeason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionSystem {
    /// Output name, used for the file name and on the command line.
    pub name: &'static str,
    /// Fangraphs `type` parameter.
    pub provider: &'static str,
    pub kind: SystemKind,
}

const fn preseason(name: &'static str, provider: &'static str) -> ProjectionSystem {
    ProjectionSystem { name, provider, kind: SystemKind::Preseason }
}

const fn ros(name: &'static str, provider: &'static str) -> ProjectionSystem {
    ProjectionSystem { name, provider, kind: SystemKind::RestOfSeason }
}

pub const PRESEASON_SYSTEMS: [ProjectionSystem; 10] = [
    preseason("steamer", "steamer"),
    preseason("zips", "zips"),
    preseason("zipsdc", "zipsdc"),
    preseason("zips2027", "zipsp1"),
    preseason("zips2028", "zipsp2"),
    preseason("depthcharts", "fangraphsdc"),
    preseason("thebat", "thebat"),
    preseason("thebatx", "thebatx"),
    preseason("oopsy", "oopsy"),
    preseason("atc", "atc"),
];

pub const ROS_SYSTEMS: [ProjectionSystem; 7] = [
    ros("ros_oopsydc", "roopsydc"),
    ros("ros_zipsdc", "rzipsdc"),
    ros("ros_steamer", "steamerr"),
    ros("ros_fangraphsdc", "rfangraphsdc"),
    ros("ros_atcdc", "ratcdc"),
    ros("ros_thebat", "rthebat"),
    ros("ros_thebatx", "rthebatx"),
];

impl SystemKind {
    pub fn systems(&self) -> &'static [ProjectionSystem] {
        match self {
            SystemKind::Preseason => &PRESEASON_SYSTEMS,
            SystemKind::RestOfSeason => &ROS_SYSTEMS,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SystemKind::Preseason => "Projections",
            SystemKind::RestOfSeason => "ROS Projections",
        }
    }
}

impl ProjectionSystem {
    pub fn is_ros(&self) -> bool {
        self.kind == SystemKind::RestOfSeason
    }

    /// Only The BAT X's rest-of-season feed lacks pitchers.
    pub fn batters_only(&self) -> bool {
        self.provider == "rthebatx"
    }

    /// ZiPS files and every ROS file carry the whole player pool.
    pub fn keeps_full_list(&self) -> bool {
        self.is_ros() || matches!(self.name, "zips" | "zipsdc" | "zips2027" | "zips2028")
    }

    pub fn year(&self, season: u16) -> u16 {
        match self.name {
            "zips2027" => 2027,
            "zips2028" => 2028,
            _ => season,
        }
    }

    pub fn note(&self, season: u16) -> Option<String> {
        if self.batters_only() {
            Some("This ROS projection system only provides batting projections".to_owned())
        } else if matches!(self.name, "zips2027" | "zips2028") {
            Some(format!("ZiPS {} projection (multi-year forecast)", self.year(season)))
        } else {
            None
        }
    }

    fn min_plate_appearances(&self) -> i64 {
        if self.is_ros() { 20 } else { 50 }
    }

    fn min_innings(&self) -> f64 {
        if self.is_ros() { 5.0 } else { 10.0 }
    }

    pub fn output_path(&self, data_dir: &Path) -> PathBuf {
        let dir = data_dir.join("projections");
        match self.kind {
            SystemKind::Preseason => dir.join(format!("projections_{}.json", self.name)),
            SystemKind::RestOfSeason => dir.join("ros").join(format!("{}.json", self.name)),
        }
    }
}

pub fn find_system(kind: SystemKind, name: &str) -> Option<ProjectionSystem> {
    let name = name.to_lowercase();
    kind.systems().iter().find(|s| s.name == name).copied()
}

/// Score, filter, sort and trim raw provider rows into a projection file.
/// `None` when the provider returned nothing at all.
pub fn build_projection_file(
    system: &ProjectionSystem,
    season: u16,
    batters_raw: &[FangraphsRow],
    pitchers_raw: &[FangraphsRow],
    generated_at: String,
) -> Option<ProjectionFile> {
    if batters_raw.is_empty() && pitchers_raw.is_empty() {
        return None;
    }
    let scoring = ScoringTable::projections();
    let mut batters = process_batters(batters_raw, &scoring, system.min_plate_appearances());
    let mut pitchers = process_pitchers(pitchers_raw, &scoring, system.min_innings());
    if !system.keeps_full_list() {
        batters.truncate(PRESEASON_LIMIT);
        pitchers.truncate(PRESEASON_LIMIT);
    }

    Some(ProjectionFile {
        generated_at,
        year: system.year(season),
        projection_type: system.name.to_owned(),
        is_ros: system.is_ros().then_some(true),
        scoring,
        batters,
        pitchers,
        note: system.note(season),
    })
}

async fn fetch_group(api: &FangraphsApi, system: &ProjectionSystem, group: StatGroup) -> Vec<FangraphsRow> {
    match api.fetch_projections(system.provider, group).await {
        Ok(rows) => {
            info!("Fetched {} {} for {}", rows.len(), group.plural_noun(), system.provider);
            rows
        }
        Err(e) => {
            warn!("Could not fetch {} for {}: {e}", group.plural_noun(), system.provider);
            Vec::new()
        }
    }
}

/// Fetch and write one system. `Ok(false)` when the provider had no data.
pub async fn fetch_system(
    api: &FangraphsApi,
    system: &ProjectionSystem,
    settings: &Settings,
) -> anyhow::Result<bool> {
    println!("\n{}", "=".repeat(50));
    println!("Fetching {} {}", system.name.to_uppercase(), system.kind.label());
    println!("{}", "=".repeat(50));

    let batters_raw = fetch_group(api, system, StatGroup::Batting).await;
    let pitchers_raw = if system.batters_only() {
        info!("{} is a batters-only projection system", system.name);
        Vec::new()
    } else {
        fetch_group(api, system, StatGroup::Pitching).await
    };

    let Some(file) = build_projection_file(
        system,
        settings.season,
        &batters_raw,
        &pitchers_raw,
        local_timestamp(),
    ) else {
        warn!("No data fetched for {}. API may be unavailable.", system.name);
        return Ok(false);
    };

    let path = system.output_path(&settings.data_dir);
    write_json(&path, &file)?;
    println!("  Saved to {}", path.display());
    println!("    - {} batters", file.batters.len());
    println!("    - {} pitchers", file.pitchers.len());
    Ok(true)
}

pub fn available(kind: SystemKind) -> String {
    kind.systems().iter().map(|s| s.name).collect::<Vec<_>>().join(", ")
}

/// Fetch one named system, or all of them with a summary.
pub async fn run(settings: &Settings, kind: SystemKind, requested: Option<&str>) -> anyhow::Result<()> {
    let api = FangraphsApi::with_base_url(&settings.fangraphs_url);
    banner(match kind {
        SystemKind::Preseason => "FANGRAPHS PROJECTION FETCHER",
        SystemKind::RestOfSeason => "FANGRAPHS REST-OF-SEASON PROJECTION FETCHER",
    });

    if let Some(name) = requested {
        let system = find_system(kind, name).ok_or_else(|| {
            anyhow::anyhow!("Unknown projection system: {name}. Available systems: {}", available(kind))
        })?;
        let ok = fetch_system(&api, &system, settings).await?;
        banner(&format!("{}: {}", system.name.to_uppercase(), status(ok)));
        if !ok {
            anyhow::bail!("no projections fetched for {}", system.name);
        }
        return Ok(());
    }

    let mut results = Vec::new();
    for system in kind.systems() {
        results.push((system, fetch_system(&api, system, settings).await?));
    }

    banner("SUMMARY");
    for (system, ok) in &results {
        println!("  {:<18}: {}", system.name, status(*ok));
    }
    let saved = results.iter().filter(|(_, ok)| *ok).count();
    if saved == 0 {
        anyhow::bail!("no projections were saved; check the network connection and try again");
    }
    let dir = results[0].0.output_path(&settings.data_dir);
    if let Some(parent) = dir.parent() {
        println!("\n  {saved} files saved to {}/", parent.display());
    }
    Ok(())
}

fn status(ok: bool) -> &'static str {
    if ok { "Success" } else { "Failed" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbcw_api::ProjectedStats;
    use serde_json::json;

    fn batter_rows(count: usize) -> Vec<FangraphsRow> {
        (0..count)
            .map(|i| {
                serde_json::from_value(json!({
                    "PlayerName": format!("Batter {i}"),
                    "Team": "NYY",
                    "PA": 600,
                    "H": 150,
                    "HR": (i % 40),
                }))
                .unwrap()
            })
            .collect()
    }

    fn pitcher_rows() -> Vec<FangraphsRow> {
        serde_json::from_value(json!([
            {"PlayerName": "Ace", "G": 30, "GS": 30, "IP": 180, "SO": 200},
            {"PlayerName": "Spot", "G": 8, "GS": 1, "IP": 7.0, "SO": 6}
        ]))
        .unwrap()
    }

    fn system(name: &str) -> ProjectionSystem {
        find_system(SystemKind::Preseason, name)
            .or_else(|| find_system(SystemKind::RestOfSeason, name))
            .unwrap()
    }

    #[test]
    fn registry_lookup_is_case_insensitive() {
        assert_eq!(find_system(SystemKind::Preseason, "ZIPS2027").unwrap().provider, "zipsp1");
        assert_eq!(find_system(SystemKind::Preseason, "depthcharts").unwrap().provider, "fangraphsdc");
        assert!(find_system(SystemKind::Preseason, "ros_steamer").is_none());
        assert_eq!(find_system(SystemKind::RestOfSeason, "ros_steamer").unwrap().provider, "steamerr");
    }

    #[test]
    fn preseason_files_are_truncated_except_zips() {
        let rows = batter_rows(450);
        let steamer = build_projection_file(&system("steamer"), 2026, &rows, &[], "t".into()).unwrap();
        assert_eq!(steamer.batters.len(), 400);
        assert!(steamer.is_ros.is_none());

        let zips = build_projection_file(&system("zipsdc"), 2026, &rows, &[], "t".into()).unwrap();
        assert_eq!(zips.batters.len(), 450);

        let ros = build_projection_file(&system("ros_steamer"), 2026, &rows, &[], "t".into()).unwrap();
        assert_eq!(ros.batters.len(), 450);
        assert_eq!(ros.is_ros, Some(true));
    }

    #[test]
    fn multi_year_zips_get_their_own_year_and_note() {
        let file = build_projection_file(&system("zips2028"), 2026, &batter_rows(1), &[], "t".into()).unwrap();
        assert_eq!(file.year, 2028);
        assert_eq!(file.note.as_deref(), Some("ZiPS 2028 projection (multi-year forecast)"));

        let file = build_projection_file(&system("atc"), 2026, &batter_rows(1), &[], "t".into()).unwrap();
        assert_eq!(file.year, 2026);
        assert!(file.note.is_none());
    }

    #[test]
    fn ros_thresholds_are_lower() {
        let pitchers = pitcher_rows();
        let pre = build_projection_file(&system("steamer"), 2026, &[], &pitchers, "t".into()).unwrap();
        assert_eq!(pre.pitchers.len(), 1);
        let ros = build_projection_file(&system("ros_atcdc"), 2026, &[], &pitchers, "t".into()).unwrap();
        assert_eq!(ros.pitchers.len(), 2);
        assert!(matches!(ros.pitchers[0].stats, ProjectedStats::Pitcher(_)));
    }

    #[test]
    fn batters_only_system_is_flagged() {
        let thebatx = system("ros_thebatx");
        assert!(thebatx.batters_only());
        assert!(!system("thebatx").batters_only());
        let file = build_projection_file(&thebatx, 2026, &batter_rows(3), &[], "t".into()).unwrap();
        assert!(file.note.unwrap().contains("only provides batting"));
        assert!(file.pitchers.is_empty());
    }

    #[test]
    fn nothing_fetched_means_no_file() {
        assert!(build_projection_file(&system("steamer"), 2026, &[], &[], "t".into()).is_none());
    }

    #[test]
    fn output_paths() {
        let data = Path::new("data");
        assert_eq!(
            system("steamer").output_path(data),
            PathBuf::from("data/projections/projections_steamer.json")
        );
        assert_eq!(
            system("ros_zipsdc").output_path(data),
            PathBuf::from("data/projections/ros/ros_zipsdc.json")
        );
    }

    #[test]
    fn written_file_parses_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = build_projection_file(&system("thebat"), 2026, &batter_rows(5), &pitcher_rows(), "t".into()).unwrap();
        let path = system("thebat").output_path(dir.path());
        write_json(&path, &file).unwrap();
        let back: ProjectionFile = crate::store::read_json(&path).unwrap();
        assert_eq!(back, file);
    }
}
