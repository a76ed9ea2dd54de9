//! Weekly dashboard arithmetic: Yahoo stat ids → team stat lines, category
//! leaders and season-to-date totals.

use crate::scoring::{ScoringTable, per_nine, round_to};
use crate::yahoo::{LeagueTeam, RawStat};
use crate::{CategoryLeader, CumulativeStats, Matchup, TeamStatLine, WeekStats};
use chrono::Weekday;
use std::collections::BTreeMap;

/// Yahoo batting stat ids. Id 14 is batter strikeouts, recorded as `K`.
pub const BATTING_STAT_IDS: [(u32, &str); 14] = [
    (60, "1B"),
    (61, "2B"),
    (62, "3B"),
    (63, "HR"),
    (13, "RBI"),
    (12, "R"),
    (18, "BB"),
    (17, "HBP"),
    (15, "SB"),
    (16, "CS"),
    (14, "K"),
    (76, "IBB"),
    (93, "CYC"),
    (75, "SLAM"),
];

pub const PITCHING_STAT_IDS: [(u32, &str); 14] = [
    (50, "IP"),
    (28, "W"),
    (29, "L"),
    (32, "SV"),
    (48, "HLD"),
    (27, "ER"),
    (25, "H"),
    (39, "BB"),
    (42, "K"),
    (63, "QS"),
    (34, "CG"),
    (35, "SHO"),
    (54, "NH"),
    (77, "PICK"),
];

const HITTING_LEADER_CATEGORIES: [&str; 6] = ["HR", "RBI", "SB", "1B", "2B", "3B"];
const PITCHING_LEADER_CATEGORIES: [&str; 4] = ["K", "W", "SV", "QS"];

/// Derived pitching rates; recomputed rather than summed.
const RATE_STATS: [&str; 2] = ["ERA", "K/9"];

fn stat_name(table: &[(u32, &'static str)], id: u32) -> Option<&'static str> {
    table.iter().find(|(i, _)| *i == id).map(|(_, name)| *name)
}

/// Split one team's raw week stats into a hitting and a pitching line.
///
/// Every mapped stat is recorded; only stats present in the scoring table earn
/// points. Pitching lines always carry `ERA` and `K/9`.
pub fn build_team_lines(
    team: &LeagueTeam,
    stats: &[RawStat],
    scoring: &ScoringTable,
) -> (TeamStatLine, TeamStatLine) {
    let mut hitting = TeamStatLine::new(&team.team_key, &team.name, &team.manager);
    let mut pitching = TeamStatLine::new(&team.team_key, &team.name, &team.manager);

    for stat in stats {
        if let Some(name) = stat_name(&BATTING_STAT_IDS, stat.stat_id) {
            hitting.stats.insert(name.to_owned(), stat.value);
            if let Some(weight) = scoring.batting_weight(name) {
                hitting.points += stat.value * weight;
            }
        }
        if let Some(name) = stat_name(&PITCHING_STAT_IDS, stat.stat_id) {
            pitching.stats.insert(name.to_owned(), stat.value);
            if let Some(weight) = scoring.pitching_weight(name) {
                pitching.points += stat.value * weight;
            }
        }
    }

    set_pitching_rates(&mut pitching);
    hitting.points = round_to(hitting.points, 1);
    pitching.points = round_to(pitching.points, 1);
    (hitting, pitching)
}

fn set_pitching_rates(line: &mut TeamStatLine) {
    let innings = line.get("IP");
    let era = per_nine(line.get("ER"), innings);
    let k9 = per_nine(line.get("K"), innings);
    line.stats.insert("ERA".to_owned(), era);
    line.stats.insert("K/9".to_owned(), k9);
}

/// Assemble a week entry. Individual top performers are not collected.
pub fn build_week(
    hitting: Vec<TeamStatLine>,
    pitching: Vec<TeamStatLine>,
    matchups: Vec<Matchup>,
) -> WeekStats {
    let category_leaders = category_leaders(&hitting, &pitching);
    WeekStats {
        hitting,
        pitching,
        matchups,
        top_hitters: Vec::new(),
        top_pitchers: Vec::new(),
        category_leaders,
    }
}

/// Leader per category. Ties go to the team listed first; a category nobody
/// recorded is omitted. ERA goes to the lowest ERA among teams that pitched.
pub fn category_leaders(
    hitting: &[TeamStatLine],
    pitching: &[TeamStatLine],
) -> BTreeMap<String, CategoryLeader> {
    let mut leaders = BTreeMap::new();

    let counting = HITTING_LEADER_CATEGORIES
        .iter()
        .map(|cat| (*cat, hitting))
        .chain(PITCHING_LEADER_CATEGORIES.iter().map(|cat| (*cat, pitching)));
    for (cat, lines) in counting {
        if let Some(best) = first_by(lines, |a, b| a.get(cat) > b.get(cat))
            && best.get(cat) > 0.0
        {
            leaders.insert(
                cat.to_owned(),
                CategoryLeader { team_key: best.team_key.clone(), value: best.get(cat) },
            );
        }
    }

    let pitched: Vec<TeamStatLine> = pitching.iter().filter(|p| p.get("IP") > 0.0).cloned().collect();
    let era = |line: &TeamStatLine| line.stats.get("ERA").copied().unwrap_or(999.0);
    if let Some(best) = first_by(&pitched, |a, b| era(a) < era(b)) {
        leaders.insert(
            "ERA".to_owned(),
            CategoryLeader { team_key: best.team_key.clone(), value: era(best) },
        );
    }

    leaders
}

/// First line that no later line strictly beats.
fn first_by<F>(lines: &[TeamStatLine], beats: F) -> Option<&TeamStatLine>
where
    F: Fn(&TeamStatLine, &TeamStatLine) -> bool,
{
    lines.iter().fold(None, |best, line| match best {
        Some(current) if !beats(line, current) => Some(current),
        _ => Some(line),
    })
}

/// Season-to-date totals per team across every stored week.
///
/// Teams appear in first-seen order. Counting stats and points are summed;
/// pitching ERA and K/9 are recomputed from the summed ER, K and IP.
pub fn cumulative(weeks: &BTreeMap<u32, WeekStats>) -> CumulativeStats {
    let mut hitting = Vec::new();
    let mut pitching = Vec::new();
    for week in weeks.values() {
        accumulate(&mut hitting, &week.hitting);
        accumulate(&mut pitching, &week.pitching);
    }

    for line in &mut hitting {
        line.points = round_to(line.points, 1);
    }
    for line in &mut pitching {
        set_pitching_rates(line);
        line.points = round_to(line.points, 1);
    }
    CumulativeStats { hitting, pitching }
}

fn accumulate(totals: &mut Vec<TeamStatLine>, lines: &[TeamStatLine]) {
    for line in lines {
        let idx = match totals.iter().position(|t| t.team_key == line.team_key) {
            Some(idx) => idx,
            None => {
                totals.push(TeamStatLine::new(&line.team_key, &line.team_name, &line.manager));
                totals.len() - 1
            }
        };
        let total = &mut totals[idx];
        total.points += line.points;
        for (stat, value) in &line.stats {
            if RATE_STATS.contains(&stat.as_str()) {
                continue;
            }
            *total.stats.entry(stat.clone()).or_insert(0.0) += value;
        }
    }
}

/// Most recently completed scoring week. Weeks roll over on Monday, so on a
/// Monday the league's current week has not been played yet.
pub fn completed_week(current_week: u32, today: Weekday) -> u32 {
    if today == Weekday::Mon {
        current_week.saturating_sub(1).max(1)
    } else {
        current_week.max(1)
    }
}
