//! League scoring tables and fantasy-point arithmetic.
//!
//! Two tables exist: the projection table used to rank preseason and ROS
//! projections, and the weekly table applied to live Yahoo stat lines.

use crate::{BatterStats, PitcherStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Projection stat → scoring key for batters.
const PROJECTED_BATTING_TERMS: [(&str, &str); 11] = [
    ("1B", "1B"),
    ("2B", "2B"),
    ("3B", "3B"),
    ("HR", "HR"),
    ("RBI", "RBI"),
    ("SB", "SB"),
    ("CS", "CS"),
    ("BB", "BB"),
    ("IBB", "IBB"),
    ("HBP", "HBP"),
    ("SO", "SO"),
];

/// Projection stat → scoring key for pitchers. Hits and walks are scored as
/// "allowed" categories.
const PROJECTED_PITCHING_TERMS: [(&str, &str); 11] = [
    ("IP", "IP"),
    ("W", "W"),
    ("L", "L"),
    ("SV", "SV"),
    ("HLD", "HLD"),
    ("ER", "ER"),
    ("H", "HA"),
    ("BB", "BBA"),
    ("K", "K"),
    ("QS", "QS"),
    ("CG", "CG"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringTable {
    pub batting: BTreeMap<String, f64>,
    pub pitching: BTreeMap<String, f64>,
}

impl ScoringTable {
    /// Points-league settings the projection files are ranked by.
    pub fn projections() -> Self {
        Self {
            batting: table(&[
                ("1B", 1.1),
                ("2B", 2.2),
                ("3B", 3.3),
                ("HR", 4.4),
                ("RBI", 1.0),
                ("SB", 2.0),
                ("CS", -1.0),
                ("BB", 1.0),
                ("IBB", 1.0),
                ("HBP", 1.0),
                ("SO", -0.5),
                ("CYC", 5.0),
                ("SLAM", 2.0),
            ]),
            pitching: table(&[
                ("IP", 2.5),
                ("W", 2.5),
                ("L", -3.0),
                ("CG", 5.0),
                ("ShO", 5.0),
                ("SV", 5.0),
                ("HA", -0.75),
                ("ER", -1.75),
                ("BBA", -0.75),
                ("K", 1.5),
                ("HLD", 2.0),
                ("PICK", 3.0),
                ("NH", 10.0),
                ("QS", 3.0),
            ]),
        }
    }

    /// Settings applied to weekly team stat lines from Yahoo.
    pub fn weekly() -> Self {
        Self {
            batting: table(&[
                ("1B", 2.6),
                ("2B", 5.2),
                ("3B", 7.8),
                ("HR", 10.4),
                ("RBI", 1.9),
                ("R", 1.9),
                ("BB", 2.6),
                ("HBP", 2.6),
                ("SB", 4.2),
                ("CS", -2.6),
                ("SO", -1.0),
                ("IBB", 0.0),
                ("CYC", 10.0),
                ("SLAM", 10.0),
            ]),
            pitching: table(&[
                ("IP", 5.0),
                ("W", 4.0),
                ("L", -4.0),
                ("SV", 8.0),
                ("HLD", 4.0),
                ("ER", -3.0),
                ("H", -1.0),
                ("BB", -1.0),
                ("K", 3.0),
                ("QS", 4.0),
                ("CG", 5.0),
                ("SHO", 5.0),
                ("NH", 10.0),
                ("PICK", 2.0),
            ]),
        }
    }

    pub fn batting_weight(&self, stat: &str) -> Option<f64> {
        self.batting.get(stat).copied()
    }

    pub fn pitching_weight(&self, stat: &str) -> Option<f64> {
        self.pitching.get(stat).copied()
    }

    /// Fantasy points for a projected batter line, rounded to one decimal.
    pub fn batter_points(&self, stats: &BatterStats) -> f64 {
        let total = PROJECTED_BATTING_TERMS
            .iter()
            .map(|(stat, key)| stats.stat(stat) * self.batting_weight(key).unwrap_or(0.0))
            .sum();
        round_to(total, 1)
    }

    /// Fantasy points for a projected pitcher line, rounded to one decimal.
    pub fn pitcher_points(&self, stats: &PitcherStats) -> f64 {
        let total = PROJECTED_PITCHING_TERMS
            .iter()
            .map(|(stat, key)| stats.stat(stat) * self.pitching_weight(key).unwrap_or(0.0))
            .sum();
        round_to(total, 1)
    }
}

fn table(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
}

/// Round to `places` decimals, halves to even.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Runs-per-nine style rate (ERA, K/9). Zero innings yields zero.
pub fn per_nine(count: f64, innings: f64) -> f64 {
    if innings > 0.0 {
        round_to(count * 9.0 / innings, 2)
    } else {
        0.0
    }
}
