//! Offline collectors that refresh the JSON under the data directory.

pub mod projections;
pub mod weekly;

use chrono::{Local, Utc};

/// Local wall-clock time as written into `generated_at` / `lastUpdated`,
/// e.g. `2026-04-13T09:15:02.123456`.
pub fn local_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Seconds since the Unix epoch, with sub-second precision.
pub fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

pub(crate) fn banner(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("  {title}");
    println!("{}", "=".repeat(60));
}
