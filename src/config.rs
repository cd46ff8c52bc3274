use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::roster::SelectionPolicy;

pub const DEFAULT_SCHEDULE_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/nflverse/nflfastR-data/master/schedules/sched_{season}.csv",
    "https://github.com/nflverse/nflfastR-data/blob/master/schedules/sched_{season}.csv?raw=1",
];

pub const DEFAULT_STATS_SOURCES: &[&str] = &[
    "https://github.com/nflverse/nflverse-data/releases/download/player_stats/player_stats_{season}.csv",
    "https://github.com/nflverse/nflverse-data/releases/download/player_stats/player_stats_{season}.parquet",
];

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
const DEFAULT_DATA_DIR: &str = "data";
/// Largest roster an NFL team can dress; a cap above it selects everyone.
const MAX_SKILL_CAP: usize = 53;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub schedule_sources: Vec<String>,
    pub stats_sources: Vec<String>,
    pub http_timeout: Duration,
    pub selection: SelectionPolicy,
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let schedule_sources = lookup("ATD_SCHEDULE_SOURCES")
            .map(|raw| split_list(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| to_owned_list(DEFAULT_SCHEDULE_SOURCES));
        let stats_sources = lookup("ATD_STATS_SOURCES")
            .map(|raw| split_list(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| to_owned_list(DEFAULT_STATS_SOURCES));
        let http_timeout_secs = lookup("ATD_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
            .clamp(1, 300);
        let defaults = SelectionPolicy::default();
        let skill_cap = lookup("ATD_SKILL_CAP")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(defaults.skill_cap)
            .min(MAX_SKILL_CAP);
        let include_qb = lookup("ATD_INCLUDE_QB")
            .map(|v| parse_bool(&v))
            .unwrap_or(defaults.include_qb);
        let data_dir = lookup("ATD_DATA_DIR")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        Self {
            schedule_sources,
            stats_sources,
            http_timeout: Duration::from_secs(http_timeout_secs),
            selection: SelectionPolicy {
                skill_cap,
                include_qb,
            },
            data_dir: PathBuf::from(data_dir),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn parse_bool(raw: &str) -> bool {
    let t = raw.trim().to_ascii_lowercase();
    !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
}
