//! Schedule source adapter.
//!
//! Turns whatever schedule table a source hands back into [`ScheduleRow`]s
//! with a fixed vocabulary: integer season/week, a season-type, team codes,
//! a single UTC kickoff and a canonical game id.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, info};

use crate::cache::SeasonCache;
use crate::config::AppConfig;
use crate::error::SourceError;
use crate::table::{RawTable, Record, TableSource, fetch_with_fallback, source_from_template};

const DATASET: &str = "schedule";

/// Explicit UTC kickoff columns, highest priority first.
const UTC_KICKOFF_COLUMNS: &[&str] = &["kickoff_in_utc", "start_time_utc", "game_time_utc"];
const ID_COLUMNS: &[&str] = &["nflverse_game_id", "game_id"];
const DATE_COLUMNS: &[&str] = &["game_date", "gameday"];
const REQUIRED_COLUMNS: &[&str] = &["week", "home_team", "away_team"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeasonType {
    Pre,
    Regular,
    Post,
}

impl SeasonType {
    /// Short code used in artifact names and on the command line.
    pub fn code(&self) -> &'static str {
        match self {
            SeasonType::Pre => "pre",
            SeasonType::Regular => "reg",
            SeasonType::Post => "post",
        }
    }

    /// Accepts both the short codes and the `game_type` values found in
    /// schedule files (`REG`, `PRE`, `WC`, `DIV`, `CON`, `SB`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PRE" | "PRESEASON" => Some(SeasonType::Pre),
            "REG" | "REGULAR" => Some(SeasonType::Regular),
            "POST" | "POSTSEASON" | "WC" | "DIV" | "CON" | "SB" => Some(SeasonType::Post),
            _ => None,
        }
    }
}

impl fmt::Display for SeasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SeasonType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        SeasonType::parse(s).ok_or_else(|| anyhow!("unknown season type {s:?} (expected pre, reg or post)"))
    }
}

/// One normalised schedule line. Any field may be missing; rows only become
/// [`Game`]s once every required field resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRow {
    pub game_id: String,
    pub season: Option<i32>,
    pub week: Option<u32>,
    pub season_type: Option<SeasonType>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub kickoff_utc: Option<DateTime<Utc>>,
}

impl ScheduleRow {
    pub fn to_game(&self) -> Option<Game> {
        let home_team = self.home_team.clone()?;
        let away_team = self.away_team.clone()?;
        if home_team == away_team {
            return None;
        }
        Some(Game {
            game_id: self.game_id.clone(),
            season: self.season?,
            week: self.week?,
            season_type: self.season_type?,
            home_team,
            away_team,
            kickoff_utc: self.kickoff_utc?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub game_id: String,
    pub season: i32,
    pub week: u32,
    pub season_type: SeasonType,
    pub home_team: String,
    pub away_team: String,
    pub kickoff_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schedule {
    pub season: i32,
    pub rows: Vec<ScheduleRow>,
}

impl Schedule {
    pub fn weeks(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.iter().filter_map(|r| r.week)
    }
}

pub fn normalize_schedule(table: &RawTable, season: i32) -> Result<Schedule> {
    for col in REQUIRED_COLUMNS {
        if table.column(col).is_none() {
            return Err(anyhow!("unexpected schedule schema: missing column {col:?}"));
        }
    }

    let season_col = table.column("season");
    let week_col = table.column("week");
    let type_col = table.column("game_type");
    let home_col = table.column("home_team");
    let away_col = table.column("away_team");
    let id_col = table.first_column(ID_COLUMNS);
    let kickoff = KickoffColumns::detect(table);

    let mut rows = Vec::with_capacity(table.len());
    let mut other_seasons = 0usize;
    for record in table.records() {
        let row_season = record.get(season_col).and_then(parse_int::<i32>);
        if row_season.is_some_and(|s| s != season) {
            other_seasons += 1;
            continue;
        }
        // A row without its own season belongs to the table it came from.
        let row_season = Some(row_season.unwrap_or(season));
        let week = record.get(week_col).and_then(parse_int::<u32>);
        let home_team = record.get(home_col).map(str::to_string);
        let season_type = match type_col {
            Some(_) => record.get(type_col).and_then(SeasonType::parse),
            None => Some(SeasonType::Regular),
        };
        let game_id = match record.get(id_col) {
            Some(id) => id.to_string(),
            None => synth_game_id(row_season, week, home_team.as_deref()),
        };

        rows.push(ScheduleRow {
            game_id,
            season: row_season,
            week,
            season_type,
            home_team,
            away_team: record.get(away_col).map(str::to_string),
            kickoff_utc: kickoff.resolve(&record),
        });
    }
    if other_seasons > 0 {
        debug!(season, other_seasons, "dropped rows from other seasons");
    }

    Ok(Schedule { season, rows })
}

enum KickoffColumns {
    Utc(usize),
    DateAndTime(usize, usize),
    Unset,
}

impl KickoffColumns {
    fn detect(table: &RawTable) -> Self {
        if let Some(col) = table.first_column(UTC_KICKOFF_COLUMNS) {
            return KickoffColumns::Utc(col);
        }
        match (table.first_column(DATE_COLUMNS), table.column("gametime")) {
            (Some(date), Some(time)) => KickoffColumns::DateAndTime(date, time),
            _ => KickoffColumns::Unset,
        }
    }

    fn resolve(&self, record: &Record<'_>) -> Option<DateTime<Utc>> {
        match *self {
            KickoffColumns::Utc(col) => record.get(Some(col)).and_then(parse_utc_timestamp),
            KickoffColumns::DateAndTime(date, time) => {
                let date = record.get(Some(date))?;
                let time = record.get(Some(time))?;
                parse_utc_timestamp(&format!("{date} {time}"))
            }
            KickoffColumns::Unset => None,
        }
    }
}

fn synth_game_id(season: Option<i32>, week: Option<u32>, home: Option<&str>) -> String {
    let season = season.map_or_else(|| "NA".to_string(), |s| s.to_string());
    let week = week.map_or_else(|| "NA".to_string(), |w| w.to_string());
    format!("{season}_{week}_{}", home.unwrap_or("NA"))
}

/// Integer coercion that tolerates float spellings (`"3.0"`). Anything else,
/// including fractional values, reads as missing.
pub(crate) fn parse_int<T: TryFrom<i64>>(raw: &str) -> Option<T> {
    let raw = raw.trim();
    let value = match raw.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let f = raw.parse::<f64>().ok()?;
            if !f.is_finite() || f.fract() != 0.0 {
                return None;
            }
            f as i64
        }
    };
    T::try_from(value).ok()
}

/// Parse a timestamp as UTC. Offset-bearing values are converted; naive
/// values are taken to already be UTC.
pub fn parse_utc_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    let naive = raw.trim_end_matches('Z').trim_end_matches(" UTC").trim();
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    None
}

/// Fetches and normalises schedules, memoised per season.
pub struct ScheduleService {
    sources: Vec<Box<dyn TableSource>>,
    cache: SeasonCache<Schedule>,
}

impl ScheduleService {
    pub fn new(sources: Vec<Box<dyn TableSource>>) -> Self {
        Self {
            sources,
            cache: SeasonCache::new(),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        let sources = cfg
            .schedule_sources
            .iter()
            .map(|t| source_from_template(t, cfg.http_timeout))
            .collect();
        Self::new(sources)
    }

    pub fn schedule(&self, season: i32) -> Result<Arc<Schedule>, SourceError> {
        if let Some(hit) = self.cache.get(season) {
            debug!(season, "schedule cache hit");
            return Ok(hit);
        }
        self.cache.get_or_try_insert_with(season, || {
            let schedule = fetch_with_fallback(DATASET, &self.sources, season, |table| {
                normalize_schedule(&table, season)
            })?;
            info!(season, rows = schedule.rows.len(), "schedule resolved");
            Ok(schedule)
        })
    }

    pub fn cache(&self) -> &SeasonCache<Schedule> {
        &self.cache
    }
}
