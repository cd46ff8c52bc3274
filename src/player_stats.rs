//! Prior-season scoring rates.
//!
//! A weekly stats log (one row per player per game) is folded into one
//! [`PlayerSeasonRate`] per (player, team): distinct games, summed
//! non-passing touchdowns, the per-game rate, and the probability that the
//! configured model assigns to that rate.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::SeasonCache;
use crate::config::AppConfig;
use crate::error::SourceError;
use crate::probability::{PoissonBaseline, ProbabilityModel, per_game_rate};
use crate::schedule::parse_int;
use crate::table::{RawTable, TableSource, fetch_with_fallback, source_from_template};

const DATASET: &str = "weekly player stats";

/// Touchdown categories that count toward an anytime score. Passing
/// touchdowns are deliberately absent.
pub const SCORING_COLUMNS: &[&str] = &[
    "rushing_tds",
    "receiving_tds",
    "kick_return_tds",
    "punt_return_tds",
    "fumble_return_tds",
    "int_return_tds",
];

const PLAYER_NAME_COLUMNS: &[&str] = &["player_name", "player_display_name"];
const TEAM_COLUMNS: &[&str] = &["recent_team", "team"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
}

impl Position {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "QB" => Some(Position::QB),
            "RB" => Some(Position::RB),
            "WR" => Some(Position::WR),
            "TE" => Some(Position::TE),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
        }
    }

    pub fn is_quarterback(&self) -> bool {
        *self == Position::QB
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One player's line for one game, reduced to what the rate needs.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyStatRow {
    pub player_id: String,
    pub player_name: String,
    pub team: String,
    pub position: String,
    pub season: Option<i32>,
    pub week: Option<u32>,
    /// `None` when the row cannot be tied to a game; such rows still
    /// contribute events but never count as a game played.
    pub game_id: Option<String>,
    pub scoring_events: u32,
}

/// Rows tagged with a season other than `stats_season` are dropped; rows with
/// no season are taken to belong to it.
pub fn normalize_weekly_stats(table: &RawTable, stats_season: i32) -> Result<Vec<WeeklyStatRow>> {
    let id_col = table
        .column("player_id")
        .ok_or_else(|| anyhow!("unexpected stats schema: missing column \"player_id\""))?;
    let position_col = table
        .column("position")
        .ok_or_else(|| anyhow!("unexpected stats schema: missing column \"position\""))?;
    let name_col = table.first_column(PLAYER_NAME_COLUMNS);
    let team_col = table.first_column(TEAM_COLUMNS);
    let season_col = table.column("season");
    let week_col = table.column("week");
    let game_col = table.column("game_id");
    let scoring_cols: Vec<usize> = SCORING_COLUMNS
        .iter()
        .filter_map(|c| table.column(c))
        .collect();
    if scoring_cols.is_empty() {
        return Err(anyhow!("unexpected stats schema: no touchdown columns"));
    }

    let mut out = Vec::with_capacity(table.len());
    let mut other_seasons = 0usize;
    for record in table.records() {
        let Some(player_id) = record.get(Some(id_col)) else {
            continue;
        };
        let season = record.get(season_col).and_then(parse_int::<i32>);
        if season.is_some_and(|s| s != stats_season) {
            other_seasons += 1;
            continue;
        }
        let season = Some(season.unwrap_or(stats_season));
        let week = record.get(week_col).and_then(parse_int::<u32>);
        let game_id = match game_col {
            Some(_) => record.get(game_col).map(str::to_string),
            // Logs without a game column: a player appears once per week.
            None => season.zip(week).map(|(s, w)| format!("{s}_{w}")),
        };
        let scoring_events = scoring_cols
            .iter()
            .map(|&col| record.get(Some(col)).map_or(0, parse_count))
            .fold(0u32, u32::saturating_add);

        out.push(WeeklyStatRow {
            player_id: player_id.to_string(),
            player_name: record.get(name_col).unwrap_or_default().to_string(),
            team: record.get(team_col).unwrap_or_default().to_string(),
            position: record.get(Some(position_col)).unwrap_or_default().to_string(),
            season,
            week,
            game_id,
            scoring_events,
        });
    }
    if other_seasons > 0 {
        debug!(stats_season, other_seasons, "dropped stat rows from other seasons");
    }
    Ok(out)
}

fn parse_count(raw: &str) -> u32 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v.round() as u32,
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSeasonRate {
    pub player_id: String,
    pub player_name: String,
    pub team: String,
    pub position: Position,
    pub games: u32,
    pub events: u32,
    pub rate: f64,
    pub atd_prob: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    pub season: i32,
    pub players: Vec<PlayerSeasonRate>,
}

impl RateTable {
    pub fn for_team<'a>(&'a self, team: &str) -> impl Iterator<Item = &'a PlayerSeasonRate> {
        self.players.iter().filter(move |p| p.team == team)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[derive(Default)]
struct Tally<'a> {
    games: HashSet<&'a str>,
    events: u32,
}

/// Fold a weekly log into per-player rates.
///
/// Output is ordered by (player id, name, team, position), which is also the
/// order roster selection falls back on for equal probabilities. Players at
/// positions outside QB/RB/WR/TE are dropped; players with zero games are
/// kept with a zero rate.
pub fn aggregate_rates(
    season: i32,
    rows: &[WeeklyStatRow],
    model: &dyn ProbabilityModel,
) -> RateTable {
    let mut groups: BTreeMap<(&str, &str, &str, &str), Tally<'_>> = BTreeMap::new();
    for row in rows {
        let key = (
            row.player_id.as_str(),
            row.player_name.as_str(),
            row.team.as_str(),
            row.position.as_str(),
        );
        let tally = groups.entry(key).or_default();
        if let Some(game_id) = row.game_id.as_deref() {
            tally.games.insert(game_id);
        }
        tally.events = tally.events.saturating_add(row.scoring_events);
    }

    let players = groups
        .into_iter()
        .filter_map(|((player_id, player_name, team, position), tally)| {
            let position = Position::parse(position)?;
            let games = u32::try_from(tally.games.len()).unwrap_or(u32::MAX);
            let rate = per_game_rate(tally.events, games);
            Some(PlayerSeasonRate {
                player_id: player_id.to_string(),
                player_name: player_name.to_string(),
                team: team.to_string(),
                position,
                games,
                events: tally.events,
                rate,
                atd_prob: model.probability(rate),
            })
        })
        .collect();

    RateTable { season, players }
}

/// The season whose stats feed predictions for `season`.
pub fn prior_season(season: i32) -> i32 {
    season - 1
}

/// Loads weekly logs and aggregates them, memoised per stats season.
pub struct RateService {
    sources: Vec<Box<dyn TableSource>>,
    model: Arc<dyn ProbabilityModel>,
    cache: SeasonCache<RateTable>,
}

impl RateService {
    pub fn new(sources: Vec<Box<dyn TableSource>>, model: Arc<dyn ProbabilityModel>) -> Self {
        Self {
            sources,
            model,
            cache: SeasonCache::new(),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::with_model(cfg, Arc::new(PoissonBaseline::default()))
    }

    pub fn with_model(cfg: &AppConfig, model: Arc<dyn ProbabilityModel>) -> Self {
        let sources = cfg
            .stats_sources
            .iter()
            .map(|t| source_from_template(t, cfg.http_timeout))
            .collect();
        Self::new(sources, model)
    }

    /// Rates aggregated from `stats_season`'s log.
    pub fn rates(&self, stats_season: i32) -> Result<Arc<RateTable>, SourceError> {
        if let Some(hit) = self.cache.get(stats_season) {
            debug!(stats_season, "rate table cache hit");
            return Ok(hit);
        }
        self.cache.get_or_try_insert_with(stats_season, || {
            let rows = fetch_with_fallback(DATASET, &self.sources, stats_season, |table| {
                normalize_weekly_stats(&table, stats_season)
            })?;
            let table = aggregate_rates(stats_season, &rows, self.model.as_ref());
            info!(
                stats_season,
                log_rows = rows.len(),
                players = table.len(),
                model = self.model.name(),
                "rate table built"
            );
            Ok(table)
        })
    }

    /// Rates used to predict games in `season`.
    pub fn rates_for(&self, season: i32) -> Result<Arc<RateTable>, SourceError> {
        self.rates(prior_season(season))
    }

    pub fn model(&self) -> &dyn ProbabilityModel {
        self.model.as_ref()
    }

    pub fn cache(&self) -> &SeasonCache<RateTable> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_row(id: &str, pos: &str, game: Option<&str>, events: u32) -> WeeklyStatRow {
        WeeklyStatRow {
            player_id: id.to_string(),
            player_name: format!("Player {id}"),
            team: "KC".to_string(),
            position: pos.to_string(),
            season: Some(2023),
            week: Some(1),
            game_id: game.map(str::to_string),
            scoring_events: events,
        }
    }

    #[test]
    fn counts_distinct_games_and_sums_events() {
        let rows = vec![
            log_row("a", "RB", Some("g1"), 2),
            log_row("a", "RB", Some("g2"), 0),
            log_row("a", "RB", Some("g2"), 1),
            log_row("a", "RB", None, 1),
        ];
        let table = aggregate_rates(2023, &rows, &PoissonBaseline::default());
        let p = &table.players[0];
        assert_eq!(p.games, 2);
        assert_eq!(p.events, 4);
        assert_eq!(p.rate, 2.0);
    }

    #[test]
    fn non_skill_positions_dropped_and_gaps_kept() {
        let rows = vec![
            log_row("k", "K", Some("g1"), 0),
            log_row("r", "WR", None, 0),
        ];
        let table = aggregate_rates(2023, &rows, &PoissonBaseline::default());
        assert_eq!(table.len(), 1);
        assert_eq!(table.players[0].position, Position::WR);
        assert_eq!(table.players[0].games, 0);
        assert_eq!(table.players[0].rate, 0.0);
        assert_eq!(table.players[0].atd_prob, 0.0);
    }

    #[test]
    fn parse_count_is_lenient() {
        assert_eq!(parse_count("2"), 2);
        assert_eq!(parse_count("1.0"), 1);
        assert_eq!(parse_count("-3"), 0);
        assert_eq!(parse_count("x"), 0);
    }

    #[test]
    fn stats_without_game_column_key_by_week() {
        let table = RawTable::from_csv_str(
            "player_id,player_name,recent_team,position,season,week,rushing_tds,passing_tds\n\
             p1,A,KC,QB,2023,1,1,3\n\
             p1,A,KC,QB,2023,2,0,2\n",
        )
        .unwrap();
        let rows = normalize_weekly_stats(&table, 2023).unwrap();
        assert_eq!(rows[0].game_id.as_deref(), Some("2023_1"));
        assert_eq!(rows[0].scoring_events, 1);
        let rates = aggregate_rates(2023, &rows, &PoissonBaseline::default());
        assert_eq!(rates.players[0].games, 2);
        assert_eq!(rates.players[0].events, 1);
    }

    #[test]
    fn schema_without_touchdowns_is_rejected() {
        let table = RawTable::from_csv_str("player_id,position\np1,RB\n").unwrap();
        assert!(normalize_weekly_stats(&table, 2023).is_err());
    }

    #[test]
    fn huge_cells_saturate_instead_of_overflowing() {
        let table = RawTable::from_csv_str(
            "player_id,player_name,position,recent_team,season,week,game_id,rushing_tds,receiving_tds\n\
             p1,A,RB,KC,2023,1,g1,1e10,1e10\n",
        )
        .unwrap();
        let rows = normalize_weekly_stats(&table, 2023).unwrap();
        assert_eq!(rows[0].scoring_events, u32::MAX);
        let rates = aggregate_rates(2023, &rows, &PoissonBaseline::default());
        assert!((rates.players[0].atd_prob - (1.0 - (-2.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn other_seasons_are_left_out() {
        let table = RawTable::from_csv_str(
            "player_id,player_name,position,recent_team,season,week,game_id,rushing_tds\n\
             p1,A,RB,KC,2022,1,2022_01,3\n\
             p1,A,RB,KC,2022,2,2022_02,3\n\
             p1,A,RB,KC,2023,1,2023_01,0\n\
             p1,A,RB,KC,,2,2023_02,0\n",
        )
        .unwrap();
        let rows = normalize_weekly_stats(&table, 2023).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.season == Some(2023)));
        let rates = aggregate_rates(2023, &rows, &PoissonBaseline::default());
        let p = &rates.players[0];
        assert_eq!((p.games, p.events), (2, 0));
        assert_eq!(p.atd_prob, 0.0);
    }
}
