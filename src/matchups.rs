use chrono::{DateTime, Datelike, FixedOffset, Offset, Utc};
use serde::Serialize;
use tracing::debug;

use crate::schedule::{Game, Schedule, SeasonType};

const EDT_OFFSET_HOURS: i32 = 4;
const EST_OFFSET_HOURS: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Matchup {
    pub label: String,
    pub home: String,
    pub away: String,
    pub kickoff_utc: DateTime<Utc>,
    pub kickoff_local: DateTime<FixedOffset>,
    pub season: i32,
    pub week: u32,
    pub game_id: String,
}

impl Matchup {
    pub fn from_game(game: &Game) -> Self {
        let kickoff_local = to_eastern(game.kickoff_utc);
        Self {
            label: matchup_label(&game.away_team, &game.home_team, kickoff_local),
            home: game.home_team.clone(),
            away: game.away_team.clone(),
            kickoff_utc: game.kickoff_utc,
            kickoff_local,
            season: game.season,
            week: game.week,
            game_id: game.game_id.clone(),
        }
    }
}

/// A week's games keyed by game id, in kickoff order.
///
/// Inserting an id that is already present drops the earlier entry and appends
/// the new one, so a slate built from kickoff-sorted games stays sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slate {
    entries: Vec<Matchup>,
}

impl Slate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, matchup: Matchup) {
        self.entries.retain(|m| m.game_id != matchup.game_id);
        self.entries.push(matchup);
    }

    pub fn get(&self, game_id: &str) -> Option<&Matchup> {
        self.entries.iter().find(|m| m.game_id == game_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Matchup> {
        self.entries.iter()
    }

    pub fn game_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|m| m.game_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// An empty slate means "no games this week", not a failure.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Slate {
    type Item = &'a Matchup;
    type IntoIter = std::slice::Iter<'a, Matchup>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<Matchup> for Slate {
    fn from_iter<I: IntoIterator<Item = Matchup>>(iter: I) -> Self {
        let mut slate = Slate::new();
        for m in iter {
            slate.insert(m);
        }
        slate
    }
}

/// US Eastern offset approximated by month: EDT (UTC-4) March through
/// October, EST (UTC-5) otherwise. Exact transition dates are not modelled.
pub fn eastern_offset(kickoff: DateTime<Utc>) -> FixedOffset {
    let hours = if (3..=10).contains(&kickoff.month()) {
        EDT_OFFSET_HOURS
    } else {
        EST_OFFSET_HOURS
    };
    FixedOffset::west_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

pub fn to_eastern(kickoff: DateTime<Utc>) -> DateTime<FixedOffset> {
    kickoff.with_timezone(&eastern_offset(kickoff))
}

/// `"BUF at KC — Sun 4:25 PM ET"`
pub fn matchup_label(away: &str, home: &str, local: DateTime<FixedOffset>) -> String {
    format!("{away} at {home} — {} ET", local.format("%a %-I:%M %p"))
}

pub fn resolve_matchups(
    schedule: &Schedule,
    season: i32,
    week: u32,
    season_type: SeasonType,
) -> Slate {
    let candidates = schedule
        .rows
        .iter()
        .filter(|r| r.week == Some(week) && r.season_type == Some(season_type));
    let mut games = Vec::new();
    let mut dropped = 0usize;
    for row in candidates {
        match row.to_game() {
            Some(game) if game.season == season => games.push(game),
            Some(_) => {}
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(season, week, dropped, "dropped schedule rows with unresolved fields");
    }

    games.sort_by_key(|g| g.kickoff_utc);
    games.iter().map(Matchup::from_game).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn offset_follows_month() {
        let sep = Utc.with_ymd_and_hms(2024, 9, 8, 17, 0, 0).unwrap();
        let dec = Utc.with_ymd_and_hms(2024, 12, 8, 18, 0, 0).unwrap();
        assert_eq!(eastern_offset(sep).local_minus_utc(), -4 * 3600);
        assert_eq!(eastern_offset(dec).local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn label_uses_local_clock() {
        let kickoff = Utc.with_ymd_and_hms(2024, 9, 6, 0, 20, 0).unwrap();
        let label = matchup_label("BAL", "KC", to_eastern(kickoff));
        assert_eq!(label, "BAL at KC — Thu 8:20 PM ET");

        let sunday = Utc.with_ymd_and_hms(2024, 12, 8, 21, 25, 0).unwrap();
        assert_eq!(
            matchup_label("BUF", "LA", to_eastern(sunday)),
            "BUF at LA — Sun 4:25 PM ET"
        );
    }

    #[test]
    fn slate_keeps_the_latest_duplicate_at_its_own_position() {
        let kickoff = Utc.with_ymd_and_hms(2024, 9, 8, 17, 0, 0).unwrap();
        let make = |id: &str, home: &str| Matchup {
            label: String::new(),
            home: home.to_string(),
            away: "X".to_string(),
            kickoff_utc: kickoff,
            kickoff_local: to_eastern(kickoff),
            season: 2024,
            week: 1,
            game_id: id.to_string(),
        };
        let slate: Slate = vec![make("a", "H1"), make("b", "H2"), make("a", "H3")]
            .into_iter()
            .collect();
        assert_eq!(slate.len(), 2);
        assert_eq!(slate.game_ids().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(slate.get("a").map(|m| m.home.as_str()), Some("H3"));
    }
}
