use serde::Serialize;

use crate::matchups::Slate;
use crate::player_stats::{PlayerSeasonRate, Position, RateTable};

pub const DEFAULT_SKILL_CAP: usize = 8;
const LOGO_BASE_URL: &str = "https://a.espncdn.com/i/teamlogos/nfl/500";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Maximum RB/WR/TE selected per team.
    pub skill_cap: usize,
    /// Reserve a slot for the team's top quarterback.
    pub include_qb: bool,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            skill_cap: DEFAULT_SKILL_CAP,
            include_qb: true,
        }
    }
}

/// Pick a team's players: its best quarterback (if enabled and one exists),
/// then up to `skill_cap` non-quarterbacks by descending probability.
///
/// Equal probabilities keep their rate-table order. Fewer eligible players
/// than the cap, or none at all, is not an error.
pub fn select_team_players<'a>(
    rates: &'a RateTable,
    team: &str,
    policy: SelectionPolicy,
) -> Vec<&'a PlayerSeasonRate> {
    let mut quarterbacks = Vec::new();
    let mut skill = Vec::new();
    for player in rates.for_team(team) {
        if player.position.is_quarterback() {
            quarterbacks.push(player);
        } else {
            skill.push(player);
        }
    }

    let mut out = Vec::with_capacity(policy.skill_cap + 1);
    if policy.include_qb {
        sort_by_probability(&mut quarterbacks);
        out.extend(quarterbacks.first().copied());
    }
    sort_by_probability(&mut skill);
    out.extend(skill.into_iter().take(policy.skill_cap));
    out
}

// Stable: ties stay in input order. NaN sorts last.
fn sort_by_probability(players: &mut [&PlayerSeasonRate]) {
    players.sort_by(|a, b| sort_key(b).total_cmp(&sort_key(a)));
}

fn sort_key(player: &PlayerSeasonRate) -> f64 {
    if player.atd_prob.is_nan() {
        f64::NEG_INFINITY
    } else {
        player.atd_prob
    }
}

/// One side of one game: the selected players plus who they face.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupRoster {
    pub game_id: String,
    pub team: String,
    pub opponent: String,
    pub players: Vec<PlayerSeasonRate>,
}

impl MatchupRoster {
    pub fn select(
        game_id: &str,
        team: &str,
        opponent: &str,
        rates: &RateTable,
        policy: SelectionPolicy,
    ) -> Self {
        Self {
            game_id: game_id.to_string(),
            team: team.to_string(),
            opponent: opponent.to_string(),
            players: select_team_players(rates, team, policy)
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    pub fn prediction_rows(&self) -> impl Iterator<Item = PredictionRow> + '_ {
        self.players.iter().map(|p| PredictionRow {
            game_id: self.game_id.clone(),
            player_name: p.player_name.clone(),
            team: self.team.clone(),
            position: p.position,
            opponent: self.opponent.clone(),
            atd_prob: p.atd_prob,
            logo_url: team_logo_url(&self.team),
        })
    }
}

/// Two rosters per game, home side first, in slate order.
pub fn build_rosters(slate: &Slate, rates: &RateTable, policy: SelectionPolicy) -> Vec<MatchupRoster> {
    let mut out = Vec::with_capacity(slate.len() * 2);
    for m in slate {
        out.push(MatchupRoster::select(&m.game_id, &m.home, &m.away, rates, policy));
        out.push(MatchupRoster::select(&m.game_id, &m.away, &m.home, rates, policy));
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRow {
    pub game_id: String,
    pub player_name: String,
    pub team: String,
    pub position: Position,
    pub opponent: String,
    pub atd_prob: f64,
    pub logo_url: String,
}

pub fn prediction_rows(rosters: &[MatchupRoster]) -> Vec<PredictionRow> {
    rosters.iter().flat_map(|r| r.prediction_rows()).collect()
}

pub fn team_logo_url(team: &str) -> String {
    let team = team.trim();
    if team.is_empty() {
        return String::new();
    }
    format!("{LOGO_BASE_URL}/{}.png", team.to_ascii_lowercase())
}
