use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::AppConfig;
use crate::matchups::{Slate, resolve_matchups};
use crate::period::{FALLBACK_WEEK, infer_display_season, infer_display_week};
use crate::player_stats::RateService;
use crate::probability::ProbabilityModel;
use crate::roster::{MatchupRoster, PredictionRow, SelectionPolicy, build_rosters, prediction_rows};
use crate::schedule::{ScheduleService, SeasonType};

/// Entry point for callers: schedule lookups, default period, and per-game
/// player predictions. Owns both season caches.
pub struct PredictionEngine {
    schedules: ScheduleService,
    rates: RateService,
    policy: SelectionPolicy,
}

impl PredictionEngine {
    pub fn new(schedules: ScheduleService, rates: RateService, policy: SelectionPolicy) -> Self {
        Self {
            schedules,
            rates,
            policy,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            ScheduleService::from_config(cfg),
            RateService::from_config(cfg),
            cfg.selection,
        )
    }

    /// Same sources as [`PredictionEngine::from_config`], different model.
    pub fn with_model(cfg: &AppConfig, model: Arc<dyn ProbabilityModel>) -> Self {
        Self::new(
            ScheduleService::from_config(cfg),
            RateService::with_model(cfg, model),
            cfg.selection,
        )
    }

    pub fn get_matchups_for_week(
        &self,
        season: i32,
        week: u32,
        season_type: SeasonType,
    ) -> Result<Slate> {
        let schedule = self.schedules.schedule(season)?;
        let slate = resolve_matchups(&schedule, season, week, season_type);
        info!(season, week, %season_type, games = slate.len(), "matchups resolved");
        Ok(slate)
    }

    pub fn rosters_for_matchups(&self, slate: &Slate, season: i32) -> Result<Vec<MatchupRoster>> {
        if slate.is_empty() {
            return Ok(Vec::new());
        }
        let rates = self.rates.rates_for(season)?;
        Ok(build_rosters(slate, &rates, self.policy))
    }

    pub fn get_players_for_matchups(
        &self,
        slate: &Slate,
        season: i32,
    ) -> Result<Vec<PredictionRow>> {
        let rosters = self.rosters_for_matchups(slate, season)?;
        Ok(prediction_rows(&rosters))
    }

    /// Predictions under the engine's probability model.
    pub fn predict_week(&self, slate: &Slate, season: i32) -> Result<Vec<PredictionRow>> {
        self.get_players_for_matchups(slate, season)
    }

    pub fn get_default_season_week(&self) -> Result<(i32, u32)> {
        self.default_season_week_at(Utc::now())
    }

    pub fn default_season_week_at(&self, now: DateTime<Utc>) -> Result<(i32, u32)> {
        let season = infer_display_season(now.date_naive());
        let schedule = self.schedules.schedule(season)?;
        let week = infer_display_week(&schedule, now).unwrap_or(FALLBACK_WEEK);
        Ok((season, week))
    }

    pub fn schedules(&self) -> &ScheduleService {
        &self.schedules
    }

    pub fn rates(&self) -> &RateService {
        &self.rates
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }
}
