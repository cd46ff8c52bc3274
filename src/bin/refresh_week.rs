use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, Utc};
use tracing::info;

use anytime_td::config::AppConfig;
use anytime_td::engine::PredictionEngine;
use anytime_td::export::export_week;
use anytime_td::logging;
use anytime_td::period::{FALLBACK_WEEK, infer_display_season, infer_display_week, is_refresh_day};
use anytime_td::schedule::SeasonType;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init()?;

    if has_flag("--if-due") && !is_refresh_day(Local::now().weekday()) {
        println!("Not a refresh day; nothing to do");
        return Ok(());
    }

    let mut cfg = AppConfig::from_env();
    if let Some(dir) = parse_arg("--data-dir") {
        cfg.data_dir = PathBuf::from(dir);
    }
    let season_type = parse_arg("--season-type")
        .map(|raw| raw.parse::<SeasonType>())
        .transpose()?
        .unwrap_or(SeasonType::Regular);
    let season_arg = parse_arg("--season")
        .map(|raw| raw.parse::<i32>().with_context(|| format!("invalid --season {raw:?}")))
        .transpose()?;
    let week_arg = parse_arg("--week")
        .map(|raw| raw.parse::<u32>().with_context(|| format!("invalid --week {raw:?}")))
        .transpose()?;

    let engine = PredictionEngine::from_config(&cfg);
    let now = Utc::now();
    let season = season_arg.unwrap_or_else(|| infer_display_season(now.date_naive()));
    let week = match week_arg {
        Some(week) => week,
        None => {
            let schedule = engine.schedules().schedule(season)?;
            infer_display_week(&schedule, now).unwrap_or(FALLBACK_WEEK)
        }
    };

    println!("Refreshing week {week}, {season_type} {season}");
    let slate = engine.get_matchups_for_week(season, week, season_type)?;
    if slate.is_empty() {
        println!("No matchups found; nothing written");
        return Ok(());
    }

    let predictions = engine.predict_week(&slate, season)?;
    let report = export_week(&cfg.data_dir, season, week, season_type, &slate, &predictions)?;
    info!(
        games = report.games,
        predictions = report.predictions,
        "refresh complete"
    );

    if has_flag("--json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Saved matchups to {}", report.matchups_path.display());
        println!("Saved predictions to {}", report.predictions_path.display());
        println!("Games: {}  Player rows: {}", report.games, report.predictions);
    }
    Ok(())
}

fn parse_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

fn has_flag(flag: &str) -> bool {
    std::env::args().skip(1).any(|a| a == flag)
}
