use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::matchups::Slate;
use crate::roster::PredictionRow;
use crate::schedule::SeasonType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Matchups,
    Predictions,
}

impl ArtifactKind {
    fn suffix(&self) -> &'static str {
        match self {
            ArtifactKind::Matchups => "matchups",
            ArtifactKind::Predictions => "predictions",
        }
    }
}

/// `week{W}_{season_type}_{season}_{matchups|predictions}.csv`
pub fn artifact_file_name(
    week: u32,
    season_type: SeasonType,
    season: i32,
    kind: ArtifactKind,
) -> String {
    format!(
        "week{week}_{}_{season}_{}.csv",
        season_type.code(),
        kind.suffix()
    )
}

pub const MATCHUP_COLUMNS: &[&str] = &[
    "label",
    "home",
    "away",
    "kickoff_utc",
    "kickoff_local",
    "season",
    "week",
    "game_id",
];

pub const PREDICTION_COLUMNS: &[&str] = &[
    "game_id",
    "player_name",
    "team",
    "position",
    "opponent",
    "atd_prob",
    "logo_url",
];

pub fn write_matchups_csv(path: &Path, slate: &Slate) -> Result<()> {
    write_rows(path, MATCHUP_COLUMNS, slate.iter())
}

pub fn write_predictions_csv(path: &Path, rows: &[PredictionRow]) -> Result<()> {
    write_rows(path, PREDICTION_COLUMNS, rows.iter())
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub matchups_path: PathBuf,
    pub predictions_path: PathBuf,
    pub games: usize,
    pub predictions: usize,
}

pub fn export_week(
    dir: &Path,
    season: i32,
    week: u32,
    season_type: SeasonType,
    slate: &Slate,
    predictions: &[PredictionRow],
) -> Result<ExportReport> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let matchups_path = dir.join(artifact_file_name(
        week,
        season_type,
        season,
        ArtifactKind::Matchups,
    ));
    let predictions_path = dir.join(artifact_file_name(
        week,
        season_type,
        season,
        ArtifactKind::Predictions,
    ));
    write_matchups_csv(&matchups_path, slate)?;
    write_predictions_csv(&predictions_path, predictions)?;
    Ok(ExportReport {
        matchups_path,
        predictions_path,
        games: slate.len(),
        predictions: predictions.len(),
    })
}

// Written beside the target and renamed so readers never see a partial file.
// The header is written explicitly so an empty table still carries one.
fn write_rows<T: Serialize>(
    path: &Path,
    header: &[&str],
    rows: impl Iterator<Item = T>,
) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp)
            .with_context(|| format!("create {}", tmp.display()))?;
        writer
            .write_record(header)
            .with_context(|| format!("write header to {}", tmp.display()))?;
        for row in rows {
            writer
                .serialize(row)
                .with_context(|| format!("write row to {}", tmp.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("flush {}", tmp.display()))?;
    }
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}
