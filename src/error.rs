use std::error::Error as StdError;

use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Hard failures surfaced by the source layer.
///
/// Per-row problems (missing teams, unparseable kickoffs, blank stat cells)
/// never show up here: they are absorbed where the row is normalised.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(
        "could not fetch {dataset} for season {season} after {attempts} source(s): {last_cause}"
    )]
    SourceUnavailable {
        dataset: &'static str,
        season: i32,
        attempts: usize,
        #[source]
        last_cause: BoxError,
    },
}

impl SourceError {
    pub fn unavailable(
        dataset: &'static str,
        season: i32,
        attempts: usize,
        last_cause: anyhow::Error,
    ) -> Self {
        SourceError::SourceUnavailable {
            dataset,
            season,
            attempts,
            last_cause: last_cause.into(),
        }
    }

    pub fn season(&self) -> i32 {
        match self {
            SourceError::SourceUnavailable { season, .. } => *season,
        }
    }

    pub fn attempts(&self) -> usize {
        match self {
            SourceError::SourceUnavailable { attempts, .. } => *attempts,
        }
    }
}
