use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};

use crate::schedule::{Schedule, SeasonType};

/// Used when a schedule carries no usable week numbers at all.
pub const FALLBACK_WEEK: u32 = 1;

/// The season to show by default on `today`.
///
/// A season runs September through early February, so February to July
/// still belongs to the previous year's season.
pub fn infer_display_season(today: NaiveDate) -> i32 {
    if (2..=7).contains(&today.month()) {
        today.year() - 1
    } else {
        today.year()
    }
}

/// The week to show by default at `now`: the week of the next regular-season
/// kickoff, or the last regular-season week once everything has kicked off.
///
/// With no dated regular-season rows, falls back to the most common week in
/// the whole schedule (lowest week on a tie). `None` only when the schedule
/// has no week numbers at all.
pub fn infer_display_week(schedule: &Schedule, now: DateTime<Utc>) -> Option<u32> {
    let dated_regular: Vec<(DateTime<Utc>, u32)> = schedule
        .rows
        .iter()
        .filter(|r| r.season_type == Some(SeasonType::Regular))
        .filter_map(|r| Some((r.kickoff_utc?, r.week?)))
        .collect();

    if dated_regular.is_empty() {
        return most_common_week(schedule);
    }

    let upcoming = dated_regular
        .iter()
        .filter(|(kickoff, _)| *kickoff >= now)
        .min_by_key(|(kickoff, _)| *kickoff);
    match upcoming {
        Some((_, week)) => Some(*week),
        None => dated_regular.iter().map(|(_, week)| *week).max(),
    }
}

fn most_common_week(schedule: &Schedule) -> Option<u32> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for week in schedule.weeks() {
        *counts.entry(week).or_default() += 1;
    }
    // BTreeMap iterates weeks ascending, and max_by_key keeps the last max,
    // so walk it in reverse to let the lowest week win ties.
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, n)| *n)
        .map(|(week, _)| week)
}

/// Days the offline refresh job is expected to run: Tuesday, once the
/// previous week is final, and Saturday, ahead of the main slate.
pub fn is_refresh_day(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Tue | Weekday::Sat)
}
