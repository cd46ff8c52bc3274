mod common;

use anytime_td::matchups::resolve_matchups;
use anytime_td::period::infer_display_week;
use anytime_td::schedule::{Schedule, SeasonType, normalize_schedule};
use anytime_td::table::RawTable;
use chrono::{TimeZone, Utc};

use common::fixture_table;

fn fixture_schedule() -> Schedule {
    normalize_schedule(&fixture_table("sched_2024.csv"), 2024).unwrap()
}

#[test]
fn week_one_is_sorted_by_kickoff() {
    let slate = resolve_matchups(&fixture_schedule(), 2024, 1, SeasonType::Regular);
    // ARI at BUF has no kickoff and is left out.
    assert_eq!(
        slate.game_ids().collect::<Vec<_>>(),
        vec!["2024_01_BAL_KC", "2024_01_GB_PHI", "2024_01_PIT_ATL"]
    );

    let labels: Vec<&str> = slate.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "BAL at KC — Thu 8:20 PM ET",
            "GB at PHI — Fri 8:15 PM ET",
            "PIT at ATL — Sun 1:00 PM ET",
        ]
    );

    let kc = slate.get("2024_01_BAL_KC").unwrap();
    assert_eq!(kc.home, "KC");
    assert_eq!(kc.away, "BAL");
    assert_eq!(kc.season, 2024);
    assert_eq!(kc.week, 1);
    assert_eq!(kc.kickoff_local.offset().local_minus_utc(), -4 * 3600);
}

#[test]
fn season_type_filters_the_week() {
    let schedule = fixture_schedule();
    let pre = resolve_matchups(&schedule, 2024, 1, SeasonType::Pre);
    assert_eq!(pre.game_ids().collect::<Vec<_>>(), vec!["2024_00_NYG_DET"]);
    assert!(resolve_matchups(&schedule, 2024, 1, SeasonType::Post).is_empty());
}

#[test]
fn week_without_games_is_an_empty_slate() {
    let slate = resolve_matchups(&fixture_schedule(), 2024, 9, SeasonType::Regular);
    assert!(slate.is_empty());
    assert_eq!(slate.len(), 0);
}

#[test]
fn every_resolved_matchup_has_distinct_teams() {
    let schedule = fixture_schedule();
    for week in 1..=2 {
        for m in &resolve_matchups(&schedule, 2024, week, SeasonType::Regular) {
            assert_ne!(m.home, m.away);
            assert_eq!(m.kickoff_local, m.kickoff_utc);
        }
    }
}

#[test]
fn default_week_tracks_the_calendar() {
    let schedule = fixture_schedule();
    let before = Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap();
    let between = Utc.with_ymd_and_hms(2024, 9, 10, 12, 0, 0).unwrap();
    let after = Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap();
    assert_eq!(infer_display_week(&schedule, before), Some(1));
    assert_eq!(infer_display_week(&schedule, between), Some(2));
    assert_eq!(infer_display_week(&schedule, after), Some(2));
}

#[test]
fn row_without_season_belongs_to_requested_season() {
    let table = RawTable::from_csv_str(
        "game_id,season,game_type,week,kickoff_in_utc,away_team,home_team\n\
         g1,,REG,1,2024-09-08T17:00:00Z,PIT,ATL\n\
         g2,2024,REG,1,2024-09-08T20:25:00Z,DEN,SEA\n",
    )
    .unwrap();
    let schedule = normalize_schedule(&table, 2024).unwrap();
    let slate = resolve_matchups(&schedule, 2024, 1, SeasonType::Regular);
    assert_eq!(slate.game_ids().collect::<Vec<_>>(), vec!["g1", "g2"]);
    assert_eq!(slate.get("g1").map(|m| m.season), Some(2024));
}

#[test]
fn duplicate_game_ids_keep_kickoff_order() {
    let table = RawTable::from_csv_str(
        "game_id,season,game_type,week,kickoff_in_utc,away_team,home_team\n\
         dup,2024,REG,1,2024-09-08T17:00:00Z,PIT,ATL\n\
         mid,2024,REG,1,2024-09-08T20:05:00Z,LV,LAC\n\
         dup,2024,REG,1,2024-09-08T20:25:00Z,DEN,SEA\n",
    )
    .unwrap();
    let schedule = normalize_schedule(&table, 2024).unwrap();
    let slate = resolve_matchups(&schedule, 2024, 1, SeasonType::Regular);
    assert_eq!(slate.game_ids().collect::<Vec<_>>(), vec!["mid", "dup"]);
    assert!(slate.iter().zip(slate.iter().skip(1)).all(|(a, b)| a.kickoff_utc <= b.kickoff_utc));
    assert_eq!(slate.get("dup").map(|m| m.home.as_str()), Some("SEA"));
}
