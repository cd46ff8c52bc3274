#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use anytime_td::table::{RawTable, TableSource};

pub fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

pub fn read_fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("fixture file should be readable")
}

pub fn fixture_table(name: &str) -> RawTable {
    RawTable::from_csv_str(&read_fixture(name)).expect("fixture should parse")
}

/// In-memory source that counts fetches. `None` fails every call.
pub struct FakeSource {
    table: Option<RawTable>,
    calls: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn serving(table: RawTable) -> (Self, Arc<AtomicUsize>) {
        Self::build(Some(table))
    }

    pub fn failing() -> (Self, Arc<AtomicUsize>) {
        Self::build(None)
    }

    fn build(table: Option<RawTable>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                table,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl TableSource for FakeSource {
    fn describe(&self) -> String {
        "fake".to_string()
    }

    fn fetch(&self, season: i32) -> Result<RawTable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .clone()
            .ok_or_else(|| anyhow!("fake source offline for {season}"))
    }
}

pub fn boxed(source: FakeSource) -> Box<dyn TableSource> {
    Box::new(source)
}

pub fn count(calls: &Arc<AtomicUsize>) -> usize {
    calls.load(Ordering::SeqCst)
}
