//! Loosely-typed tables as they arrive from a source, plus the sources
//! themselves.
//!
//! Nothing here knows about schedules or player stats. A [`RawTable`] is a
//! header row and string cells; the schedule and stats modules map it onto
//! their own fixed record types.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::http_client::fetch_bytes;

pub const SEASON_PLACEHOLDER: &str = "{season}";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Header names are trimmed and lower-cased so lookups are
    /// case-insensitive regardless of the source's conventions.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers
            .into_iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .collect();
        Self { headers, rows }
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr
            .headers()
            .context("read csv header")?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(anyhow!("csv payload has no header row"));
        }

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for record in rdr.records() {
            let Ok(record) = record else {
                skipped += 1;
                continue;
            };
            rows.push(record.iter().map(str::to_string).collect());
        }
        if skipped > 0 {
            debug!(skipped, "skipped unreadable csv records");
        }
        Ok(Self::new(headers, rows))
    }

    pub fn from_csv_str(raw: &str) -> Result<Self> {
        Self::from_csv_reader(raw.as_bytes())
    }

    pub fn from_parquet_file(path: &Path) -> Result<Self> {
        let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
        let reader = SerializedFileReader::new(file).context("open parquet reader")?;
        let headers = reader
            .metadata()
            .file_metadata()
            .schema_descr()
            .root_schema()
            .get_fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect::<Vec<_>>();
        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();

        let iter = reader.get_row_iter(None).context("iterate parquet rows")?;
        let mut rows = Vec::new();
        for row in iter {
            let Ok(row) = row else {
                continue;
            };
            let mut cells = vec![String::new(); headers.len()];
            for (name, field) in row.get_column_iter() {
                if let Some(&idx) = index.get(name.as_str()) {
                    cells[idx] = field_to_cell(field);
                }
            }
            rows.push(cells);
        }
        Ok(Self::new(headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        let name = name.to_ascii_lowercase();
        self.headers.iter().position(|h| *h == name)
    }

    /// First column present among `names`, in priority order.
    pub fn first_column(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| self.column(name))
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|cells| Record { cells })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    cells: &'a [String],
}

impl<'a> Record<'a> {
    /// Trimmed cell at `column`. Absent columns, ragged rows and blank or
    /// NA-style cells all read as `None`.
    pub fn get(&self, column: Option<usize>) -> Option<&'a str> {
        let raw = self.cells.get(column?)?.trim();
        if raw.is_empty() || is_na(raw) {
            None
        } else {
            Some(raw)
        }
    }
}

fn is_na(raw: &str) -> bool {
    matches!(raw, "NA" | "NaN" | "nan" | "None" | "null" | "NULL" | "<NA>")
}

fn field_to_cell(field: &Field) -> String {
    match field {
        Field::Null => String::new(),
        Field::Str(s) => s.clone(),
        Field::Bool(b) => b.to_string(),
        Field::Byte(v) => v.to_string(),
        Field::Short(v) => v.to_string(),
        Field::Int(v) => v.to_string(),
        Field::Long(v) => v.to_string(),
        Field::UByte(v) => v.to_string(),
        Field::UShort(v) => v.to_string(),
        Field::UInt(v) => v.to_string(),
        Field::ULong(v) => v.to_string(),
        Field::Float(v) => v.to_string(),
        Field::Double(v) => v.to_string(),
        other => other.to_string(),
    }
}

/// Anything that can produce a raw table for a season.
pub trait TableSource: Send + Sync {
    fn describe(&self) -> String;
    fn fetch(&self, season: i32) -> Result<RawTable>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn from_location(location: &str) -> Self {
        let path = location.split(['?', '#']).next().unwrap_or(location);
        if path.to_ascii_lowercase().ends_with(".parquet") {
            TableFormat::Parquet
        } else {
            TableFormat::Csv
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteTable {
    pub url_template: String,
    pub format: TableFormat,
    pub timeout: Duration,
}

impl TableSource for RemoteTable {
    fn describe(&self) -> String {
        self.url_template.clone()
    }

    fn fetch(&self, season: i32) -> Result<RawTable> {
        let url = expand_template(&self.url_template, season);
        let body = fetch_bytes(&url, self.timeout)?;
        match self.format {
            TableFormat::Csv => RawTable::from_csv_reader(body.as_slice())
                .with_context(|| format!("invalid csv from {url}")),
            TableFormat::Parquet => {
                let path = scratch_path(&url, season)?;
                fs::write(&path, &body).with_context(|| format!("write {}", path.display()))?;
                let table = RawTable::from_parquet_file(&path)
                    .with_context(|| format!("invalid parquet from {url}"));
                let _ = fs::remove_file(&path);
                table
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalTable {
    pub path_template: String,
    pub format: TableFormat,
}

impl TableSource for LocalTable {
    fn describe(&self) -> String {
        self.path_template.clone()
    }

    fn fetch(&self, season: i32) -> Result<RawTable> {
        let path = PathBuf::from(expand_template(&self.path_template, season));
        match self.format {
            TableFormat::Csv => {
                let file =
                    fs::File::open(&path).with_context(|| format!("open {}", path.display()))?;
                RawTable::from_csv_reader(file)
                    .with_context(|| format!("invalid csv in {}", path.display()))
            }
            TableFormat::Parquet => RawTable::from_parquet_file(&path),
        }
    }
}

/// Build a source from a location template. `http(s)://` locations are
/// fetched remotely; anything else (optionally `file://`) is read from disk.
pub fn source_from_template(template: &str, timeout: Duration) -> Box<dyn TableSource> {
    let template = template.trim();
    let format = TableFormat::from_location(template);
    let lowered = template.to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        Box::new(RemoteTable {
            url_template: template.to_string(),
            format,
            timeout,
        })
    } else {
        let path = template.strip_prefix("file://").unwrap_or(template);
        Box::new(LocalTable {
            path_template: path.to_string(),
            format,
        })
    }
}

pub fn expand_template(template: &str, season: i32) -> String {
    template.replace(SEASON_PLACEHOLDER, &season.to_string())
}

/// Try each source in order and return the first table that `parse` accepts.
///
/// A fetch error and a parse error are treated the same: log, remember, move
/// on. Only when every candidate has failed does this surface an error, and
/// it carries the last candidate's cause.
pub fn fetch_with_fallback<T>(
    dataset: &'static str,
    sources: &[Box<dyn TableSource>],
    season: i32,
    mut parse: impl FnMut(RawTable) -> Result<T>,
) -> Result<T, SourceError> {
    let mut last_err: Option<anyhow::Error> = None;
    for (idx, source) in sources.iter().enumerate() {
        let label = source.describe();
        debug!(dataset, season, candidate = idx, source = %label, "fetching");
        let attempt = source
            .fetch(season)
            .with_context(|| format!("fetch {label}"))
            .and_then(&mut parse);
        match attempt {
            Ok(out) => return Ok(out),
            Err(err) => {
                let detail = format!("{err:#}");
                warn!(dataset, season, source = %label, error = %detail, "source failed");
                last_err = Some(err);
            }
        }
    }
    Err(SourceError::unavailable(
        dataset,
        season,
        sources.len(),
        last_err.unwrap_or_else(|| anyhow!("no {dataset} sources configured")),
    ))
}

fn scratch_path(url: &str, season: i32) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join("anytime_td");
    fs::create_dir_all(&dir).context("create scratch directory")?;
    let stem = url
        .split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("table.parquet")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect::<String>();
    Ok(dir.join(format!("{}_{season}_{stem}", std::process::id())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_lowercased_and_cells_trimmed() {
        let table = RawTable::from_csv_str("Season,Week,Home_Team\n2024, 1 ,KC\n2024,NA,\n").unwrap();
        assert_eq!(table.headers(), &["season", "week", "home_team"]);
        let rows: Vec<_> = table.records().collect();
        assert_eq!(rows[0].get(table.column("WEEK")), Some("1"));
        assert_eq!(rows[1].get(table.column("week")), None);
        assert_eq!(rows[1].get(table.column("home_team")), None);
        assert_eq!(rows[0].get(table.column("missing")), None);
    }

    #[test]
    fn ragged_rows_read_as_missing() {
        let table = RawTable::from_csv_str("a,b,c\n1\n1,2,3,4\n").unwrap();
        let rows: Vec<_> = table.records().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(table.column("c")), None);
        assert_eq!(rows[1].get(table.column("c")), Some("3"));
    }

    #[test]
    fn format_follows_extension_before_query() {
        assert_eq!(
            TableFormat::from_location("https://x/player_stats_2023.parquet?raw=1"),
            TableFormat::Parquet
        );
        assert_eq!(
            TableFormat::from_location("https://x/sched_2023.csv?raw=1"),
            TableFormat::Csv
        );
    }

    #[test]
    fn template_expands_season() {
        assert_eq!(expand_template("sched_{season}.csv", 2024), "sched_2024.csv");
        assert_eq!(
            source_from_template("file:///tmp/sched_{season}.csv", Duration::from_secs(1))
                .describe(),
            "/tmp/sched_{season}.csv"
        );
    }
}
