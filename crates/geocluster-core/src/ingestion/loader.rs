//! Delimited table loader

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, info};

use super::schema::{ColumnMap, LogicalField};
use crate::config::{LoaderConfig, TextEncoding};
use crate::error::{Error, Result};
use crate::types::{EventRecord, OptionalField};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Cell texts treated as missing for string columns
const MISSING_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Normalized rows plus the column mapping they were read with
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<EventRecord>,
    pub columns: ColumnMap,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Row counts from one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
}

/// Reads a delimited table into normalized event records
pub struct TableLoader {
    config: LoaderConfig,
}

impl TableLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Load and normalize a table from disk
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<(Dataset, LoadReport)> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        info!("Loading events from {}", path.display());
        self.load_reader(BufReader::new(file))
    }

    /// Load and normalize a table from any reader
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<(Dataset, LoadReport)> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.config.delimiter as u8)
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .byte_headers()?
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let raw = if i == 0 {
                    raw.strip_prefix(UTF8_BOM).unwrap_or(raw)
                } else {
                    raw
                };
                self.decode(raw).trim().to_string()
            })
            .collect();

        let columns = ColumnMap::resolve(&headers)?;
        debug!(
            latitude = columns.column_name(LogicalField::Latitude),
            longitude = columns.column_name(LogicalField::Longitude),
            severity = columns.column_name(LogicalField::Severity),
            year = columns.column_name(LogicalField::Year),
            region = columns.column_name(LogicalField::Region),
            "Resolved input columns"
        );

        let mut records = Vec::new();
        let mut report = LoadReport::default();
        let mut row = csv::ByteRecord::new();

        while csv_reader.read_byte_record(&mut row)? {
            report.rows_read += 1;
            match self.normalize_row(&row, &columns) {
                Some(record) => records.push(record),
                None => report.rows_dropped += 1,
            }
        }
        report.rows_kept = records.len();

        info!(
            "Loaded {} rows ({} kept, {} dropped)",
            report.rows_read, report.rows_kept, report.rows_dropped
        );

        Ok((Dataset { records, columns }, report))
    }

    /// Coerce one row; `None` when its coordinates are missing or out of bounds
    fn normalize_row(&self, row: &csv::ByteRecord, columns: &ColumnMap) -> Option<EventRecord> {
        let latitude = parse_number(&self.cell(row, Some(columns.latitude))?)?;
        let longitude = parse_number(&self.cell(row, Some(columns.longitude))?)?;

        let mut record = EventRecord::new(latitude, longitude);
        if !record.has_valid_coordinates() {
            return None;
        }

        if columns.severity.is_some() {
            record.severity = OptionalField::from_cell(
                self.cell(row, columns.severity)
                    .and_then(|s| parse_integer(&s))
                    .filter(|v| *v >= 0),
            );
        }
        if columns.year.is_some() {
            record.year =
                OptionalField::from_cell(self.cell(row, columns.year).and_then(|s| parse_integer(&s)));
        }
        if columns.region.is_some() {
            record.region =
                OptionalField::from_cell(self.cell(row, columns.region).and_then(clean_label));
        }

        Some(record)
    }

    /// Decoded cell text; `None` for an absent column or a short row
    fn cell(&self, row: &csv::ByteRecord, index: Option<usize>) -> Option<String> {
        row.get(index?).map(|raw| self.decode(raw))
    }

    fn decode(&self, raw: &[u8]) -> String {
        match self.config.encoding {
            TextEncoding::Latin1 => raw.iter().map(|&b| b as char).collect(),
            TextEncoding::Utf8 => String::from_utf8_lossy(raw).into_owned(),
        }
    }
}

/// Parse a numeric cell; empty, unparsable and NaN cells are missing
fn parse_number(cell: &str) -> Option<f64> {
    let value: f64 = cell.trim().parse().ok()?;
    (!value.is_nan()).then_some(value)
}

/// Parse a numeric cell and truncate toward zero; non-finite values are missing
fn parse_integer(cell: &str) -> Option<i64> {
    let value = parse_number(cell)?;
    value.is_finite().then(|| value.trunc() as i64)
}

fn clean_label(cell: String) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || MISSING_TOKENS.contains(&trimmed) {
        None
    } else if trimmed.len() == cell.len() {
        Some(cell)
    } else {
        Some(trimmed.to_string())
    }
}
