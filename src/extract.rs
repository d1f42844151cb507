// 📂 Extract - input discovery and CSV reading
// Produces untyped RawRecords; all typing happens in normalize

use crate::error::{EtlError, EtlResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Cell values treated as missing (the default missing-value markers of the
/// tooling that produces and consumes these extracts)
pub const NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// ============================================================================
// RAW RECORD
// ============================================================================

/// One CSV data row: ordered column → optional value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Line in the source file (header is line 1)
    pub line_number: usize,
    fields: Vec<(String, Option<String>)>,
}

impl RawRecord {
    pub fn new(line_number: usize) -> Self {
        RawRecord {
            line_number,
            fields: Vec::new(),
        }
    }

    /// Builder pattern: append a column, mapping null markers to `None`
    pub fn with_field(mut self, column: &str, value: &str) -> Self {
        self.fields.push((column.to_string(), parse_cell(value)));
        self
    }

    /// Builder pattern: append an explicitly missing column value
    pub fn with_null(mut self, column: &str) -> Self {
        self.fields.push((column.to_string(), None));
        self
    }

    /// Value of `column`; `None` if the column is absent or null
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == column)
    }

    /// Insert (or overwrite) a column at `position`
    pub fn insert(&mut self, position: usize, column: &str, value: Option<String>) {
        if let Some(slot) = self.fields.iter_mut().find(|(name, _)| name == column) {
            slot.1 = value;
            return;
        }
        let position = position.min(self.fields.len());
        self.fields.insert(position, (column.to_string(), value));
    }

    /// Rename a column in place; no-op if absent
    pub fn rename(&mut self, from: &str, to: &str) {
        for (name, _) in self.fields.iter_mut() {
            if name == from {
                *name = to.to_string();
            }
        }
    }

    /// True when any column holds a null value
    pub fn has_null(&self) -> bool {
        self.fields.iter().any(|(_, value)| value.is_none())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn parse_cell(value: &str) -> Option<String> {
    if NULL_MARKERS.contains(&value) {
        None
    } else {
        Some(value.to_string())
    }
}

// ============================================================================
// CSV READING
// ============================================================================

/// Read a comma-delimited file with a header row into RawRecords
pub fn read_csv_file(path: &Path) -> EtlResult<Vec<RawRecord>> {
    let file = File::open(path).map_err(|e| EtlError::Read {
        path: path.to_path_buf(),
        source: csv::Error::from(e),
    })?;

    let records = read_csv(file).map_err(|source| EtlError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!("Extract csv file : Done ({} rows)", records.len());
    Ok(records)
}

/// Parse CSV from any reader.
///
/// Short rows get null values for the missing trailing columns; rows with
/// more fields than the header are an error.
pub fn read_csv<R: std::io::Read>(reader: R) -> Result<Vec<RawRecord>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(b',')
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut records = Vec::new();

    for (line_num, result) in rdr.records().enumerate() {
        let row = result?;

        // +2 because: 1-indexed + header row
        let line_number = line_num + 2;
        if row.len() > headers.len() {
            return Err(csv::Error::from(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "line {}: expected {} fields, found {}",
                    line_number,
                    headers.len(),
                    row.len()
                ),
            )));
        }

        let mut record = RawRecord::new(line_number);
        for (pos, column) in headers.iter().enumerate() {
            record = match row.get(pos) {
                Some(value) => record.with_field(column, value),
                None => record.with_null(column),
            };
        }
        records.push(record);
    }

    Ok(records)
}

// ============================================================================
// DISCOVERY
// ============================================================================

/// Regular files matching `pattern` (a glob expression), sorted by path
pub fn discover_input_files(pattern: &str) -> EtlResult<Vec<PathBuf>> {
    let entries = glob::glob(pattern).map_err(|e| {
        EtlError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid input pattern '{pattern}': {e}"),
        ))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!("Skipping unreadable path {}: {}", e.path().display(), e),
        }
    }
    files.sort();

    Ok(files)
}
