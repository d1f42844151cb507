// 🧹 Record Normalizer - raw rows → validated Batch
// Steps run in a fixed order; each one assumes the previous has completed:
//   date injection → rename → null drop → dedup by id → type coercion → key index

use crate::error::{EtlError, EtlResult};
use crate::extract::RawRecord;
use crate::filename::extract_date_from_filename;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const COL_ID: &str = "id";
pub const COL_TRANSACTION_DATE: &str = "transaction_date";
pub const COL_CATEGORY: &str = "category";
pub const COL_NAME: &str = "name";
pub const COL_DESCRIPTION: &str = "description";
pub const COL_QUANTITY: &str = "quantity";
pub const COL_AMOUNT_EXCL_TAX: &str = "amount_excl_tax";
pub const COL_AMOUNT_INC_TAX: &str = "amount_inc_tax";

/// Canonical columns, in store order
pub const CANONICAL_COLUMNS: [&str; 7] = [
    COL_ID,
    COL_TRANSACTION_DATE,
    COL_CATEGORY,
    COL_NAME,
    COL_QUANTITY,
    COL_AMOUNT_EXCL_TAX,
    COL_AMOUNT_INC_TAX,
];

// ============================================================================
// CANONICAL RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Business key
    pub id: String,
    /// ISO `YYYY-MM-DD`, taken from the source filename
    pub transaction_date: String,
    pub category: String,
    pub name: String,
    pub quantity: i64,
    pub amount_excl_tax: f64,
    pub amount_inc_tax: f64,
}

// ============================================================================
// BATCH
// ============================================================================

/// Normalized records of one input file, indexed by `id`
#[derive(Debug, Clone, Default)]
pub struct Batch {
    records: Vec<TransactionRecord>,
    index: HashMap<String, usize>,
}

impl Batch {
    /// Build a batch; a repeated id replaces the earlier record in place
    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        let mut batch = Batch::default();
        for record in records {
            match batch.index.get(&record.id) {
                Some(&pos) => batch.records[pos] = record,
                None => {
                    batch.index.insert(record.id.clone(), batch.records.len());
                    batch.records.push(record);
                }
            }
        }
        batch
    }

    pub fn get(&self, id: &str) -> Option<&TransactionRecord> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Ids in retained file order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.id.as_str())
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// NORMALIZER
// ============================================================================

/// Row counts observed while normalizing one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeStats {
    pub rows_in: usize,
    pub dropped_incomplete: usize,
    pub dropped_duplicates: usize,
    pub rows_out: usize,
}

pub struct RecordNormalizer;

impl RecordNormalizer {
    /// Run every transformation step over the rows of `file_name`
    pub fn normalize(rows: Vec<RawRecord>, file_name: &str) -> EtlResult<(Batch, NormalizeStats)> {
        tracing::debug!("Start transform_data");
        let mut stats = NormalizeStats {
            rows_in: rows.len(),
            ..NormalizeStats::default()
        };
        tracing::debug!("rows: {}", rows.len());

        tracing::debug!("transaction_date");
        let date = extract_date_from_filename(file_name)?;
        let rows = inject_date(rows, &date);

        tracing::debug!("Rename columns");
        let rows = rename_columns(rows);

        tracing::debug!("Remove Null value");
        let before = rows.len();
        let rows = drop_incomplete(rows);
        stats.dropped_incomplete = before - rows.len();
        tracing::debug!("rows: {}", rows.len());

        tracing::debug!("Remove duplicate");
        let before = rows.len();
        let rows = keep_last_by_id(rows);
        stats.dropped_duplicates = before - rows.len();
        tracing::debug!("rows: {}", rows.len());

        tracing::debug!("Convert columns type");
        let records = coerce_types(&rows)?;

        let batch = Batch::from_records(records);
        stats.rows_out = batch.len();

        tracing::info!("Data transformation step: Done");
        Ok((batch, stats))
    }
}

/// Step 1: every row of the file shares the filename date
pub fn inject_date(mut rows: Vec<RawRecord>, date: &str) -> Vec<RawRecord> {
    for row in rows.iter_mut() {
        row.insert(1, COL_TRANSACTION_DATE, Some(date.to_string()));
    }
    rows
}

/// Step 2: `description` → `name`, everything else untouched
pub fn rename_columns(mut rows: Vec<RawRecord>) -> Vec<RawRecord> {
    for row in rows.iter_mut() {
        row.rename(COL_DESCRIPTION, COL_NAME);
    }
    rows
}

/// Step 3: drop rows with a null in any column
pub fn drop_incomplete(rows: Vec<RawRecord>) -> Vec<RawRecord> {
    rows.into_iter().filter(|row| !row.has_null()).collect()
}

/// Step 4: keep only the last row per id, preserving file order of survivors
pub fn keep_last_by_id(rows: Vec<RawRecord>) -> Vec<RawRecord> {
    let mut last_seen: HashMap<Option<String>, usize> = HashMap::new();
    for (pos, row) in rows.iter().enumerate() {
        last_seen.insert(row.get(COL_ID).map(str::to_string), pos);
    }
    let keep: HashSet<usize> = last_seen.into_values().collect();

    rows.into_iter()
        .enumerate()
        .filter(|(pos, _)| keep.contains(pos))
        .map(|(_, row)| row)
        .collect()
}

/// Step 5: cast to the canonical schema; any failure rejects the whole batch
pub fn coerce_types(rows: &[RawRecord]) -> EtlResult<Vec<TransactionRecord>> {
    if let Some(first) = rows.first() {
        for column in CANONICAL_COLUMNS {
            if !first.has_column(column) {
                return Err(EtlError::MissingColumn {
                    column: column.to_string(),
                });
            }
        }
    }

    rows.iter().map(coerce_row).collect()
}

fn coerce_row(row: &RawRecord) -> EtlResult<TransactionRecord> {
    let id = text(row, COL_ID, "")?;

    Ok(TransactionRecord {
        transaction_date: text(row, COL_TRANSACTION_DATE, &id)?,
        category: text(row, COL_CATEGORY, &id)?,
        name: text(row, COL_NAME, &id)?,
        quantity: integer(row, COL_QUANTITY, &id)?,
        amount_excl_tax: float(row, COL_AMOUNT_EXCL_TAX, &id)?,
        amount_inc_tax: float(row, COL_AMOUNT_INC_TAX, &id)?,
        id,
    })
}

fn value<'a>(row: &'a RawRecord, column: &str, id: &str, expected: &'static str) -> EtlResult<&'a str> {
    row.get(column).ok_or_else(|| EtlError::Coercion {
        line: row.line_number,
        id: id.to_string(),
        column: column.to_string(),
        value: String::new(),
        expected,
    })
}

fn text(row: &RawRecord, column: &str, id: &str) -> EtlResult<String> {
    value(row, column, id, "text").map(str::to_string)
}

fn integer(row: &RawRecord, column: &str, id: &str) -> EtlResult<i64> {
    let raw = value(row, column, id, "integer")?;
    let trimmed = raw.trim();

    let parsed = trimmed.parse::<i64>().ok().or_else(|| {
        // "3.0" is accepted, "3.5" is not
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    });

    parsed.ok_or_else(|| EtlError::Coercion {
        line: row.line_number,
        id: id.to_string(),
        column: column.to_string(),
        value: raw.to_string(),
        expected: "integer",
    })
}

fn float(row: &RawRecord, column: &str, id: &str) -> EtlResult<f64> {
    let raw = value(row, column, id, "float")?;
    raw.trim().parse::<f64>().map_err(|_| EtlError::Coercion {
        line: row.line_number,
        id: id.to_string(),
        column: column.to_string(),
        value: raw.to_string(),
        expected: "float",
    })
}
