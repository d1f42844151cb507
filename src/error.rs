// ⚠️ Error taxonomy for the ETL run
// Fatal input errors stop the run, load errors are isolated to one file

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    /// File name does not follow `retail_<DD>_<MM>_<YYYY>.csv`
    #[error("Malformed filename '{file_name}': {reason}")]
    MalformedFilename { file_name: String, reason: String },

    /// Input file could not be opened or parsed as CSV
    #[error("Failed to read input file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A canonical column is absent from the header row
    #[error("Missing required column '{column}'")]
    MissingColumn { column: String },

    /// A value could not be cast to its canonical type
    #[error("Line {line}, id '{id}': cannot convert {column} value '{value}' to {expected}")]
    Coercion {
        line: usize,
        id: String,
        column: String,
        value: String,
        expected: &'static str,
    },

    /// Store-side failure (connection, statement, commit)
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Row count after reconciliation does not add up
    #[error("Row count mismatch: expected {expected} rows after insertion, found {actual}")]
    CountMismatch { expected: i64, actual: i64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtlError {
    /// Errors raised while extracting or normalizing a file.
    ///
    /// These abort the run when `abort_on_parse_error` is set.
    pub fn is_fatal_input(&self) -> bool {
        matches!(
            self,
            EtlError::MalformedFilename { .. }
                | EtlError::Read { .. }
                | EtlError::MissingColumn { .. }
                | EtlError::Coercion { .. }
        )
    }
}

pub type EtlResult<T> = std::result::Result<T, EtlError>;
