// Retail ETL - Core Library
// Daily retail extracts → canonical records → SQLite, reconciled by id

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod filename;
pub mod logging;
pub mod normalize;
pub mod pipeline;

// Re-export commonly used types
pub use config::EtlConfig;
pub use db::{
    LoadOutcome, LoadReport, ReconcilingLoader,
    count_transactions, get_all_transactions, get_transactions_by_id, reconcile, setup_database,
};
pub use error::{EtlError, EtlResult};
pub use extract::{RawRecord, discover_input_files, read_csv, read_csv_file};
pub use filename::extract_date_from_filename;
pub use logging::init_file_logging;
pub use normalize::{Batch, NormalizeStats, RecordNormalizer, TransactionRecord};
pub use pipeline::{FileOutcome, PipelineRunner, RunStatus, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
