// 🔄 Pipeline Runner - Extract → Normalize → Load, one file at a time

use crate::config::EtlConfig;
use crate::db::{LoadOutcome, LoadReport, ReconcilingLoader};
use crate::error::{EtlError, EtlResult};
use crate::extract::{discover_input_files, read_csv_file};
use crate::normalize::{Batch, NormalizeStats, RecordNormalizer};
use std::path::{Path, PathBuf};

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Batch reconciled and committed
    Loaded {
        stats: NormalizeStats,
        report: LoadReport,
    },
    /// Load failed and was rolled back; the run continued
    LoadFailed { stats: NormalizeStats, message: String },
    /// File had no data rows, nothing was loaded
    Empty,
    /// Extract/transform failed and `abort_on_parse_error` is off
    Rejected(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub files: Vec<(PathBuf, FileOutcome)>,
}

impl RunSummary {
    pub fn files_discovered(&self) -> usize {
        self.files.len()
    }

    pub fn no_input(&self) -> bool {
        self.files.is_empty()
    }

    pub fn loaded_count(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Loaded { .. }))
    }

    pub fn failed_load_count(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::LoadFailed { .. }))
    }

    pub fn empty_count(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Empty))
    }

    pub fn rejected_count(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Rejected(_)))
    }

    /// Rows inserted across all committed files
    pub fn rows_inserted(&self) -> i64 {
        self.files
            .iter()
            .filter_map(|(_, o)| match o {
                FileOutcome::Loaded { report, .. } => Some(report.rows_inserted),
                _ => None,
            })
            .sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} file(s): {} loaded, {} load failure(s), {} empty, {} rejected, {} row(s) inserted",
            self.files_discovered(),
            self.loaded_count(),
            self.failed_load_count(),
            self.empty_count(),
            self.rejected_count(),
            self.rows_inserted()
        )
    }

    fn count<F: Fn(&FileOutcome) -> bool>(&self, pred: F) -> usize {
        self.files.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// How a run ended, as reported through the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every discovered file was processed (load failures included)
    Completed,
    /// No input file matched the pattern
    NoInput,
    /// An extract/transform failure stopped the run
    Aborted,
}

impl RunStatus {
    pub fn from_result(result: &EtlResult<RunSummary>) -> Self {
        match result {
            Ok(summary) if summary.no_input() => RunStatus::NoInput,
            Ok(_) => RunStatus::Completed,
            Err(_) => RunStatus::Aborted,
        }
    }

    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Completed => 0,
            RunStatus::NoInput | RunStatus::Aborted => 1,
        }
    }
}

// ============================================================================
// RUNNER
// ============================================================================

pub struct PipelineRunner {
    config: EtlConfig,
    loader: ReconcilingLoader,
}

impl PipelineRunner {
    pub fn new(config: EtlConfig) -> Self {
        let loader = ReconcilingLoader::new(config.db_path.clone());
        PipelineRunner { config, loader }
    }

    /// Process every discovered file in order.
    ///
    /// Returns `Err` only for an extract/transform failure while
    /// `abort_on_parse_error` is set; load failures never stop the run.
    pub fn run(&self) -> EtlResult<RunSummary> {
        tracing::info!("INPUT DATA FOLDER: {}", self.config.input_dir.display());
        tracing::info!("DATABASE IN USE: {}", self.config.db_path.display());

        let files = discover_input_files(&self.config.input_glob())?;
        tracing::info!("Number of file to process : {}", files.len());

        let mut summary = RunSummary::default();

        if files.is_empty() {
            tracing::info!("THE ETL PROCESS IS DONE");
            tracing::warn!("NO FILE FOUND AT {}", self.config.input_glob());
            return Ok(summary);
        }

        for path in files {
            tracing::info!("---------");
            tracing::info!("file under process : {}", path.display());

            let outcome = match self.process_file(&path) {
                Ok(outcome) => outcome,
                Err(e) if e.is_fatal_input() && !self.config.abort_on_parse_error => {
                    tracing::error!("Skipping {}: {}", path.display(), e);
                    FileOutcome::Rejected(e.to_string())
                }
                Err(e) => {
                    tracing::error!("Aborting run on {}: {}", path.display(), e);
                    return Err(e);
                }
            };

            tracing::info!("Done for the file : {}", path.display());
            summary.files.push((path, outcome));
        }

        tracing::info!("{}", summary.summary());
        Ok(summary)
    }

    /// Extract, normalize and load one file
    pub fn process_file(&self, path: &Path) -> EtlResult<FileOutcome> {
        let rows = read_csv_file(path)?;

        if rows.is_empty() {
            tracing::info!("Empty input file. Nothing else will be done");
            return Ok(FileOutcome::Empty);
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| EtlError::MalformedFilename {
                file_name: path.display().to_string(),
                reason: "not valid UTF-8".to_string(),
            })?;

        let (batch, stats) = RecordNormalizer::normalize(rows, file_name)?;
        tracing::info!("Nb of lines to insert: {}", batch.len());

        Ok(self.load(&batch, stats))
    }

    fn load(&self, batch: &Batch, stats: NormalizeStats) -> FileOutcome {
        match self.loader.load(batch) {
            LoadOutcome::Committed(report) => FileOutcome::Loaded { stats, report },
            LoadOutcome::Failed(message) => FileOutcome::LoadFailed { stats, message },
        }
    }
}
