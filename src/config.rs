// ⚙️ Run Configuration - where extracts, store and logs live
// Defaults match the historical layout; environment variables override

use std::path::PathBuf;

pub const DEFAULT_INPUT_DIR: &str = "data/input_data";
pub const DEFAULT_FILE_PATTERN: &str = "retail_*.csv";
pub const DEFAULT_DB_PATH: &str = "retail.db";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Runtime configuration for one ETL run
#[derive(Debug, Clone, PartialEq)]
pub struct EtlConfig {
    /// Directory scanned for daily extracts
    pub input_dir: PathBuf,
    /// Glob pattern matched against file names inside `input_dir`
    pub file_pattern: String,
    /// SQLite database holding the `transactions` table
    pub db_path: PathBuf,
    /// Directory receiving one log file per run
    pub log_dir: PathBuf,
    /// Stop the whole run on an extract/transform failure (otherwise skip the file)
    pub abort_on_parse_error: bool,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            abort_on_parse_error: true,
        }
    }
}

impl EtlConfig {
    /// Load from environment variables (and an optional `.env` file).
    ///
    /// Rejected values keep their default and are returned as warnings, to be
    /// logged once the run log exists.
    pub fn from_env() -> (Self, Vec<String>) {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> (Self, Vec<String>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = EtlConfig::default();
        let mut warnings = Vec::new();

        if let Some(dir) = lookup("RETAIL_ETL_INPUT_DIR") {
            config.input_dir = PathBuf::from(dir);
        }

        if let Some(pattern) = lookup("RETAIL_ETL_FILE_PATTERN") {
            if !pattern.trim().is_empty() {
                config.file_pattern = pattern;
            }
        }

        if let Some(db) = lookup("RETAIL_ETL_DB_PATH") {
            config.db_path = PathBuf::from(db);
        }

        if let Some(dir) = lookup("RETAIL_ETL_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }

        if let Some(flag) = lookup("RETAIL_ETL_ABORT_ON_PARSE_ERROR") {
            match flag.trim().to_ascii_lowercase().parse::<bool>() {
                Ok(value) => config.abort_on_parse_error = value,
                Err(e) => warnings.push(format!(
                    "Failed to parse RETAIL_ETL_ABORT_ON_PARSE_ERROR '{}': {}, using default: {}",
                    flag, e, config.abort_on_parse_error
                )),
            }
        }

        (config, warnings)
    }

    /// Full glob expression for input discovery
    pub fn input_glob(&self) -> String {
        self.input_dir
            .join(&self.file_pattern)
            .to_string_lossy()
            .into_owned()
    }
}
