use anyhow::Result;
use chrono::Utc;
use std::process::ExitCode;

use retail_etl::{init_file_logging, EtlConfig, PipelineRunner, RunStatus};

fn main() -> Result<ExitCode> {
    let (config, warnings) = EtlConfig::from_env();
    let started_at = Utc::now();

    // Nothing else reports failures, so a missing log file is fatal
    init_file_logging(&config.log_dir, started_at)?;

    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("etl_run", %run_id);
    let _enter = span.enter();

    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    let result = PipelineRunner::new(config).run();
    match &result {
        Ok(summary) if !summary.no_input() => {
            tracing::info!("THE ETL PROCESS IS DONE: {}", summary.summary());
        }
        Ok(_) => {}
        Err(e) => tracing::error!("Fatal error, run aborted: {}", e),
    }

    Ok(ExitCode::from(RunStatus::from_result(&result).exit_code()))
}
