//! `gcassert verify`

use super::{report_error, EXIT_CLEAN, EXIT_FAILURES};
use anyhow::{Context, Result};
use gcassert::{Config, ReportWriter, VerifySummary};
use std::io;
use std::path::Path;
use tracing::info;

pub async fn handle_verify(config: &Config, package: &str, log: Option<&Path>) -> i32 {
    match run(config, package, log).await {
        Ok(summary) if summary.passed() => EXIT_CLEAN,
        Ok(summary) => {
            info!(failures = summary.failures, "assertions failed");
            EXIT_FAILURES
        }
        Err(e) => report_error(&e),
    }
}

async fn run(config: &Config, package: &str, log: Option<&Path>) -> Result<VerifySummary> {
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock(), config.format);
    let summary = match log {
        Some(log) => gcassert::verify_log(config, package, log, &mut writer)
            .with_context(|| format!("failed to check {package} against {}", log.display()))?,
        None => gcassert::verify(config, package, &mut writer)
            .await
            .with_context(|| format!("failed to verify {package}"))?,
    };
    Ok(summary)
}
