//! `gcassert list`

use super::{report_error, EXIT_CLEAN};
use anyhow::{Context, Result};
use gcassert::{Config, ListedDirective, OutputFormat};
use std::io::{self, Write};

pub fn handle_list(config: &Config, package: &str) -> i32 {
    match run(config, package) {
        Ok(()) => EXIT_CLEAN,
        Err(e) => report_error(&e),
    }
}

fn run(config: &Config, package: &str) -> Result<()> {
    let work_dir = config.resolve_work_dir()?;
    let (index, _) = gcassert::load_index(&work_dir, package)
        .with_context(|| format!("failed to load {package}"))?;
    let listed = index.list()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_listing(&mut out, &listed, config.format)?;
    out.flush()?;
    Ok(())
}

fn write_listing<W: Write>(out: &mut W, listed: &[ListedDirective], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            for d in listed {
                writeln!(out, "{}:{}:\t{}: {}", d.path, d.line, d.source, d.directive)?;
            }
        }
        OutputFormat::Json => {
            for d in listed {
                serde_json::to_writer(&mut *out, d)?;
                out.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}
