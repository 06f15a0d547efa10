//! Run configuration

use crate::error::{GcAssertError, Result};
use crate::report::OutputFormat;
use std::path::PathBuf;

/// Go toolchain binary used when nothing else is configured.
pub const DEFAULT_GO: &str = "go";

/// Compiler flags that make `go build` print inlining decisions and the
/// bounds checks it kept.
pub const DEFAULT_GCFLAGS: &str = "all=-m -m -d=ssa/check_bce/debug=1";

/// Lines buffered between the pipe drainers and the correlator.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Settings for a gcassert run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Go toolchain binary.
    pub go: String,
    /// Value passed as `-gcflags=`.
    pub gcflags: String,
    /// Extra arguments placed before the package in `go build`.
    pub build_args: Vec<String>,
    /// Directory the build runs in and reports are relative to; the process
    /// working directory when unset.
    pub work_dir: Option<PathBuf>,
    /// Capacity of the line channel fed by the pipe drainers.
    pub channel_capacity: usize,
    /// How failures are written.
    pub format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            go: DEFAULT_GO.to_string(),
            gcflags: DEFAULT_GCFLAGS.to_string(),
            build_args: Vec::new(),
            work_dir: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            format: OutputFormat::Human,
        }
    }
}

impl Config {
    /// The working directory for this run, made absolute.
    pub fn resolve_work_dir(&self) -> Result<PathBuf> {
        let cwd = std::env::current_dir().map_err(GcAssertError::WorkingDir)?;
        Ok(match &self.work_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd,
        })
    }
}
