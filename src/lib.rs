//! # gcassert
//!
//! Asserts that the Go compiler applied an optimization where the source asks
//! for it.
//!
//! Annotate a Go statement or declaration with a directive comment:
//!
//! ```go
//! func sum(a []int) int {
//!     x := a[5] //gcassert:bce
//!     //gcassert:inline
//!     return add(x, a[4])
//! }
//! ```
//!
//! gcassert parses the package, builds it with the compiler's optimization
//! diagnostics switched on, and reports every directive the diagnostics
//! refute:
//!
//! ```text
//! pkg/sum.go:2:	x := a[5]: Found IsInBounds
//! pkg/sum.go:4:	return add(x, a[4]): call was not inlined
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! let summary = gcassert::gcassert(&gcassert::Config::default(), "./pkg", std::io::stdout())?;
//! assert!(summary.passed());
//! # Ok::<(), gcassert::GcAssertError>(())
//! ```

pub mod build;
pub mod config;
pub mod diagnostics;
pub mod directive;
pub mod error;
pub mod extract;
pub mod index;
pub mod loader;
pub mod parser;
pub mod paths;
pub mod report;
pub mod telemetry;

pub use config::Config;
pub use diagnostics::Diagnostic;
pub use directive::DirectiveKind;
pub use error::{GcAssertError, Result};
pub use index::{DirectiveIndex, ListedDirective};
pub use report::{AssertionFailure, OutputFormat, ReportSink, ReportWriter};

use build::BuildCommand;
use diagnostics::Diagnostics;
use serde::Serialize;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VerifySummary {
    /// Go files parsed.
    pub files: usize,
    /// Directives found in them.
    pub directives: usize,
    /// Directives the compiler output refuted.
    pub failures: usize,
}

impl VerifySummary {
    pub fn passed(&self) -> bool {
        self.failures == 0
    }
}

/// Parse `package` below `work_dir` and index its directives.
///
/// Returns the index and the number of files parsed.
pub fn load_index(work_dir: &Path, package: &str) -> Result<(DirectiveIndex, usize)> {
    let files = loader::load_package(work_dir, package)?;
    let file_count = files.len();
    let mut index = DirectiveIndex::new(work_dir);
    for file in files {
        let file = Arc::new(file);
        let found = extract::extract_directives(&file, &mut index);
        debug!(file = %file.key, found, "scanned file");
    }
    info!(
        files = file_count,
        directives = index.directive_count(),
        "extracted directives"
    );
    Ok((index, file_count))
}

/// Build `package` and check its directives against the compiler's output.
///
/// Failures go to `sink` as they become known: `bce` failures while the
/// build is still running, `inline` failures after it exits. A build that
/// cannot be started or exits unsuccessfully is an error and skips the
/// final sweep.
pub async fn verify(
    config: &Config,
    package: &str,
    sink: &mut dyn ReportSink,
) -> Result<VerifySummary> {
    let work_dir = config.resolve_work_dir()?;
    let (mut index, files) = load_index(&work_dir, package)?;
    let directives = index.directive_count();

    let mut output = BuildCommand::new(config, &work_dir, package).spawn(config.channel_capacity)?;
    let mut failures = 0;
    while let Some(line) = output.next_line().await {
        match Diagnostic::parse(&line) {
            Some(diag) => failures += index.observe_diagnostic(&diag, sink)?,
            None => debug!(line, "skipping non-diagnostic output"),
        }
    }
    if let Err(e) = output.finish().await {
        warn!(error = %e, "build did not succeed, skipping inline sweep");
        return Err(e);
    }

    failures += index.sweep(sink)?;
    info!(files, directives, failures, "verification finished");
    Ok(VerifySummary {
        files,
        directives,
        failures,
    })
}

/// Correlate an already captured diagnostic stream with `index`, then sweep.
///
/// Returns the number of failures reported.
pub fn correlate<R: BufRead>(
    mut index: DirectiveIndex,
    reader: R,
    sink: &mut dyn ReportSink,
) -> Result<usize> {
    let mut failures = 0;
    for diag in Diagnostics::new(reader) {
        failures += index.observe_diagnostic(&diag?, sink)?;
    }
    failures += index.sweep(sink)?;
    Ok(failures)
}

/// Check the directives of `package` against a compiler log saved at `log`
/// instead of running the build.
pub fn verify_log(
    config: &Config,
    package: &str,
    log: &Path,
    sink: &mut dyn ReportSink,
) -> Result<VerifySummary> {
    let work_dir = config.resolve_work_dir()?;
    let (index, files) = load_index(&work_dir, package)?;
    let directives = index.directive_count();
    let file = std::fs::File::open(log).map_err(|source| GcAssertError::Read {
        path: log.to_path_buf(),
        source,
    })?;
    let failures = correlate(index, BufReader::new(file), sink)?;
    info!(files, directives, failures, log = %log.display(), "replayed compiler log");
    Ok(VerifySummary {
        files,
        directives,
        failures,
    })
}

/// Blocking entry point: verify `package` and write failures to `out` in the
/// configured format.
pub fn gcassert<W: Write>(config: &Config, package: &str, out: W) -> Result<VerifySummary> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let mut writer = ReportWriter::new(out, config.format);
    runtime.block_on(verify(config, package, &mut writer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SRC: &str = "package pkg

func add(a, b int) int {
	return a + b
}

func Sum(a []int) int {
	x := a[5] //gcassert:bce
	//gcassert:inline
	return add(x, a[4])
}
";

    fn package() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("pkg")).unwrap();
        fs::write(tmp.path().join("pkg/sum.go"), SRC).unwrap();
        tmp
    }

    #[test]
    fn test_load_index_counts() {
        let tmp = package();
        let (index, files) = load_index(tmp.path(), "pkg").unwrap();
        assert_eq!(files, 1);
        assert_eq!(index.directive_count(), 2);
    }

    #[test]
    fn test_correlate_reports_in_order() {
        let tmp = package();
        let (index, _) = load_index(tmp.path(), "pkg").unwrap();
        let log = "# example.com/pkg\n\
                   ./pkg/sum.go:3:6: can inline add with cost 4\n\
                   ./pkg/sum.go:8:8: Found IsInBounds\n\
                   ./pkg/sum.go:10:15: Found IsInBounds\n";
        let mut sink: Vec<AssertionFailure> = Vec::new();
        let failures = correlate(index, log.as_bytes(), &mut sink).unwrap();
        assert_eq!(failures, 2);
        assert_eq!(sink[0].to_string(), "pkg/sum.go:8:\tx := a[5]: Found IsInBounds");
        assert_eq!(
            sink[1].to_string(),
            "pkg/sum.go:10:\treturn add(x, a[4]): call was not inlined"
        );
    }

    #[test]
    fn test_correlate_clean_run() {
        let tmp = package();
        let (index, _) = load_index(tmp.path(), "pkg").unwrap();
        let log = "./pkg/sum.go:10:12: inlining call to add\n";
        let mut sink: Vec<AssertionFailure> = Vec::new();
        assert_eq!(correlate(index, log.as_bytes(), &mut sink).unwrap(), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_correlate_directive_inside_range_over_conversion() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("pkg")).unwrap();
        fs::write(
            tmp.path().join("pkg/bytes.go"),
            "package pkg

func Count(s string, a []int) int {
	n := 0
	for _, c := range []byte(s) {
		n += a[c] //gcassert:bce
	}
	return n
}
",
        )
        .unwrap();
        let (index, _) = load_index(tmp.path(), "pkg").unwrap();
        let log = "./pkg/bytes.go:5:20: ([]byte)(s) does not escape\n\
                   ./pkg/bytes.go:6:9: Found IsInBounds\n";
        let mut sink: Vec<AssertionFailure> = Vec::new();
        assert_eq!(correlate(index, log.as_bytes(), &mut sink).unwrap(), 1);
        assert_eq!(sink[0].to_string(), "pkg/bytes.go:6:\tn += a[c]: Found IsInBounds");
    }

    #[test]
    fn test_verify_log_from_file() {
        let tmp = package();
        let log = tmp.path().join("build.log");
        fs::write(&log, "pkg/sum.go:10:12: inlining call to add\n").unwrap();
        let config = Config {
            work_dir: Some(tmp.path().to_path_buf()),
            ..Config::default()
        };
        let mut sink: Vec<AssertionFailure> = Vec::new();
        let summary = verify_log(&config, "pkg", &log, &mut sink).unwrap();
        assert_eq!(
            summary,
            VerifySummary {
                files: 1,
                directives: 2,
                failures: 0
            }
        );
        assert!(summary.passed());
    }

    #[test]
    fn test_verify_log_missing_file() {
        let tmp = package();
        let config = Config {
            work_dir: Some(tmp.path().to_path_buf()),
            ..Config::default()
        };
        let mut sink: Vec<AssertionFailure> = Vec::new();
        let err = verify_log(&config, "pkg", &tmp.path().join("nope.log"), &mut sink).unwrap_err();
        assert!(matches!(err, GcAssertError::Read { .. }));
    }
}
