//! Assertion failure reports
//!
//! Formats failures as the greppable `path:line:\tsource: message` line or as
//! one JSON object per line.

use crate::directive::DirectiveKind;
use crate::error::Result;
use crate::parser::{NodeId, ParsedFile};
use crate::paths;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// A directive the compiler output refuted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionFailure {
    /// File path relative to the working directory, `/` separated.
    pub path: String,
    pub line: u32,
    pub directive: DirectiveKind,
    /// The annotated construct in canonical form, comments removed.
    pub source: String,
    pub message: String,
}

impl AssertionFailure {
    /// Build a report for `node` of `file`, located at `file_path`.
    pub fn new(
        work_dir: &Path,
        file_path: &Path,
        file: &ParsedFile,
        node: NodeId,
        directive: DirectiveKind,
        message: impl Into<String>,
    ) -> Result<Self> {
        let rel = paths::relative_to(work_dir, file_path)?;
        Ok(AssertionFailure {
            path: paths::to_slash(&rel),
            line: file.tree().node(node).span.line,
            directive,
            source: file.render(node),
            message: message.into(),
        })
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:\t{}: {}", self.path, self.line, self.source, self.message)
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Expected: human, json", s)),
        }
    }
}

/// Destination for failures, written as soon as they are known.
pub trait ReportSink {
    fn report(&mut self, failure: AssertionFailure) -> Result<()>;
}

impl ReportSink for Vec<AssertionFailure> {
    fn report(&mut self, failure: AssertionFailure) -> Result<()> {
        self.push(failure);
        Ok(())
    }
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn report(&mut self, failure: AssertionFailure) -> Result<()> {
        (**self).report(failure)
    }
}

/// Writes each failure as one line in the chosen format.
pub struct ReportWriter<W> {
    out: W,
    format: OutputFormat,
    written: usize,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            written: 0,
        }
    }

    /// Number of failures written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for ReportWriter<W> {
    fn report(&mut self, failure: AssertionFailure) -> Result<()> {
        match self.format {
            OutputFormat::Human => writeln!(self.out, "{failure}")?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, &failure)?;
                self.out.write_all(b"\n")?;
            }
        }
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }
}
