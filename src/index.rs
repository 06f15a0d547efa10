//! Directive index and correlation
//!
//! The index is filled by the extractor before the compiler runs, then
//! updated as diagnostics arrive, then swept once the stream has ended.
//!
//! The two directive kinds have opposite evidence polarity. The compiler
//! reports a bounds check it could not remove, so a `bce` directive fails on
//! the diagnostic itself and is reported on the spot. It reports an inlined
//! call only when inlining happened, so an `inline` directive fails on the
//! absence of that diagnostic and can only be judged by the final sweep.

use crate::diagnostics::{Diagnostic, NOT_INLINED_MESSAGE};
use crate::directive::DirectiveKind;
use crate::error::Result;
use crate::parser::{NodeId, ParsedFile};
use crate::paths;
use crate::report::{AssertionFailure, ReportSink};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A parsed Go file of the package under test.
#[derive(Debug)]
pub struct SourceFile {
    /// Path on disk.
    pub path: PathBuf,
    /// Path relative to the working directory with `/` separators; the form
    /// compiler diagnostics are matched against.
    pub key: String,
    pub parsed: ParsedFile,
}

/// Directives attached to one source line.
#[derive(Debug, Clone)]
pub struct LineRecord {
    node: NodeId,
    directives: Vec<DirectiveKind>,
    /// Directive index to "success observed", only for kinds that pass on
    /// evidence.
    evidence: BTreeMap<usize, bool>,
}

impl LineRecord {
    /// The annotated node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Directives in the order their comments were found.
    pub fn directives(&self) -> &[DirectiveKind] {
        &self.directives
    }

    /// Whether evidence of success was recorded for the directive at `index`.
    pub fn passed(&self, index: usize) -> bool {
        self.evidence.get(&index).copied().unwrap_or(false)
    }
}

struct FileEntry {
    file: Arc<SourceFile>,
    lines: BTreeMap<u32, LineRecord>,
}

/// A directive as listed without running the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedDirective {
    pub path: String,
    pub line: u32,
    pub directive: DirectiveKind,
    pub source: String,
}

/// Every open directive of a run, by file key and line.
pub struct DirectiveIndex {
    work_dir: PathBuf,
    files: BTreeMap<String, FileEntry>,
}

impl DirectiveIndex {
    /// Create an empty index; reports are made relative to `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            files: BTreeMap::new(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Attach `kind` to `line` of `file`, annotating `node`.
    pub fn record_directive(
        &mut self,
        file: &Arc<SourceFile>,
        line: u32,
        node: NodeId,
        kind: DirectiveKind,
    ) {
        let entry = self
            .files
            .entry(file.key.clone())
            .or_insert_with(|| FileEntry {
                file: Arc::clone(file),
                lines: BTreeMap::new(),
            });
        let record = entry.lines.entry(line).or_insert_with(|| LineRecord {
            node,
            directives: Vec::new(),
            evidence: BTreeMap::new(),
        });
        record.node = node;
        record.directives.push(kind);
        debug!(file = %file.key, line, directive = %kind, "recorded directive");
    }

    /// Files with at least one directive.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total directives across all lines.
    pub fn directive_count(&self) -> usize {
        self.files
            .values()
            .flat_map(|entry| entry.lines.values())
            .map(|record| record.directives.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The record for `line` of the file keyed `key`, if any directive is
    /// attached there.
    pub fn line(&self, key: &str, line: u32) -> Option<&LineRecord> {
        self.files.get(key).and_then(|entry| entry.lines.get(&line))
    }

    /// Apply one compiler diagnostic, reporting `bce` failures immediately.
    ///
    /// Returns the number of failures reported.
    pub fn observe_diagnostic(
        &mut self,
        diag: &Diagnostic,
        sink: &mut dyn ReportSink,
    ) -> Result<usize> {
        let key = paths::diagnostic_key(&diag.path);
        let Some(entry) = self.files.get_mut(&key) else {
            return Ok(0);
        };
        let Some(record) = entry.lines.get_mut(&diag.line) else {
            return Ok(0);
        };

        let mut failures = 0;
        for (i, kind) in record.directives.iter().enumerate() {
            match kind {
                DirectiveKind::BoundsCheckElimination => {
                    if diag.is_bounds_check() {
                        let failure = AssertionFailure::new(
                            &self.work_dir,
                            &entry.file.path,
                            &entry.file.parsed,
                            record.node,
                            *kind,
                            diag.message.clone(),
                        )?;
                        sink.report(failure)?;
                        failures += 1;
                    }
                }
                DirectiveKind::Inline => {
                    if diag.is_inlined_call() {
                        record.evidence.insert(i, true);
                    }
                }
            }
        }
        Ok(failures)
    }

    /// Report every `inline` directive that never saw an inlining diagnostic.
    ///
    /// Only meaningful once the diagnostic stream has ended. Files are visited
    /// in key order and lines in ascending order.
    pub fn sweep(self, sink: &mut dyn ReportSink) -> Result<usize> {
        let mut failures = 0;
        for entry in self.files.values() {
            for record in entry.lines.values() {
                for (i, kind) in record.directives.iter().enumerate() {
                    let unmet = match kind {
                        DirectiveKind::Inline => !record.passed(i),
                        DirectiveKind::BoundsCheckElimination => false,
                    };
                    if unmet {
                        let failure = AssertionFailure::new(
                            &self.work_dir,
                            &entry.file.path,
                            &entry.file.parsed,
                            record.node,
                            *kind,
                            NOT_INLINED_MESSAGE,
                        )?;
                        sink.report(failure)?;
                        failures += 1;
                    }
                }
            }
        }
        Ok(failures)
    }

    /// Every recorded directive, in file and line order.
    pub fn list(&self) -> Result<Vec<ListedDirective>> {
        let mut out = Vec::new();
        for entry in self.files.values() {
            let rel = paths::relative_to(&self.work_dir, &entry.file.path)?;
            let path = paths::to_slash(&rel);
            for (&line, record) in &entry.lines {
                let source = entry.file.parsed.render(record.node);
                for &directive in &record.directives {
                    out.push(ListedDirective {
                        path: path.clone(),
                        line,
                        directive,
                        source: source.clone(),
                    });
                }
            }
        }
        Ok(out)
    }
}
