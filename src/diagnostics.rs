//! Compiler diagnostic stream parsing
//!
//! `go build -gcflags=-m -m -d=ssa/check_bce/debug=1` prints one line per
//! optimization decision, `path:line:column: message`, interleaved with
//! package headers and other build chatter. The patterns the tool depends on
//! are kept here as named constants because the wording is owned by the
//! compiler and may drift between toolchain releases.

use regex::Regex;
use std::io::{self, BufRead};
use std::sync::OnceLock;
use tracing::debug;

/// Shape of a positioned compiler diagnostic. The path is the shortest
/// prefix followed by `:line:column: `, so it may hold spaces or a drive
/// letter.
pub const DIAGNOSTIC_PATTERN: &str =
    r"^(?P<path>.+?):(?P<line>\d+):(?P<column>\d+): (?P<message>.*)$";

/// Emitted by `check_bce` for an index expression that kept its bounds check.
pub const BOUNDS_CHECK_MESSAGE: &str = "Found IsInBounds";

/// Emitted by `check_bce` for a slice expression that kept its bounds check.
pub const SLICE_BOUNDS_CHECK_MESSAGE: &str = "Found SliceIsInBounds";

/// Prefix of the inliner's message for a call it inlined.
pub const INLINED_CALL_PREFIX: &str = "inlining call to";

/// Reported for an `inline` directive when no inlining was observed.
pub const NOT_INLINED_MESSAGE: &str = "call was not inlined";

fn diagnostic_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DIAGNOSTIC_PATTERN).expect("diagnostic pattern is valid"))
}

/// One positioned compiler message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// File path exactly as the compiler printed it.
    pub path: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    /// Parse one output line; `None` for anything that is not a diagnostic.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let caps = diagnostic_regex().captures(line)?;
        let line_no = caps["line"].parse().ok()?;
        let column = caps["column"].parse().ok()?;
        Some(Diagnostic {
            path: caps["path"].to_string(),
            line: line_no,
            column,
            message: caps["message"].to_string(),
        })
    }

    /// The compiler kept a bounds check here.
    pub fn is_bounds_check(&self) -> bool {
        self.message == BOUNDS_CHECK_MESSAGE || self.message == SLICE_BOUNDS_CHECK_MESSAGE
    }

    /// The compiler inlined a call here.
    pub fn is_inlined_call(&self) -> bool {
        self.message.starts_with(INLINED_CALL_PREFIX)
    }
}

/// Lazily parsed diagnostics from a line-oriented reader.
///
/// Lines that are not diagnostics are skipped. Only the current line is held
/// in memory.
pub struct Diagnostics<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> Diagnostics<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for Diagnostics<R> {
    type Item = io::Result<Diagnostic>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }
            let text = String::from_utf8_lossy(&self.buf);
            let line = text.strip_suffix('\n').unwrap_or(&text);
            match Diagnostic::parse(line) {
                Some(diag) => return Some(Ok(diag)),
                None => debug!(line, "skipping non-diagnostic output"),
            }
        }
    }
}
