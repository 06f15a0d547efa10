//! Directive model
//!
//! A directive is a `//gcassert:<kind>` comment placed on or above the Go
//! construct whose optimization should be checked.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Pattern a comment must contain to be considered a directive. The first
/// capture group is the directive tag.
pub const DIRECTIVE_PATTERN: &str = r"//gcassert:(\w+)";

/// Compiled form of [`DIRECTIVE_PATTERN`].
pub fn directive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DIRECTIVE_PATTERN).expect("directive pattern is valid"))
}

/// Kind of optimization a directive asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    /// `//gcassert:inline`: every call on the line must be inlined.
    Inline,
    /// `//gcassert:bce`: no bounds check may remain on the line.
    BoundsCheckElimination,
}

impl DirectiveKind {
    /// All recognized kinds.
    pub const ALL: [DirectiveKind; 2] = [DirectiveKind::Inline, DirectiveKind::BoundsCheckElimination];

    /// Tag text following `//gcassert:`.
    pub fn tag(self) -> &'static str {
        match self {
            DirectiveKind::Inline => "inline",
            DirectiveKind::BoundsCheckElimination => "bce",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Tag that names no known directive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no such directive {0}")]
pub struct UnknownDirective(pub String);

impl FromStr for DirectiveKind {
    type Err = UnknownDirective;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inline" => Ok(DirectiveKind::Inline),
            "bce" => Ok(DirectiveKind::BoundsCheckElimination),
            other => Err(UnknownDirective(other.to_string())),
        }
    }
}

/// Every directive named in a single comment's text, in order of appearance.
///
/// Unknown tags are skipped; they never hide a later known tag.
pub fn directives_in_comment(text: &str) -> impl Iterator<Item = DirectiveKind> + '_ {
    directive_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|tag| tag.as_str().parse().ok())
}
