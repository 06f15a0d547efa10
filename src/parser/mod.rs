//! Go source front end
//!
//! This module contains:
//! - `syntax`: the tree-sitter parse flattened into nodes, tokens and comments
//! - `comments`: comment groups and the node each one annotates
//! - `printer`: canonical, `gofmt`-style rendering of a node

pub mod comments;
pub mod printer;
pub mod syntax;

pub use comments::{CommentGroup, CommentMap};
pub use syntax::{Comment, Node, NodeId, NodeKind, Span, SyntaxTree, Token};

use std::fmt;

/// A parsing failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: u32,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for SyntaxError {}

/// A Go file with its syntax tree and comment associations.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    source: String,
    tree: SyntaxTree,
    tokens: Vec<Token>,
    comments: Vec<Comment>,
    comment_map: CommentMap,
    line_starts: Vec<usize>,
}

impl ParsedFile {
    pub fn parse(source: impl Into<String>) -> Result<Self, SyntaxError> {
        let source = source.into();
        let parsed = syntax::parse(&source)?;
        let comment_map = CommentMap::build(&parsed.tree, &parsed.tokens, &parsed.comments);
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Ok(ParsedFile {
            source,
            tree: parsed.tree,
            tokens: parsed.tokens,
            comments: parsed.comments,
            comment_map,
            line_starts,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Text of every comment attached to `node`, group by group.
    pub fn comments_for(&self, node: NodeId) -> impl Iterator<Item = &str> + '_ {
        self.comment_map
            .groups_for(node)
            .flat_map(|group| group.comments.iter())
            .map(move |&ci| {
                let c = &self.comments[ci];
                &self.source[c.start..c.end]
            })
    }

    /// `node` as `gofmt` would print it, without comments.
    pub fn render(&self, node: NodeId) -> String {
        let span = self.tree.node(node).span;
        printer::render(
            &self.source,
            &self.tokens,
            &self.line_starts,
            span.start,
            span.end,
        )
    }
}
