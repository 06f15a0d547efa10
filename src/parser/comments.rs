//! Comment groups and their association with syntax nodes.
//!
//! A comment group is a run of comments with no tokens and no blank line
//! between them; a comment that follows code on the same line only groups with
//! comments on that line.
//!
//! Groups are assigned the way `go/ast.NewCommentMap` assigns them. Nodes are
//! visited in preorder while a stack tracks the enclosing file, declaration,
//! spec, field and statement nodes. A group goes to:
//!
//! - the last important node that ended before it, when the group starts on
//!   that node's last line, or on the next line with a blank line before the
//!   following node;
//! - otherwise the node just before it, under the same rule or at the end of
//!   the file;
//! - otherwise the node that follows it.

use super::syntax::{Comment, NodeId, SyntaxTree, Token};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentGroup {
    /// Indexes into the file's comment list, in source order.
    pub comments: Vec<usize>,
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub end_line: u32,
    trailing: bool,
}

/// Comment groups of a file, keyed by the node each one annotates.
#[derive(Debug, Clone, Default)]
pub struct CommentMap {
    groups: Vec<CommentGroup>,
    by_node: HashMap<NodeId, Vec<usize>>,
}

/// Enclosing important nodes, innermost last.
struct NodeStack<'t> {
    tree: &'t SyntaxTree,
    nodes: Vec<NodeId>,
}

impl NodeStack<'_> {
    /// Pop every node that ends at or before `pos`; returns the last one
    /// popped.
    fn pop(&mut self, pos: usize) -> Option<NodeId> {
        let mut top = None;
        while let Some(&id) = self.nodes.last() {
            if self.tree.node(id).span.end > pos {
                break;
            }
            top = self.nodes.pop();
        }
        top
    }

    fn push(&mut self, id: NodeId) {
        self.pop(self.tree.node(id).span.start);
        self.nodes.push(id);
    }
}

impl CommentMap {
    pub fn build(tree: &SyntaxTree, tokens: &[Token], comments: &[Comment]) -> Self {
        let groups = group_comments(tokens, comments);
        let mut by_node: HashMap<NodeId, Vec<usize>> = HashMap::new();

        let mut stack = NodeStack {
            tree,
            nodes: Vec::new(),
        };
        let mut pending = groups.iter().enumerate().peekable();
        // Previous node, and the last important node popped off the stack.
        let mut prev: Option<(NodeId, u32)> = None;
        let mut popped: Option<(NodeId, u32)> = None;

        let order = tree.preorder();
        for next in order.iter().copied().map(Some).chain(std::iter::once(None)) {
            let (next_start, next_line) =
                next.map_or((usize::MAX, u32::MAX), |id| {
                    let span = tree.node(id).span;
                    (span.start, span.line)
                });

            while let Some(&(gi, group)) = pending.peek() {
                if group.end > next_start {
                    break;
                }
                if let Some(top) = stack.pop(group.start) {
                    popped = Some((top, tree.node(top).span.end_line));
                }
                let adjacent = |end_line: u32| {
                    end_line == group.line
                        || (end_line + 1 == group.line
                            && group.end_line.saturating_add(1) < next_line)
                };
                let target = match (popped, prev) {
                    (Some((node, end_line)), _) if adjacent(end_line) => Some(node),
                    (_, Some((node, end_line))) if adjacent(end_line) || next.is_none() => {
                        Some(node)
                    }
                    _ => next,
                };
                if let Some(node) = target {
                    by_node.entry(node).or_default().push(gi);
                }
                pending.next();
            }

            let Some(id) = next else { break };
            let node = tree.node(id);
            prev = Some((id, node.span.end_line));
            if node.kind.is_important() {
                stack.push(id);
            }
        }

        CommentMap { groups, by_node }
    }

    /// Comment groups attached to `node`, in source order.
    pub fn groups_for(&self, node: NodeId) -> impl Iterator<Item = &CommentGroup> + '_ {
        self.by_node
            .get(&node)
            .into_iter()
            .flatten()
            .map(move |&gi| &self.groups[gi])
    }

    pub fn groups(&self) -> &[CommentGroup] {
        &self.groups
    }
}

fn group_comments(tokens: &[Token], comments: &[Comment]) -> Vec<CommentGroup> {
    let token_between = |from: usize, to: usize| {
        let i = tokens.partition_point(|t| t.start < from);
        tokens.get(i).is_some_and(|t| t.start < to)
    };
    let trailing = |comment: &Comment| {
        let i = tokens.partition_point(|t| t.end <= comment.start);
        i > 0 && tokens[i - 1].end_line == comment.line
    };

    let mut groups: Vec<CommentGroup> = Vec::new();
    for (ci, comment) in comments.iter().enumerate() {
        let comment_trailing = trailing(comment);
        if let Some(group) = groups.last_mut() {
            let joins = !comment_trailing
                && !token_between(group.end, comment.start)
                && comment.line <= group.end_line + 1
                && !(group.trailing && comment.line != group.end_line);
            if joins {
                group.comments.push(ci);
                group.end = comment.end;
                group.end_line = comment.end_line;
                continue;
            }
        }
        groups.push(CommentGroup {
            comments: vec![ci],
            start: comment.start,
            end: comment.end,
            line: comment.line,
            end_line: comment.end_line,
            trailing: comment_trailing,
        });
    }
    groups
}
