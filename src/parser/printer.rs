//! Canonical rendering of Go source, in the layout `gofmt` produces.
//!
//! Tokens keep their source lines. Spacing between tokens on a line is
//! decided from token roles, with binary operators spaced by expression depth
//! and operator precedence the way `go/printer` does it. Continuation lines
//! are indented by the brackets left open on earlier lines.

use super::syntax::{Bracket, Token, TokenRole};
use std::collections::HashMap;

/// Layout decisions that depend on the expression tree.
#[derive(Debug, Clone, Default)]
pub struct Spacing {
    /// Binary operator start byte to whether it is surrounded by blanks.
    binary: HashMap<usize, bool>,
    /// Slice colon start byte to blanks before and after it.
    slice_colons: HashMap<usize, (bool, bool)>,
}

impl Spacing {
    pub fn binary_blank(&self, operator_start: usize) -> bool {
        self.binary.get(&operator_start).copied().unwrap_or(true)
    }

    pub fn slice_colon(&self, colon_start: usize) -> Option<(bool, bool)> {
        self.slice_colons.get(&colon_start).copied()
    }
}

type TsNode<'t> = tree_sitter::Node<'t>;

pub fn annotate(root: TsNode<'_>) -> Spacing {
    let mut spacing = Spacing::default();
    walk(root, 1, &mut spacing);
    spacing
}

fn precedence(op: &str) -> u8 {
    match op {
        "||" => 1,
        "&&" => 2,
        "==" | "!=" | "<" | "<=" | ">" | ">=" => 3,
        "+" | "-" | "|" | "^" => 4,
        "*" | "/" | "%" | "<<" | ">>" | "&" | "&^" => 5,
        _ => 0,
    }
}

fn operator<'t>(node: TsNode<'t>) -> Option<TsNode<'t>> {
    node.child_by_field_name("operator")
}

fn binary_precedence(node: TsNode<'_>) -> Option<u8> {
    if node.kind() != "binary_expression" {
        return None;
    }
    operator(node).map(|op| precedence(op.kind()))
}

fn named_children(node: TsNode<'_>) -> Vec<TsNode<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn walk_children(node: TsNode<'_>, depth: u32, out: &mut Spacing) {
    for child in named_children(node) {
        walk(child, depth, out);
    }
}

/// Number of expressions in a list field.
fn list_len(node: Option<TsNode<'_>>) -> usize {
    match node {
        Some(n) if n.kind() == "expression_list" => named_children(n).len(),
        Some(_) => 1,
        None => 0,
    }
}

fn walk(node: TsNode<'_>, depth: u32, out: &mut Spacing) {
    match node.kind() {
        "binary_expression" => binary(node, depth, out),
        "parenthesized_expression" => walk_children(node, depth.saturating_sub(1).max(1), out),
        "unary_expression" => {
            let star = operator(node).is_some_and(|op| op.kind() == "*");
            walk_children(node, if star { 1 } else { depth }, out);
        }
        "selector_expression" | "type_assertion_expression" => {
            if let Some(operand) = node.child_by_field_name("operand") {
                walk(operand, depth, out);
            }
            for child in named_children(node).into_iter().skip(1) {
                walk(child, 1, out);
            }
        }
        "index_expression" => {
            for (i, child) in named_children(node).into_iter().enumerate() {
                walk(child, if i == 0 { 1 } else { depth + 1 }, out);
            }
        }
        "slice_expression" => slice(node, depth, out),
        "call_expression" => {
            let args = node
                .child_by_field_name("arguments")
                .map_or(0, |a| named_children(a).len());
            let depth = if args > 1 { depth + 1 } else { depth };
            for child in named_children(node) {
                if child.kind() == "argument_list" {
                    walk_children(child, depth, out);
                } else {
                    walk(child, depth, out);
                }
            }
        }
        "assignment_statement" | "short_var_declaration" => {
            let pair = list_len(node.child_by_field_name("left")) > 1
                && list_len(node.child_by_field_name("right")) > 1;
            let depth = if pair { 2 } else { 1 };
            for child in named_children(node) {
                if child.kind() == "expression_list" {
                    walk_children(child, depth, out);
                } else {
                    walk(child, depth, out);
                }
            }
        }
        "inc_statement" | "dec_statement" => walk_children(node, 2, out),
        _ => walk_children(node, 1, out),
    }
}

fn binary(node: TsNode<'_>, depth: u32, out: &mut Spacing) {
    let Some(op) = operator(node) else {
        return walk_children(node, depth, out);
    };
    let prec = precedence(op.kind());
    out.binary.insert(op.start_byte(), prec < cutoff(node, depth));

    if let Some(left) = node.child_by_field_name("left") {
        let same = binary_precedence(left) == Some(prec);
        walk(left, if same { depth } else { depth + 1 }, out);
    }
    if let Some(right) = node.child_by_field_name("right") {
        walk(right, depth + 1, out);
    }
}

fn cutoff(node: TsNode<'_>, depth: u32) -> u8 {
    let (has4, has5, max_problem) = walk_binary(node);
    if max_problem > 0 {
        return max_problem + 1;
    }
    match (has4 && has5, depth == 1) {
        (true, true) => 5,
        (false, true) => 6,
        _ => 4,
    }
}

fn walk_binary(node: TsNode<'_>) -> (bool, bool, u8) {
    let Some(op) = operator(node) else {
        return (false, false, 0);
    };
    let prec = precedence(op.kind());
    let mut has4 = prec == 4;
    let mut has5 = prec == 5;
    let mut max_problem = 0;

    if let Some(left) = node.child_by_field_name("left") {
        if binary_precedence(left).is_some_and(|p| p >= prec) {
            let (h4, h5, mp) = walk_binary(left);
            has4 |= h4;
            has5 |= h5;
            max_problem = max_problem.max(mp);
        }
    }
    if let Some(right) = node.child_by_field_name("right") {
        if binary_precedence(right).is_some_and(|p| p > prec) {
            let (h4, h5, mp) = walk_binary(right);
            has4 |= h4;
            has5 |= h5;
            max_problem = max_problem.max(mp);
        } else if right.kind() == "unary_expression" {
            if let Some(unary) = operator(right) {
                match format!("{}{}", op.kind(), unary.kind()).as_str() {
                    "/*" | "&&" | "&^" => max_problem = 5,
                    "++" | "--" => max_problem = max_problem.max(4),
                    _ => {}
                }
            }
        }
    }
    (has4, has5, max_problem)
}

fn slice(node: TsNode<'_>, depth: u32, out: &mut Spacing) {
    let mut cursor = node.walk();
    let children: Vec<TsNode<'_>> = node
        .children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect();
    let open = children.iter().position(|c| c.kind() == "[");

    // Indices between the brackets, split at each colon.
    let mut segments: Vec<Option<TsNode<'_>>> = vec![None];
    let mut colons = Vec::new();
    for child in children.iter().skip(open.map_or(0, |i| i + 1)) {
        match child.kind() {
            ":" => {
                colons.push(child.start_byte());
                segments.push(None);
            }
            "]" => break,
            _ if child.is_named() => {
                if let Some(last) = segments.last_mut() {
                    *last = Some(*child);
                }
            }
            _ => {}
        }
    }

    let present: Vec<TsNode<'_>> = segments.iter().flatten().copied().collect();
    let blanks = depth <= 1
        && present.len() > 1
        && present.iter().any(|s| s.kind() == "binary_expression");
    for (i, colon) in colons.iter().enumerate() {
        let before = blanks && segments[i].is_some();
        let after = blanks && segments[i + 1].is_some();
        out.slice_colons.insert(*colon, (before, after));
    }

    if let Some(operand) = node.child_by_field_name("operand") {
        walk(operand, 1, out);
    }
    for index in present {
        walk(index, depth + 1, out);
    }
}

fn needs_space(p: &Token, n: &Token) -> bool {
    use TokenRole::*;
    match n.role {
        Close(Bracket::Block | Bracket::TypeBody { .. }) => return !matches!(p.role, Open(_)),
        Close(_) | Comma | Semicolon | Dot | IncDec | ArrowAfterChan => return false,
        Colon { before, .. } => return before,
        _ => {}
    }
    match p.role {
        Open(Bracket::Block | Bracket::TypeBody { .. }) => return true,
        Open(_) | Dot | Ellipsis | Unary => return false,
        Comma | Semicolon | ArrowAfterChan | Assign | Other => return true,
        Colon { after, .. } => return after,
        Binary { blank } => return blank,
        _ => {}
    }
    match n.role {
        Binary { blank } => blank,
        Assign | Other => true,
        Open(Bracket::Literal) => false,
        Open(Bracket::TypeBody { multiline }) => multiline,
        Open(Bracket::Block) => true,
        Open(Bracket::Paren) => match p.role {
            Keyword => !(p.kind == "func" && matches!(p.parent, "func_literal" | "function_type")),
            Close(Bracket::Paren) => n.parent == "parameter_list",
            _ => false,
        },
        Open(Bracket::Square) => {
            matches!(
                n.parent,
                "array_type" | "slice_type" | "implicit_length_array_type"
            ) && (matches!(p.role, Word | Close(Bracket::Paren))
                || (p.role == Keyword && p.kind != "map"))
        }
        Ellipsis => n.parent == "variadic_parameter_declaration" && p.role == Word,
        Unary => matches!(p.role, Word | Keyword | Close(Bracket::Paren)),
        Word | Keyword => {
            matches!(p.role, Word | Keyword)
                || matches!(p.role, Close(b) if b != Bracket::Square)
        }
        _ => false,
    }
}

/// Case labels and statement labels sit one level left of their body.
fn outdented(token: &Token) -> bool {
    match token.kind {
        "case" | "default" => matches!(
            token.parent,
            "expression_case" | "default_case" | "type_case" | "communication_case"
        ),
        "label_name" => token.parent == "labeled_statement",
        _ => false,
    }
}

fn blank_line_between(source: &str, line_starts: &[usize], after: u32, before: u32) -> bool {
    ((after + 1)..before).any(|line| {
        let i = line as usize - 1;
        let start = line_starts.get(i).copied().unwrap_or(source.len());
        let end = line_starts.get(i + 1).copied().unwrap_or(source.len());
        source[start..end].trim().is_empty()
    })
}

/// Render the tokens in `start..end` of `source`.
pub fn render(source: &str, tokens: &[Token], line_starts: &[usize], start: usize, end: usize) -> String {
    let first = tokens.partition_point(|t| t.start < start);
    let last = tokens.partition_point(|t| t.start < end);
    let tokens = &tokens[first..last];

    let mut out = String::new();
    // Open brackets with the output row they were opened on.
    let mut open: Vec<usize> = Vec::new();
    let mut row = 0;
    let mut prev: Option<&Token> = None;
    for (i, token) in tokens.iter().enumerate() {
        match prev {
            Some(p) if token.line > p.end_line => {
                if blank_line_between(source, line_starts, p.end_line, token.line) {
                    out.push('\n');
                }
                out.push('\n');
                row += 1;

                let closing = tokens[i..]
                    .iter()
                    .take_while(|t| t.line == token.line && matches!(t.role, TokenRole::Close(_)))
                    .count();
                let mut rows = open[..open.len().saturating_sub(closing)].to_vec();
                rows.dedup();
                let mut indent = rows.len();
                if matches!(p.role, TokenRole::Binary { .. } | TokenRole::Assign) {
                    indent += 1;
                }
                if outdented(token) {
                    indent = indent.saturating_sub(1);
                }
                out.extend(std::iter::repeat('\t').take(indent));
            }
            Some(p) if needs_space(p, token) => out.push(' '),
            _ => {}
        }
        out.push_str(&source[token.start..token.end]);
        match token.role {
            TokenRole::Open(_) => open.push(row),
            TokenRole::Close(_) => {
                open.pop();
            }
            _ => {}
        }
        prev = Some(token);
    }
    out
}
