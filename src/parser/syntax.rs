//! Go syntax tree
//!
//! The file is parsed with the tree-sitter Go grammar and flattened into an
//! owned arena of nodes, a token list and a comment list. Nodes are stored
//! in preorder. Node kinds that group statements or expressions without a
//! counterpart in Go's own AST are left out so that comments resolve to the
//! statement they precede.

use super::printer::{self, Spacing};
use super::SyntaxError;
use tree_sitter::Parser;

/// Index of a node in a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Coarse node classes; the first five are the ones comments are grouped
/// around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Decl,
    Spec,
    Field,
    Stmt,
    Other,
}

impl NodeKind {
    fn classify(grammar: &str) -> Self {
        match grammar {
            "source_file" => NodeKind::File,
            "function_declaration" | "method_declaration" | "import_declaration"
            | "const_declaration" | "var_declaration" | "type_declaration" => NodeKind::Decl,
            "import_spec" | "const_spec" | "var_spec" | "type_spec" | "type_alias" => NodeKind::Spec,
            "parameter_declaration"
            | "variadic_parameter_declaration"
            | "field_declaration"
            | "method_elem"
            | "method_spec"
            | "type_parameter_declaration" => NodeKind::Field,
            "block" | "short_var_declaration" | "expression_case" | "default_case" | "type_case"
            | "communication_case" => NodeKind::Stmt,
            k if k.ends_with("_statement") => NodeKind::Stmt,
            _ => NodeKind::Other,
        }
    }

    /// Declarations, specs, fields, statements and the file itself.
    pub fn is_important(self) -> bool {
        !matches!(self, NodeKind::Other)
    }
}

/// Byte range and 1-based line range of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Grammar node type, e.g. `short_var_declaration`.
    pub grammar: &'static str,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl SyntaxTree {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node, parents before children, siblings in source order.
    pub fn preorder(&self) -> Vec<NodeId> {
        (0..self.nodes.len()).map(NodeId).collect()
    }

    /// The outermost statement or declaration starting on `line`.
    pub fn statement_at(&self, line: u32) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| matches!(n.kind, NodeKind::Stmt | NodeKind::Decl) && n.span.line == line)
            .map(NodeId)
    }
}

/// Bracket flavours that space differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    Paren,
    Square,
    /// Composite literal braces.
    Literal,
    /// Struct and interface bodies.
    TypeBody { multiline: bool },
    Block,
}

/// How a token takes part in spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRole {
    Word,
    Keyword,
    Open(Bracket),
    Close(Bracket),
    Comma,
    Semicolon,
    Dot,
    Ellipsis,
    IncDec,
    Colon { before: bool, after: bool },
    Binary { blank: bool },
    Assign,
    Unary,
    /// The arrow of `chan<- T`.
    ArrowAfterChan,
    Other,
}

/// A source token; comments and newline terminators are not tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: &'static str,
    pub parent: &'static str,
    pub role: TokenRole,
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub end_line: u32,
}

/// Everything extracted from one parse.
#[derive(Debug, Clone, Default)]
pub struct Parsed {
    pub tree: SyntaxTree,
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
}

/// Nodes that exist only in the grammar.
const TRANSPARENT: &[&str] = &["statement_list", "expression_list"];

/// Leaves whose inner structure is irrelevant here.
const ATOMIC: &[&str] = &[
    "interpreted_string_literal",
    "raw_string_literal",
    "rune_literal",
    "int_literal",
    "float_literal",
    "imaginary_literal",
];

const ASSIGN_OPS: &[&str] = &[
    "=", ":=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", "&^=",
];

pub fn parse(source: &str) -> Result<Parsed, SyntaxError> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_go::LANGUAGE.into();
    parser
        .set_language(&language)
        .map_err(|e| SyntaxError::new(0, format!("cannot load Go grammar: {e}")))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| SyntaxError::new(0, "parser produced no tree"))?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(first_error(root));
    }

    let spacing = printer::annotate(root);
    let mut builder = Builder {
        source,
        spacing: &spacing,
        parsed: Parsed::default(),
    };
    builder.visit(root, None, None);
    Ok(builder.parsed)
}

fn first_error(node: tree_sitter::Node<'_>) -> SyntaxError {
    let mut current = node;
    while !(current.is_error() || current.is_missing()) {
        let mut cursor = current.walk();
        let broken = current
            .children(&mut cursor)
            .find(|c| c.is_error() || c.is_missing() || c.has_error());
        match broken {
            Some(child) => current = child,
            None => break,
        }
    }
    let line = current.start_position().row as u32 + 1;
    if current.is_missing() {
        SyntaxError::new(line, format!("missing {}", current.kind()))
    } else {
        SyntaxError::new(line, "unexpected input")
    }
}

fn span_of(node: tree_sitter::Node<'_>) -> Span {
    Span {
        start: node.start_byte(),
        end: node.end_byte(),
        line: node.start_position().row as u32 + 1,
        end_line: node.end_position().row as u32 + 1,
    }
}

struct Builder<'a> {
    source: &'a str,
    spacing: &'a Spacing,
    parsed: Parsed,
}

impl Builder<'_> {
    fn visit(
        &mut self,
        node: tree_sitter::Node<'_>,
        ts_parent: Option<tree_sitter::Node<'_>>,
        parent: Option<NodeId>,
    ) {
        let grammar = node.kind();
        if grammar == "comment" {
            let span = span_of(node);
            self.parsed.comments.push(Comment {
                start: span.start,
                end: span.end,
                line: span.line,
                end_line: span.end_line,
            });
            return;
        }

        let id = if node.is_named() && !TRANSPARENT.contains(&grammar) {
            Some(self.push_node(node, parent))
        } else {
            None
        };

        if node.child_count() == 0 || ATOMIC.contains(&grammar) {
            self.push_token(node, ts_parent);
            return;
        }

        let parent = id.or(parent);
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, Some(node), parent);
        }
    }

    fn push_node(&mut self, node: tree_sitter::Node<'_>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.parsed.tree.nodes.len());
        let grammar = node.kind();
        self.parsed.tree.nodes.push(Node {
            kind: NodeKind::classify(grammar),
            grammar,
            span: span_of(node),
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.parsed.tree.nodes[p.0].children.push(id),
            None => self.parsed.tree.roots.push(id),
        }
        id
    }

    fn push_token(&mut self, node: tree_sitter::Node<'_>, ts_parent: Option<tree_sitter::Node<'_>>) {
        let span = span_of(node);
        if self.source[span.start..span.end].trim().is_empty() {
            return;
        }
        let parent = ts_parent.map_or("", |p| p.kind());
        let role = self.role(node, ts_parent);
        self.parsed.tokens.push(Token {
            kind: node.kind(),
            parent,
            role,
            start: span.start,
            end: span.end,
            line: span.line,
            end_line: span.end_line,
        });
    }

    fn role(&self, node: tree_sitter::Node<'_>, ts_parent: Option<tree_sitter::Node<'_>>) -> TokenRole {
        let kind = node.kind();
        let parent = ts_parent.map_or("", |p| p.kind());
        if node.is_named() {
            return TokenRole::Word;
        }
        if kind.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return TokenRole::Keyword;
        }
        match kind {
            "(" => TokenRole::Open(Bracket::Paren),
            ")" => TokenRole::Close(Bracket::Paren),
            "[" => TokenRole::Open(Bracket::Square),
            "]" => TokenRole::Close(Bracket::Square),
            "{" | "}" => {
                let bracket = match parent {
                    "literal_value" => Bracket::Literal,
                    "field_declaration_list" | "interface_type" => Bracket::TypeBody {
                        multiline: ts_parent
                            .is_some_and(|p| p.start_position().row != p.end_position().row),
                    },
                    _ => Bracket::Block,
                };
                if kind == "{" {
                    TokenRole::Open(bracket)
                } else {
                    TokenRole::Close(bracket)
                }
            }
            "," => TokenRole::Comma,
            ";" => TokenRole::Semicolon,
            "." => TokenRole::Dot,
            "..." => TokenRole::Ellipsis,
            "++" | "--" => TokenRole::IncDec,
            ":" => match self.spacing.slice_colon(node.start_byte()) {
                Some((before, after)) => TokenRole::Colon { before, after },
                None if parent == "slice_expression" => TokenRole::Colon {
                    before: false,
                    after: false,
                },
                None => TokenRole::Colon {
                    before: false,
                    after: true,
                },
            },
            "<-" if parent == "send_statement" => TokenRole::Assign,
            "<-" if parent == "channel_type"
                && node.prev_sibling().is_some_and(|s| s.kind() == "chan") =>
            {
                TokenRole::ArrowAfterChan
            }
            _ if parent == "binary_expression" => TokenRole::Binary {
                blank: self.spacing.binary_blank(node.start_byte()),
            },
            _ if ASSIGN_OPS.contains(&kind) => TokenRole::Assign,
            _ if matches!(parent, "unary_expression" | "pointer_type" | "channel_type")
                || kind == "~" =>
            {
                TokenRole::Unary
            }
            "|" => TokenRole::Binary { blank: true },
            _ => TokenRole::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar_at(src: &str, line: u32) -> Vec<&'static str> {
        let parsed = parse(src).unwrap();
        parsed
            .tree
            .nodes
            .iter()
            .filter(|n| n.kind.is_important() && n.span.line == line)
            .map(|n| n.grammar)
            .collect()
    }

    #[test]
    fn test_declarations_and_statements_are_classified() {
        let src = "package p\n\nimport \"fmt\"\n\nfunc f(a []int) {\n\tx := a[0]\n\tfmt.Println(x)\n}\n";
        let parsed = parse(src).unwrap();
        let root = parsed.tree.roots()[0];
        assert_eq!(parsed.tree.node(root).kind, NodeKind::File);
        assert!(grammar_at(src, 3).contains(&"import_declaration"));
        assert!(grammar_at(src, 5).contains(&"function_declaration"));
        assert!(grammar_at(src, 5).contains(&"parameter_declaration"));
        assert_eq!(grammar_at(src, 6), vec!["short_var_declaration"]);
        assert_eq!(grammar_at(src, 7), vec!["expression_statement"]);
    }

    #[test]
    fn test_conversion_in_range_header_keeps_loop_body() {
        let src = "package p\n\nfunc f(s string, a []int) int {\n\tn := 0\n\tfor _, c := range []byte(s) {\n\t\tn += a[c]\n\t}\n\treturn n\n}\n";
        let parsed = parse(src).unwrap();
        let body = parsed.tree.statement_at(6).unwrap();
        assert_eq!(parsed.tree.node(body).grammar, "assignment_statement");
        let parent = parsed.tree.node(body).parent.unwrap();
        assert_eq!(parsed.tree.node(parent).grammar, "block");
        assert!(parsed.tree.statement_at(8).is_some());
    }

    #[test]
    fn test_statement_lists_are_not_nodes() {
        let parsed = parse("package p\n\nfunc f() {\n\tg()\n}\n").unwrap();
        assert!(parsed.tree.nodes.iter().all(|n| n.grammar != "statement_list"));
        let stmt = parsed.tree.statement_at(4).unwrap();
        let block = parsed.tree.node(stmt).parent.unwrap();
        assert_eq!(parsed.tree.node(block).grammar, "block");
    }

    #[test]
    fn test_comments_are_collected_apart_from_tokens() {
        let parsed = parse("package p\n\n// doc\nvar s = \"//gcassert:bce\" // trailing\n").unwrap();
        assert_eq!(parsed.comments.len(), 2);
        assert_eq!(parsed.comments[0].line, 3);
        assert!(parsed.tokens.iter().any(|t| t.kind == "interpreted_string_literal"));
        assert!(parsed.tokens.iter().all(|t| t.kind != "comment"));
    }

    #[test]
    fn test_token_roles() {
        let parsed = parse("package p\n\nfunc f(p *T) { x := -a[i] + b; ch <- x }\n").unwrap();
        let role = |kind: &str| parsed.tokens.iter().find(|t| t.kind == kind).unwrap().role;
        assert_eq!(role(":="), TokenRole::Assign);
        assert_eq!(role("<-"), TokenRole::Assign);
        assert_eq!(role("-"), TokenRole::Unary);
        assert_eq!(role("*"), TokenRole::Unary);
        assert_eq!(role("+"), TokenRole::Binary { blank: true });
        assert_eq!(role("func"), TokenRole::Keyword);
        assert_eq!(role("{"), TokenRole::Open(Bracket::Block));
    }

    #[test]
    fn test_syntax_error_line() {
        let err = parse("package p\n\nfunc f() {\n\tx :=\n}\n").unwrap_err();
        assert!(err.line >= 4, "{err}");
    }
}
