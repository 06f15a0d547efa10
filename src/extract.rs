//! Directive extraction
//!
//! Walks a parsed file and records every `//gcassert:` directive against the
//! line of the node it annotates. The node's line is used rather than the
//! comment's, so several directive comments stacked above one statement all
//! land on that statement's line.

use crate::directive::directives_in_comment;
use crate::index::{DirectiveIndex, SourceFile};
use std::sync::Arc;

/// Record the directives of `file` in `index`; returns how many were found.
pub fn extract_directives(file: &Arc<SourceFile>, index: &mut DirectiveIndex) -> usize {
    let tree = file.parsed.tree();
    let mut found = 0;
    for node in tree.preorder() {
        let line = tree.node(node).span.line;
        for comment in file.parsed.comments_for(node) {
            for kind in directives_in_comment(comment) {
                index.record_directive(file, line, node, kind);
                found += 1;
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::DirectiveKind;
    use crate::parser::ParsedFile;
    use std::path::PathBuf;

    fn extract(src: &str) -> DirectiveIndex {
        let file = Arc::new(SourceFile {
            path: PathBuf::from("/work/a.go"),
            key: "a.go".to_string(),
            parsed: ParsedFile::parse(src).unwrap(),
        });
        let mut index = DirectiveIndex::new("/work");
        extract_directives(&file, &mut index);
        index
    }

    #[test]
    fn test_leading_directive_uses_statement_line() {
        let index = extract("package p\n\nfunc f() {\n\t//gcassert:inline\n\tg()\n}\n");
        let record = index.line("a.go", 5).unwrap();
        assert_eq!(record.directives(), &[DirectiveKind::Inline]);
        assert!(index.line("a.go", 4).is_none());
    }

    #[test]
    fn test_trailing_directive() {
        let index = extract("package p\n\nfunc f(a []int) int {\n\treturn a[5] //gcassert:bce\n}\n");
        let record = index.line("a.go", 4).unwrap();
        assert_eq!(record.directives(), &[DirectiveKind::BoundsCheckElimination]);
    }

    #[test]
    fn test_stacked_directives_share_a_line() {
        let src = "package p\n\nfunc f(a []int) int {\n\t//gcassert:bce\n\t//gcassert:inline\n\treturn g(a[5])\n}\n";
        let index = extract(src);
        let record = index.line("a.go", 6).unwrap();
        assert_eq!(
            record.directives(),
            &[DirectiveKind::BoundsCheckElimination, DirectiveKind::Inline]
        );
        assert_eq!(index.directive_count(), 2);
    }

    #[test]
    fn test_unknown_tag_is_skipped_without_hiding_later_ones() {
        let src = "package p\n\nfunc f() {\n\t//gcassert:unknown\n\t//gcassert:inline\n\tg()\n}\n";
        let index = extract(src);
        assert_eq!(index.line("a.go", 6).unwrap().directives(), &[DirectiveKind::Inline]);
    }

    #[test]
    fn test_ordinary_comments_record_nothing() {
        let index = extract("package p\n\n// f does things.\nfunc f() {\n\tg() // call g\n}\n");
        assert!(index.is_empty());
    }

    #[test]
    fn test_directive_on_function_declaration() {
        let src = "package p\n\n//gcassert:inline\nfunc add(a, b int) int {\n\treturn a + b\n}\n";
        let index = extract(src);
        assert_eq!(index.line("a.go", 4).unwrap().directives(), &[DirectiveKind::Inline]);
    }

    #[test]
    fn test_directive_in_function_literal() {
        let src = "package p\n\nfunc f(a []int) {\n\tgo func() {\n\t\t_ = a[0] //gcassert:bce\n\t}()\n}\n";
        let index = extract(src);
        assert!(index.line("a.go", 5).is_some());
    }

    #[test]
    fn test_range_over_conversion_keeps_body_lines() {
        let src = "package p

func f(s string, a []int) int {
	n := 0
	for _, c := range []byte(s) {
		n += a[c] //gcassert:bce
	}
	return n
}
";
        let index = extract(src);
        assert_eq!(
            index.line("a.go", 6).unwrap().directives(),
            &[DirectiveKind::BoundsCheckElimination]
        );
        assert_eq!(index.directive_count(), 1);
    }

    #[test]
    fn test_range_over_converted_map_keeps_body_lines() {
        let src = "package p

func g(a []int) int {
	n := 0
	for k := range map[string]int(nil) {
		_ = k
		//gcassert:bce
		n += a[0]
	}
	return n
}
";
        let index = extract(src);
        assert_eq!(
            index.line("a.go", 8).unwrap().directives(),
            &[DirectiveKind::BoundsCheckElimination]
        );
        assert!(index.line("a.go", 1).is_none());
        assert_eq!(index.directive_count(), 1);
    }
}
