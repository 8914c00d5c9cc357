//! Parser boundary.
//!
//! Source text is parsed as a complete ES module with the tree-sitter
//! JavaScript grammar. tree-sitter recovers from errors, so a tree that
//! contains any ERROR or MISSING node is treated as a failed parse: the
//! resulting `SyntaxTree` is all-or-nothing. Trees nested deeper than
//! [`MAX_SYNTAX_DEPTH`] are rejected the same way, since every later walk
//! over the tree recurses per level.

pub mod codegen;

pub use codegen::generate;

use crate::constants::MAX_SYNTAX_DEPTH;
use crate::models::AnalysisFailure;
use std::fmt;
use std::sync::Arc;
use tree_sitter::{Node, Parser, Tree};

/// Create a parser loaded with the JavaScript grammar
pub fn javascript_parser() -> Result<Parser, AnalysisFailure> {
    let mut parser = Parser::new();
    parser
        .set_language(tree_sitter_javascript::language())
        .map_err(|e| AnalysisFailure::Parse {
            line: 0,
            column: 0,
            kind: format!("grammar: {}", e),
        })?;
    Ok(parser)
}

/// An immutable, error-free parse of one source snapshot
#[derive(Clone)]
pub struct SyntaxTree {
    source: Arc<str>,
    tree: Tree,
}

impl SyntaxTree {
    /// Parse `source` as a module
    pub fn parse(source: &str) -> Result<Self, AnalysisFailure> {
        let mut parser = javascript_parser()?;
        let tree = parser.parse(source, None).ok_or(AnalysisFailure::Parse {
            line: 0,
            column: 0,
            kind: "parser aborted".to_string(),
        })?;

        if let Some(defect) = first_defect(tree.root_node()) {
            let (bad, kind) = match defect {
                Defect::Error(bad) if bad.is_missing() => (bad, format!("missing {}", bad.kind())),
                Defect::Error(bad) => (
                    bad,
                    source[bad.start_byte()..bad.end_byte()].chars().take(24).collect(),
                ),
                Defect::TooDeep(bad) => (bad, format!("nesting deeper than {}", MAX_SYNTAX_DEPTH)),
            };
            let position = bad.start_position();
            return Err(AnalysisFailure::Parse {
                line: position.row + 1,
                column: position.column + 1,
                kind,
            });
        }

        Ok(Self {
            source: Arc::from(source),
            tree,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by `node`
    pub fn text(&self, node: Node<'_>) -> &str {
        node_text(node, &self.source)
    }

    /// Top-level statements of the module, comments excluded
    pub fn statements(&self) -> Vec<Node<'_>> {
        named_children(self.root())
    }
}

impl PartialEq for SyntaxTree {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("bytes", &self.source.len())
            .field("statements", &self.statements().len())
            .finish()
    }
}

enum Defect<'t> {
    Error(Node<'t>),
    TooDeep(Node<'t>),
}

/// Pre-order walk for the first ERROR or MISSING node, or the first node
/// below [`MAX_SYNTAX_DEPTH`]
fn first_defect(root: Node<'_>) -> Option<Defect<'_>> {
    let mut cursor = root.walk();
    let mut depth = 0usize;
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(Defect::Error(node));
        }
        if depth > MAX_SYNTAX_DEPTH {
            return Some(Defect::TooDeep(node));
        }
        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return None;
            }
            depth -= 1;
        }
    }
}

/// Named children excluding comments
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// All children (named and anonymous) excluding comments
pub(crate) fn all_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.start_byte()..node.end_byte()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_SOURCE;

    #[test]
    fn test_parses_default_source() {
        let tree = SyntaxTree::parse(DEFAULT_SOURCE).unwrap();
        let statements = tree.statements();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].kind(), "import_statement");
        assert_eq!(statements[1].kind(), "lexical_declaration");
    }

    #[test]
    fn test_incomplete_input_fails() {
        let cases = [
            "const ViewModel = DefineMap.extend({",
            "const x = ;",
            "import { DefineMap from \"can\";",
            "const ViewModel = DefineMap.extend({ get name() { return this. } });",
        ];
        for case in cases {
            let result = SyntaxTree::parse(case);
            assert!(
                matches!(result, Err(AnalysisFailure::Parse { .. })),
                "expected parse failure for {case:?}"
            );
        }
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let nested = |levels: usize| format!("const x = {}1{};", "(".repeat(levels), ")".repeat(levels));

        assert!(SyntaxTree::parse(&nested(100)).is_ok());
        match SyntaxTree::parse(&nested(20_000)) {
            Err(AnalysisFailure::Parse { line, kind, .. }) => {
                assert_eq!(line, 1);
                assert_eq!(kind, format!("nesting deeper than {}", MAX_SYNTAX_DEPTH));
            }
            other => panic!("expected a parse failure, got {:?}", other),
        }
    }

    #[test]
    fn test_comments_are_not_statements() {
        let tree = SyntaxTree::parse("// header\nimport { DefineMap } from \"can\";\n/* x */\nconst a = 1;").unwrap();
        let kinds: Vec<_> = tree.statements().iter().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec!["import_statement", "lexical_declaration"]);
    }

    #[test]
    fn test_tree_equality_is_by_source() {
        let a = SyntaxTree::parse("const a = 1;").unwrap();
        let b = SyntaxTree::parse("const a = 1;").unwrap();
        let c = SyntaxTree::parse("const a = 2;").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
