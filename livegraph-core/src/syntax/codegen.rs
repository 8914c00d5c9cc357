//! Tree-to-source generator.
//!
//! Re-emits a subtree as compact source: tokens in order, comments dropped,
//! whitespace collapsed to the minimum needed to keep tokens apart. Two
//! descriptions that differ only in layout therefore generate the same text,
//! so formatting-only edits do not trigger a new class synthesis.

use super::node_text;
use tree_sitter::Node;

/// Node kinds emitted verbatim (their inner text is significant)
const ATOMIC_KINDS: &[&str] = &["string", "template_string", "regex", "number"];

/// Generate compact source text for `node`
pub fn generate(node: Node<'_>, source: &str) -> String {
    let mut out = String::with_capacity(node.end_byte() - node.start_byte());
    emit(node, source, &mut out);
    out
}

fn emit(node: Node<'_>, source: &str, out: &mut String) {
    if node.kind() == "comment" {
        return;
    }

    if node.child_count() == 0 || ATOMIC_KINDS.contains(&node.kind()) {
        push_token(out, node_text(node, source));
        return;
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    for child in children {
        emit(child, source, out);
    }

    // Statements terminated by automatic semicolon insertion have no `;` token.
    if is_statement(node.kind()) && !out.ends_with(';') && !out.ends_with('}') {
        out.push(';');
    }
}

fn is_statement(kind: &str) -> bool {
    matches!(
        kind,
        "expression_statement"
            | "return_statement"
            | "lexical_declaration"
            | "variable_declaration"
            | "throw_statement"
            | "break_statement"
            | "continue_statement"
    )
}

fn push_token(out: &mut String, token: &str) {
    let Some(first) = token.chars().next() else {
        return;
    };
    if needs_space(out, first) {
        out.push(' ');
    }
    out.push_str(token);
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Whether `out` followed directly by `first` would fuse into different tokens
fn needs_space(out: &str, first: char) -> bool {
    let Some(last) = out.chars().last() else {
        return false;
    };
    (is_word(last) && is_word(first))
        || (last == '+' && first == '+')
        || (last == '-' && first == '-')
        || (last == '/' && first == '/')
        || (first == '.' && ends_with_number(out))
        || (is_word(last) && (first == '`' || first == '"' || first == '\''))
}

/// `1.toString()` would read the dot as a decimal point
fn ends_with_number(out: &str) -> bool {
    let word_start = out.trim_end_matches(is_word);
    out[word_start.len()..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
}
