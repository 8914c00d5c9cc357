//! Property-description extraction.
//!
//! Locates `const X = Base.extend(<description>)` as the second top-level
//! statement and regenerates the description argument as compact source.

use super::{statement, TreeExtractor};
use crate::models::AnalysisFailure;
use crate::syntax::{generate, named_children, SyntaxTree};

const DECLARATION_INDEX: usize = 1;

#[derive(Debug, Default, Clone, Copy)]
pub struct PropDefinitionsExtractor;

impl PropDefinitionsExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TreeExtractor for PropDefinitionsExtractor {
    type Output = String;

    fn extract(&self, tree: &SyntaxTree) -> Result<String, AnalysisFailure> {
        let declaration = statement(tree, DECLARATION_INDEX, "class declaration")?;
        if !matches!(declaration.kind(), "lexical_declaration" | "variable_declaration") {
            return Err(AnalysisFailure::mismatch(format!(
                "statement 2 is a {}, not a variable declaration",
                declaration.kind()
            )));
        }

        let declarator = named_children(declaration)
            .into_iter()
            .find(|n| n.kind() == "variable_declarator")
            .ok_or_else(|| AnalysisFailure::mismatch("declaration has no declarator"))?;

        let init = declarator
            .child_by_field_name("value")
            .ok_or_else(|| AnalysisFailure::mismatch("declarator has no initializer"))?;
        if !matches!(init.kind(), "call_expression" | "new_expression") {
            return Err(AnalysisFailure::mismatch(format!(
                "initializer is a {}, not a call",
                init.kind()
            )));
        }

        let description = init
            .child_by_field_name("arguments")
            .filter(|args| args.kind() == "arguments")
            .and_then(|args| named_children(args).first().copied())
            .ok_or_else(|| AnalysisFailure::mismatch("call has no arguments"))?;

        Ok(generate(description, tree.source()))
    }

    fn extractor_type(&self) -> &'static str {
        "prop_definitions"
    }
}
