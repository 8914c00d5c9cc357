//! Imported base-module names.

use super::{statement, TreeExtractor};
use crate::models::AnalysisFailure;
use crate::syntax::{named_children, SyntaxTree};

/// Local names bound by the named specifiers of the first import statement
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportsExtractor;

impl ImportsExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TreeExtractor for ImportsExtractor {
    type Output = Vec<String>;

    fn extract(&self, tree: &SyntaxTree) -> Result<Vec<String>, AnalysisFailure> {
        let import = statement(tree, 0, "import declaration")?;
        if import.kind() != "import_statement" {
            return Err(AnalysisFailure::mismatch(format!(
                "statement 1 is a {}, not an import",
                import.kind()
            )));
        }

        let mut names = Vec::new();
        let clauses = named_children(import)
            .into_iter()
            .filter(|n| n.kind() == "import_clause");
        for clause in clauses {
            // Default and namespace imports are not named specifiers.
            for group in named_children(clause).into_iter().filter(|n| n.kind() == "named_imports") {
                for specifier in named_children(group) {
                    if specifier.kind() != "import_specifier" {
                        continue;
                    }
                    let local = specifier
                        .child_by_field_name("alias")
                        .or_else(|| specifier.child_by_field_name("name"))
                        .ok_or_else(|| AnalysisFailure::mismatch("import specifier without a name"))?;
                    names.push(tree.text(local).to_string());
                }
            }
        }
        Ok(names)
    }

    fn extractor_type(&self) -> &'static str {
        "can_dependencies"
    }
}
