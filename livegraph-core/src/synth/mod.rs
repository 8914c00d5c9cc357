//! Class synthesis.
//!
//! A class is synthesized from two inputs: the regenerated property
//! description text and the base class named by the configured base-class
//! binding. Base-class resolution is asynchronous and goes through a
//! [`ModuleResolver`]; the description itself is read by [`extend`] into a
//! [`ClassSchema`] without running any user code.
//!
//! Requests are numbered by a [`SynthesisTracker`]. A completion is only
//! applied while its generation is still the newest one handed out, so a slow
//! resolution that finishes after a newer request is dropped on arrival.

pub mod instance;
pub mod resolver;
pub mod schema;

pub use instance::Instance;
pub use resolver::{BaseClass, BaseClassKind, BuiltinResolver, ExportMap, ModuleResolver};
pub use schema::{ClassSchema, DefaultValue, PropertyDef, PropertyKind};

use crate::syntax::{named_children, SyntaxTree};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("malformed property description: {0}")]
    MalformedDescription(String),

    #[error("cannot resolve module {0:?}")]
    UnresolvedModule(String),

    #[error("{0} is not defined")]
    UnboundName(String),

    #[error("{0} cannot be extended")]
    NotExtendable(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// A class built from a base class and a property description
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedClass {
    pub base: Arc<BaseClass>,
    pub schema: ClassSchema,
    /// Description text the class was built from
    pub source: String,
}

/// Class factory: `base.extend(<description>)`
pub fn extend(base: &Arc<BaseClass>, description: &str) -> Result<SynthesizedClass, SynthesisError> {
    if !base.is_extendable() {
        return Err(SynthesisError::NotExtendable(base.name.clone()));
    }

    // Parenthesized so `{` starts an object literal rather than a block.
    let wrapped = format!("({}\n);", description);
    let tree = SyntaxTree::parse(&wrapped)
        .map_err(|e| SynthesisError::MalformedDescription(e.to_string()))?;

    let object = match tree.statements().as_slice() {
        [statement] if statement.kind() == "expression_statement" => named_children(*statement)
            .first()
            .filter(|expr| expr.kind() == "parenthesized_expression")
            .and_then(|paren| named_children(*paren).first().copied()),
        _ => None,
    }
    .ok_or_else(|| {
        SynthesisError::MalformedDescription("expected a single object literal".to_string())
    })?;

    let schema = ClassSchema::from_object(object, tree.source())?;
    Ok(SynthesizedClass {
        base: Arc::clone(base),
        schema,
        source: description.to_string(),
    })
}

/// One synthesis request, captured when the description changed
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub generation: u64,
    pub description: String,
    /// Names bound from the base module
    pub imports: Vec<String>,
    pub module: String,
    pub base_class: String,
}

/// Resolve the base module, bind the imported names and extend the base class
pub async fn synthesize(
    resolver: &dyn ModuleResolver,
    request: &SynthesisRequest,
) -> Result<SynthesizedClass, SynthesisError> {
    debug!(
        generation = request.generation,
        module = %request.module,
        "synthesizing class"
    );
    let exports = resolver.resolve(&request.module).await?;

    // Only imported names are in scope; names the module lacks bind to nothing.
    let base = request
        .imports
        .iter()
        .find(|name| **name == request.base_class)
        .and_then(|name| exports.get(name))
        .ok_or_else(|| SynthesisError::UnboundName(request.base_class.clone()))?;

    extend(base, &request.description)
}

/// Monotonic generation counter for last-request-wins
#[derive(Debug, Default, Clone)]
pub struct SynthesisTracker {
    current: u64,
}

impl SynthesisTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier one
    pub fn begin(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn define_map() -> Arc<BaseClass> {
        Arc::new(BaseClass::new("DefineMap", BaseClassKind::Map))
    }

    fn request(description: &str, imports: &[&str]) -> SynthesisRequest {
        SynthesisRequest {
            generation: 1,
            description: description.to_string(),
            imports: imports.iter().map(|s| s.to_string()).collect(),
            module: "can".to_string(),
            base_class: "DefineMap".to_string(),
        }
    }

    #[test]
    fn test_extend_builds_schema() {
        let class = extend(&define_map(), "{first:{default:\"Kevin\"},get name(){return this.first;}}").unwrap();
        assert_eq!(class.base.name, "DefineMap");
        assert_eq!(class.schema.len(), 2);
        assert_eq!(class.schema.computed().count(), 1);
    }

    #[test]
    fn test_extend_rejects_malformed_text() {
        for text in ["{fo", "1, 2", "{a:1}); ({b:1}", "\"Name\""] {
            assert!(
                matches!(extend(&define_map(), text), Err(SynthesisError::MalformedDescription(_))),
                "expected malformed for {text:?}"
            );
        }
    }

    #[test]
    fn test_extend_requires_extendable_base() {
        let key = Arc::new(BaseClass::new("key", BaseClassKind::Function));
        assert_eq!(
            extend(&key, "{}"),
            Err(SynthesisError::NotExtendable("key".to_string()))
        );
    }

    #[tokio::test]
    async fn test_synthesize_with_default_imports() {
        let resolver = BuiltinResolver::new();
        let class = synthesize(&resolver, &request("{a:{default:1}}", &["DefineMap"]))
            .await
            .unwrap();
        assert_eq!(class.schema.len(), 1);
    }

    #[tokio::test]
    async fn test_synthesize_requires_bound_base_class() {
        let resolver = BuiltinResolver::new();
        let result = synthesize(&resolver, &request("{}", &["DefineList"])).await;
        assert_eq!(result, Err(SynthesisError::UnboundName("DefineMap".to_string())));

        // Extra names the module does not export are harmless.
        let result = synthesize(&resolver, &request("{}", &["DefineMap", "Missing"])).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_synthesize_unresolved_module() {
        let resolver = BuiltinResolver::new();
        let mut req = request("{}", &["DefineMap"]);
        req.module = "lodash".to_string();
        assert_eq!(
            synthesize(&resolver, &req).await,
            Err(SynthesisError::UnresolvedModule("lodash".to_string()))
        );
    }

    #[test]
    fn test_tracker_last_request_wins() {
        let mut tracker = SynthesisTracker::new();
        let a = tracker.begin();
        let b = tracker.begin();
        assert!(!tracker.is_current(a));
        assert!(tracker.is_current(b));
        assert_eq!(tracker.current(), b);
    }
}
