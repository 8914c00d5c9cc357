//! Base-class module resolution.

use super::SynthesisError;
use async_trait::async_trait;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What a base-class export can produce when extended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseClassKind {
    Map,
    List,
    ObservableObject,
    ObservableArray,
    Component,
    /// A plain function export; not extendable
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseClass {
    pub name: String,
    pub kind: BaseClassKind,
}

impl BaseClass {
    pub fn new(name: impl Into<String>, kind: BaseClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn is_extendable(&self) -> bool {
        self.kind != BaseClassKind::Function
    }
}

/// Named exports of a resolved module
pub type ExportMap = IndexMap<String, Arc<BaseClass>>;

lazy_static! {
    static ref CAN_EXPORTS: ExportMap = [
        ("DefineMap", BaseClassKind::Map),
        ("DefineList", BaseClassKind::List),
        ("ObservableObject", BaseClassKind::ObservableObject),
        ("ObservableArray", BaseClassKind::ObservableArray),
        ("Component", BaseClassKind::Component),
        ("key", BaseClassKind::Function),
    ]
    .into_iter()
    .map(|(name, kind)| (name.to_string(), Arc::new(BaseClass::new(name, kind))))
    .collect();
}

/// Resolves a module specifier to its named exports.
///
/// Resolution may take arbitrarily long; callers do not impose a timeout.
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    async fn resolve(&self, specifier: &str) -> Result<ExportMap, SynthesisError>;
}

/// In-process module registry preloaded with the `"can"` exports
#[derive(Debug, Clone)]
pub struct BuiltinResolver {
    modules: HashMap<String, ExportMap>,
    latency: Option<Duration>,
}

impl Default for BuiltinResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinResolver {
    pub fn new() -> Self {
        let mut modules = HashMap::new();
        modules.insert("can".to_string(), CAN_EXPORTS.clone());
        Self {
            modules,
            latency: None,
        }
    }

    /// Delay every resolution, emulating a network fetch
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_module(mut self, specifier: impl Into<String>, exports: ExportMap) -> Self {
        self.modules.insert(specifier.into(), exports);
        self
    }
}

#[async_trait]
impl ModuleResolver for BuiltinResolver {
    async fn resolve(&self, specifier: &str) -> Result<ExportMap, SynthesisError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        debug!(specifier, "resolving module");
        self.modules
            .get(specifier)
            .cloned()
            .ok_or_else(|| SynthesisError::UnresolvedModule(specifier.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_can_exports() {
        let exports = BuiltinResolver::new().resolve("can").await.unwrap();
        let names: Vec<_> = exports.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["DefineMap", "DefineList", "ObservableObject", "ObservableArray", "Component", "key"]
        );
        assert!(exports["DefineMap"].is_extendable());
        assert!(!exports["key"].is_extendable());
    }

    #[tokio::test]
    async fn test_unknown_module() {
        let result = BuiltinResolver::new().resolve("//unpkg.com/nothing.mjs").await;
        assert_eq!(
            result,
            Err(SynthesisError::UnresolvedModule("//unpkg.com/nothing.mjs".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let resolver = BuiltinResolver::new().with_latency(Duration::from_millis(250));
        let started = tokio::time::Instant::now();
        resolver.resolve("can").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(250));
    }
}
