//! Dependency extraction from a live instance.
//!
//! Every computed property is evaluated once with its `this` reads recorded;
//! the recorded names, de-duplicated in first-read order, are its
//! dependencies. Value properties map to an empty list and methods are left
//! out. Nothing on the instance is written.

use crate::eval::EvalError;
use crate::models::DependencyMap;
use crate::synth::{Instance, PropertyKind};
use std::cell::RefCell;
use tracing::trace;

/// Map each data property of `instance` to the properties it reads
pub fn get_dependencies(instance: &Instance) -> Result<DependencyMap, EvalError> {
    let mut map = DependencyMap::new();

    for property in instance.class().schema.data_properties() {
        let reads = match &property.kind {
            PropertyKind::Computed { .. } => {
                let recorded = RefCell::new(Vec::<String>::new());
                instance.get_observed(&property.name, &|name| {
                    let mut recorded = recorded.borrow_mut();
                    if !recorded.iter().any(|seen| seen == name) {
                        recorded.push(name.to_string());
                    }
                })?;
                recorded.into_inner()
            }
            _ => Vec::new(),
        };
        trace!(property = %property.name, ?reads, "recorded dependencies");
        map.insert(property.name.clone(), reads);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{extend, BaseClass, BaseClassKind};
    use std::sync::Arc;

    fn dependencies(description: &str) -> Result<DependencyMap, EvalError> {
        let base = Arc::new(BaseClass::new("DefineMap", BaseClassKind::Map));
        let class = extend(&base, description).unwrap();
        let instance = Instance::new(Arc::new(class), 32)?;
        get_dependencies(&instance)
    }

    fn entry(map: &DependencyMap, name: &str) -> Vec<String> {
        map.get(name).unwrap().to_vec()
    }

    #[test]
    fn test_default_view_model() {
        let map = dependencies(
            "{first:{default:\"Kevin\"},last:{default:\"McCallister\"},get name(){return `${this.first} ${this.last}`;}}",
        )
        .unwrap();
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["first", "last", "name"]);
        assert_eq!(entry(&map, "name"), vec!["first", "last"]);
        assert!(entry(&map, "first").is_empty());
        assert!(entry(&map, "last").is_empty());
    }

    #[test]
    fn test_class_without_properties_yields_empty_map() {
        let map = dependencies("{}").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_methods_are_excluded() {
        let map = dependencies("{ a: {}, greet() { return this.a; } }").unwrap();
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["a"]);
    }

    #[test]
    fn test_reads_are_direct_and_deduplicated() {
        let map = dependencies(
            "{ a: { default: 1 }, get b() { return this.a + this.a; }, get c() { return this.b > 1 ? this.a : this.b; } }",
        )
        .unwrap();
        assert_eq!(entry(&map, "b"), vec!["a"]);
        assert_eq!(entry(&map, "c"), vec!["b", "a"]);
    }

    #[test]
    fn test_branches_not_taken_are_not_recorded() {
        let map = dependencies("{ flag: { default: false }, x: {}, get y() { if (this.flag) { return this.x; } return 0; } }")
            .unwrap();
        assert_eq!(entry(&map, "y"), vec!["flag"]);
    }

    #[test]
    fn test_mutual_getters_terminate() {
        let map = dependencies("{ get a() { return this.b; }, get b() { return this.a; } }").unwrap();
        assert_eq!(entry(&map, "a"), vec!["b"]);
        assert_eq!(entry(&map, "b"), vec!["a"]);
    }

    #[test]
    fn test_incomplete_getter_is_an_error() {
        let result = dependencies("{ get foo() { return ret; } }");
        assert_eq!(result, Err(EvalError::UnknownIdentifier("ret".to_string())));
    }

    #[test]
    fn test_runaway_string_getter_is_an_error() {
        let result = dependencies("{ get big() { return 'ab'.repeat(10000).repeat(10000).repeat(10000).length; } }");
        assert_eq!(result, Err(EvalError::Type("invalid string length".to_string())));
    }

    #[test]
    fn test_setter_after_getter_keeps_getter() {
        let map = dependencies(
            "{ first: {}, last: {}, get full() { return this.first + this.last; }, set full(v) { } }",
        )
        .unwrap();
        assert_eq!(entry(&map, "full"), vec!["first", "last"]);
    }

    #[test]
    fn test_getter_after_setter_is_computed() {
        let map = dependencies(
            "{ first: {}, last: {}, set full(v) { }, get full() { return this.first + this.last; } }",
        )
        .unwrap();
        assert_eq!(entry(&map, "full"), vec!["first", "last"]);
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["first", "last", "full"]);
    }
}
