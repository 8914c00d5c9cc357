//! Property name → names of the properties it reads.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered dependency map. Keys follow declaration order; every declared
/// property has an entry, value properties map to an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyMap(IndexMap<String, Vec<String>>);

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, property: impl Into<String>, dependencies: Vec<String>) {
        self.0.insert(property.into(), dependencies);
    }

    /// Direct dependencies; `None` for a label with no entry
    pub fn get(&self, property: &str) -> Option<&[String]> {
        self.0.get(property).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V, I> FromIterator<(K, I)> for DependencyMap
where
    K: Into<String>,
    I: IntoIterator<Item = V>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, I)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, deps)| (k.into(), deps.into_iter().map(Into::into).collect()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_iter_keeps_order() {
        let map: DependencyMap = [
            ("name", vec!["first", "last"]),
            ("first", vec![]),
            ("last", vec![]),
        ]
        .into_iter()
        .collect();

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["name", "first", "last"]);
        assert_eq!(map.get("name"), Some(&["first".to_string(), "last".to_string()][..]));
        assert_eq!(map.get("missing"), None);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let map: DependencyMap = [("a", vec!["b"])].into_iter().collect();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"a":["b"]}"#);
    }
}
