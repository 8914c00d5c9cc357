//! Structured form of a property-description literal.
//!
//! The description object handed to `DefineMap.extend` is read once into an
//! ordered list of [`PropertyDef`]s. User code inside it (defaults, getters,
//! methods) is lowered to the evaluator's AST and never executed here.

use super::SynthesisError;
use crate::eval::lower::property_key;
use crate::eval::{Expr, FunctionBody, Lowerer};
use crate::syntax::{all_children, named_children, node_text};
use tree_sitter::Node;

/// Initial value of a value property
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// `default: <expr>`
    Expr(Expr),
    /// `default() { ... }`, called once per instance
    Factory(FunctionBody),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    /// Stored property, optionally typed and defaulted
    Value {
        default: Option<DefaultValue>,
        type_name: Option<String>,
    },
    /// Getter-style property derived from other properties
    Computed { getter: FunctionBody },
    /// Prototype method; not a property of the instance's data
    Method { body: FunctionBody },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub name: String,
    pub kind: PropertyKind,
}

impl PropertyDef {
    pub fn is_computed(&self) -> bool {
        matches!(self.kind, PropertyKind::Computed { .. })
    }

    pub fn is_method(&self) -> bool {
        matches!(self.kind, PropertyKind::Method { .. })
    }
}

/// Ordered property definitions of a synthesized class
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassSchema {
    properties: Vec<PropertyDef>,
}

impl ClassSchema {
    pub fn new(properties: Vec<PropertyDef>) -> Self {
        let mut schema = Self::default();
        for property in properties {
            schema.define(property);
        }
        schema
    }

    /// Add a property; redefining a name replaces it in place
    pub fn define(&mut self, property: PropertyDef) {
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    /// Read the schema from an `object` node
    pub fn from_object(node: Node<'_>, source: &str) -> Result<Self, SynthesisError> {
        if node.kind() != "object" {
            return Err(SynthesisError::MalformedDescription(format!(
                "expected an object literal, found {}",
                node.kind()
            )));
        }

        let lowerer = Lowerer::new(source);
        let mut schema = Self::default();
        for member in named_children(node) {
            let property = match member.kind() {
                "pair" => pair_property(member, source, &lowerer)?,
                "method_definition" => {
                    let property = method_property(member, source, &lowerer)?;
                    // a setter pairs with an existing getter rather than replacing it
                    if accessor(member) == Some("set")
                        && schema.get(&property.name).is_some_and(PropertyDef::is_computed)
                    {
                        continue;
                    }
                    property
                }
                "shorthand_property_identifier" => {
                    return Err(SynthesisError::UnboundName(node_text(member, source).to_string()))
                }
                other => {
                    return Err(SynthesisError::Unsupported(format!(
                        "`{}` in a property description",
                        other
                    )))
                }
            };
            schema.define(property);
        }
        Ok(schema)
    }

    pub fn get(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties.iter()
    }

    /// Properties that make up instance data (methods excluded)
    pub fn data_properties(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties.iter().filter(|p| !p.is_method())
    }

    pub fn computed(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties.iter().filter(|p| p.is_computed())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

fn key_name(member: Node<'_>, source: &str) -> Result<String, SynthesisError> {
    let key = member
        .child_by_field_name("key")
        .or_else(|| member.child_by_field_name("name"))
        .ok_or_else(|| SynthesisError::MalformedDescription("property without a name".to_string()))?;
    property_key(key, source).ok_or_else(|| {
        SynthesisError::Unsupported(format!("computed property name `{}`", node_text(key, source)))
    })
}

fn is_function(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "function" | "function_expression" | "arrow_function" | "generator_function"
    )
}

/// Accessor keyword (`get`/`set`) of a method definition, if any
fn accessor(member: Node<'_>) -> Option<&'static str> {
    let name = member.child_by_field_name("name")?;
    all_children(member)
        .into_iter()
        .take_while(|c| c.id() != name.id())
        .map(|c| c.kind())
        .find(|kind| *kind == "get" || *kind == "set")
}

fn method_property(
    member: Node<'_>,
    source: &str,
    lowerer: &Lowerer<'_>,
) -> Result<PropertyDef, SynthesisError> {
    let name = key_name(member, source)?;
    let kind = match accessor(member) {
        Some("get") => PropertyKind::Computed {
            getter: lowerer.function(member),
        },
        Some(_) => PropertyKind::Value {
            default: None,
            type_name: None,
        },
        None => PropertyKind::Method {
            body: lowerer.function(member),
        },
    };
    Ok(PropertyDef { name, kind })
}

fn pair_property(
    member: Node<'_>,
    source: &str,
    lowerer: &Lowerer<'_>,
) -> Result<PropertyDef, SynthesisError> {
    let name = key_name(member, source)?;
    let value = member
        .child_by_field_name("value")
        .ok_or_else(|| SynthesisError::MalformedDescription(format!("`{}` has no value", name)))?;

    let kind = match value.kind() {
        "object" => descriptor(value, source, lowerer)?,
        "string" => PropertyKind::Value {
            default: None,
            type_name: Some(crate::eval::lower::unquote(node_text(value, source))),
        },
        _ if is_function(value) => PropertyKind::Method {
            body: lowerer.function(value),
        },
        _ => PropertyKind::Value {
            default: None,
            type_name: Some(node_text(value, source).to_string()),
        },
    };
    Ok(PropertyDef { name, kind })
}

/// Read a `{ default, get, type, value }` property descriptor
fn descriptor(
    node: Node<'_>,
    source: &str,
    lowerer: &Lowerer<'_>,
) -> Result<PropertyKind, SynthesisError> {
    let mut default = None;
    let mut type_name = None;
    let mut getter = None;

    for member in named_children(node) {
        match member.kind() {
            "pair" => {
                let key = key_name(member, source)?;
                let Some(value) = member.child_by_field_name("value") else {
                    continue;
                };
                match key.as_str() {
                    "default" if is_function(value) => {
                        default = Some(DefaultValue::Factory(lowerer.function(value)))
                    }
                    "default" => default = Some(DefaultValue::Expr(lowerer.expr(value))),
                    "get" if is_function(value) => getter = Some(lowerer.function(value)),
                    "type" if value.kind() == "string" => {
                        type_name = Some(crate::eval::lower::unquote(node_text(value, source)))
                    }
                    "type" => type_name = Some(node_text(value, source).to_string()),
                    _ => {}
                }
            }
            "method_definition" => match key_name(member, source)?.as_str() {
                "default" => default = Some(DefaultValue::Factory(lowerer.function(member))),
                "get" => getter = Some(lowerer.function(member)),
                _ => {}
            },
            "shorthand_property_identifier" => {
                return Err(SynthesisError::UnboundName(node_text(member, source).to_string()))
            }
            other => {
                return Err(SynthesisError::Unsupported(format!(
                    "`{}` in a property descriptor",
                    other
                )))
            }
        }
    }

    Ok(match getter {
        Some(getter) => PropertyKind::Computed { getter },
        None => PropertyKind::Value { default, type_name },
    })
}
