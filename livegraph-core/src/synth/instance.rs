//! Live instances of synthesized classes.

use super::schema::{DefaultValue, PropertyKind};
use super::SynthesizedClass;
use crate::eval::{Detached, EvalError, Evaluator, ThisBinding, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::sync::Arc;

/// An instance with its stored values populated from the class defaults.
///
/// Instances are read-only: computed properties are evaluated on demand and
/// nothing a getter does can change stored values.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    class: Arc<SynthesizedClass>,
    values: IndexMap<String, Value>,
    max_depth: usize,
}

impl Instance {
    /// `new Class()`: evaluate every default
    pub fn new(class: Arc<SynthesizedClass>, max_depth: usize) -> Result<Self, EvalError> {
        let mut values = IndexMap::new();
        for property in class.schema.data_properties() {
            let PropertyKind::Value { default, .. } = &property.kind else {
                continue;
            };
            let mut evaluator = Evaluator::new(&Detached, max_depth);
            let value = match default {
                Some(DefaultValue::Expr(expr)) => evaluator.eval(expr)?,
                Some(DefaultValue::Factory(factory)) => evaluator.call(factory)?,
                None => Value::Undefined,
            };
            values.insert(property.name.clone(), value);
        }
        Ok(Self {
            class,
            values,
            max_depth,
        })
    }

    pub fn class(&self) -> &Arc<SynthesizedClass> {
        &self.class
    }

    /// Stored value of a value property
    pub fn stored(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Read a property, evaluating it if it is computed
    pub fn get(&self, name: &str) -> Result<Value, EvalError> {
        let active = RefCell::new(Vec::new());
        self.resolve(name, 0, &active, None)
    }

    /// Evaluate property `name`, reporting each `this.<prop>` read its own
    /// getter makes to `observer`. Reads made by nested getters are not
    /// reported.
    pub fn get_observed(&self, name: &str, observer: &dyn Fn(&str)) -> Result<Value, EvalError> {
        let active = RefCell::new(Vec::new());
        self.resolve(name, 0, &active, Some(observer))
    }

    fn resolve(
        &self,
        name: &str,
        depth: usize,
        active: &RefCell<Vec<String>>,
        observer: Option<&dyn Fn(&str)>,
    ) -> Result<Value, EvalError> {
        let Some(property) = self.class.schema.get(name) else {
            return Ok(Value::Undefined);
        };
        match &property.kind {
            PropertyKind::Computed { getter } => {
                // A getter that reaches itself again sees `undefined`.
                if active.borrow().iter().any(|n| n == name) {
                    return Ok(Value::Undefined);
                }
                active.borrow_mut().push(name.to_string());
                let scope = Scope {
                    instance: self,
                    depth: depth + 1,
                    active,
                    observer,
                };
                let result = Evaluator::nested(&scope, depth, self.max_depth).call(getter);
                active.borrow_mut().pop();
                result
            }
            PropertyKind::Method { .. } => Ok(Value::Undefined),
            PropertyKind::Value { .. } => Ok(self.values.get(name).cloned().unwrap_or_default()),
        }
    }
}

/// `this` inside one getter evaluation
struct Scope<'a> {
    instance: &'a Instance,
    depth: usize,
    active: &'a RefCell<Vec<String>>,
    observer: Option<&'a dyn Fn(&str)>,
}

impl ThisBinding for Scope<'_> {
    fn read(&self, property: &str) -> Result<Value, EvalError> {
        if let Some(observer) = self.observer {
            observer(property);
        }
        self.instance.resolve(property, self.depth, self.active, None)
    }
}
