//! Sandboxed evaluator for user-written expressions.
//!
//! The only code path that runs anything the user typed. It interprets the
//! owned [`Expr`]/[`Stmt`] tree over plain [`Value`]s; `this` reads go through
//! a [`ThisBinding`], and there is no assignment, no I/O and no access to
//! host state. Anything outside the supported subset is an
//! [`EvalError::Unsupported`].

pub mod ast;
pub mod lower;
pub mod value;

pub use ast::{BinaryOp, Expr, FunctionBody, LogicalOp, Stmt, UnaryOp};
pub use lower::Lowerer;
pub use value::Value;

use crate::constants::{DEFAULT_MAX_EVAL_DEPTH, MAX_STRING_LENGTH};
use crate::syntax::{named_children, SyntaxTree};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("{0} is not defined")]
    UnknownIdentifier(String),

    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("evaluation nested deeper than {0} levels")]
    DepthExceeded(usize),

    #[error("invalid expression: {0}")]
    Syntax(String),
}

/// Receiver of `this.<name>` reads
pub trait ThisBinding {
    fn read(&self, property: &str) -> Result<Value, EvalError>;
}

/// `this` for code evaluated outside any instance: every property is `undefined`
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl ThisBinding for Detached {
    fn read(&self, _property: &str) -> Result<Value, EvalError> {
        Ok(Value::Undefined)
    }
}

/// Evaluate a standalone expression with no instance and no ambient bindings
pub fn evaluate_user_expression(source: &str) -> Result<Value, EvalError> {
    let wrapped = format!("({}\n);", source);
    let tree = SyntaxTree::parse(&wrapped).map_err(|e| EvalError::Syntax(e.to_string()))?;
    let statements = tree.statements();
    let [statement] = statements.as_slice() else {
        return Err(EvalError::Syntax("expected a single expression".to_string()));
    };
    let Some(expr) = named_children(*statement).first().copied() else {
        return Err(EvalError::Syntax("expected a single expression".to_string()));
    };
    let expr = Lowerer::new(tree.source()).expr(expr);
    Evaluator::new(&Detached, DEFAULT_MAX_EVAL_DEPTH).eval(&expr)
}

enum Flow {
    Normal,
    Return(Value),
}

pub struct Evaluator<'h> {
    this: &'h dyn ThisBinding,
    scopes: Vec<HashMap<String, Value>>,
    depth: usize,
    max_depth: usize,
}

impl<'h> Evaluator<'h> {
    pub fn new(this: &'h dyn ThisBinding, max_depth: usize) -> Self {
        Self::nested(this, 0, max_depth)
    }

    /// Evaluator for a call made `depth` levels below the outermost one
    pub fn nested(this: &'h dyn ThisBinding, depth: usize, max_depth: usize) -> Self {
        Self {
            this,
            scopes: Vec::new(),
            depth,
            max_depth,
        }
    }

    /// Run a function body; falling off the end yields `undefined`
    pub fn call(&mut self, function: &FunctionBody) -> Result<Value, EvalError> {
        if self.depth >= self.max_depth {
            return Err(EvalError::DepthExceeded(self.max_depth));
        }
        let mut frame = HashMap::new();
        for param in &function.params {
            frame.insert(param.clone(), Value::Undefined);
        }
        self.scopes.push(frame);
        let flow = self.exec_stmts(&function.body);
        self.scopes.pop();
        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Undefined),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow, EvalError> {
        self.scopes.push(HashMap::new());
        let flow = self.exec_stmts(stmts);
        self.scopes.pop();
        flow
    }

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<Flow, EvalError> {
        for stmt in stmts {
            if let Flow::Return(value) = self.exec(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, EvalError> {
        match stmt {
            Stmt::Let { name, init } => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Undefined,
                };
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.clone(), value);
                } else {
                    self.scopes.push(HashMap::from([(name.clone(), value)]));
                }
                Ok(Flow::Normal)
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Return(expr) => Ok(Flow::Return(match expr {
                Some(expr) => self.eval(expr)?,
                None => Value::Undefined,
            })),
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.exec_block(consequent)
                } else if let Some(alternate) = alternate {
                    self.exec_block(alternate)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(stmts) => self.exec_block(stmts),
            Stmt::Empty => Ok(Flow::Normal),
            Stmt::Unsupported(kind) => Err(EvalError::Unsupported(kind.clone())),
        }
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Evaluates `expr`, rejecting any result larger than [`MAX_STRING_LENGTH`]
    pub fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        let value = self.eval_expr(expr)?;
        check_size(&value)?;
        Ok(value)
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Template { quasis, exprs } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = exprs.get(i) {
                        let part = self.eval(expr)?.to_display_string();
                        check_length(out.len().saturating_add(part.len()))?;
                        out.push_str(&part);
                    }
                }
                Ok(Value::String(out))
            }
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Object(fields) => {
                let mut object = indexmap::IndexMap::new();
                for (key, value) in fields {
                    let value = self.eval(value)?;
                    object.insert(key.clone(), value);
                }
                Ok(Value::Object(object))
            }
            Expr::This => Err(EvalError::Unsupported("`this` as a value".to_string())),
            Expr::Ident(name) => self
                .lookup(name)
                .cloned()
                .ok_or_else(|| EvalError::UnknownIdentifier(name.clone())),
            Expr::Member {
                object,
                property,
                optional,
            } => match object.as_ref() {
                Expr::This => self.this.read(property),
                Expr::Ident(name) if name == "Math" && self.lookup(name).is_none() => {
                    math_constant(property)
                }
                _ => {
                    let receiver = self.eval(object)?;
                    get_member(&receiver, property, *optional)
                }
            },
            Expr::Index { object, index } => {
                let key = self.eval(index)?;
                if matches!(object.as_ref(), Expr::This) {
                    return self.this.read(&key.to_display_string());
                }
                let receiver = self.eval(object)?;
                match (&receiver, &key) {
                    (Value::Array(items), Value::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => {
                        Ok(items.get(*n as usize).cloned().unwrap_or_default())
                    }
                    _ => get_member(&receiver, &key.to_display_string(), false),
                }
            }
            Expr::Call { callee, args } => self.eval_call(callee, args),
            Expr::Unary { op, arg } => {
                if let (UnaryOp::TypeOf, Expr::Ident(name)) = (op, arg.as_ref()) {
                    if self.lookup(name).is_none() {
                        return Ok(Value::string("undefined"));
                    }
                }
                let value = self.eval(arg)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::TypeOf => Value::string(value.type_of()),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Expr::Unsupported(kind) => Err(EvalError::Unsupported(kind.clone())),
        }
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value, EvalError> {
        let args = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;

        match callee {
            Expr::Ident(name) if self.lookup(name).is_none() => global_function(name, &args),
            Expr::Member { object, property, optional } => match object.as_ref() {
                Expr::This => Err(EvalError::Unsupported(format!("method call this.{}()", property))),
                Expr::Ident(name) if name == "Math" && self.lookup(name).is_none() => {
                    math_function(property, &args)
                }
                _ => {
                    let receiver = self.eval(object)?;
                    if *optional && receiver.is_nullish() {
                        return Ok(Value::Undefined);
                    }
                    call_method(&receiver, property, &args)
                }
            },
            _ => Err(EvalError::Unsupported("call of a non-method".to_string())),
        }
    }
}

fn string_length_error() -> EvalError {
    EvalError::Type("invalid string length".to_string())
}

fn check_length(len: usize) -> Result<(), EvalError> {
    if len > MAX_STRING_LENGTH {
        Err(string_length_error())
    } else {
        Ok(())
    }
}

fn check_size(value: &Value) -> Result<(), EvalError> {
    match value {
        Value::String(s) => check_length(s.len()),
        Value::Array(_) | Value::Object(_) if value.footprint() > MAX_STRING_LENGTH => {
            Err(EvalError::Type("invalid array length".to_string()))
        }
        _ => Ok(()),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let stringy = |v: &Value| matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_));
    Ok(match op {
        BinaryOp::Add if stringy(left) || stringy(right) => {
            let left = left.to_display_string();
            let right = right.to_display_string();
            check_length(left.len().saturating_add(right.len()))?;
            Value::String(left + &right)
        }
        BinaryOp::Add => Value::Number(left.to_number() + right.to_number()),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_equals(right)),
        BinaryOp::LooseEq => Value::Bool(left.loose_equals(right)),
        BinaryOp::LooseNe => Value::Bool(!left.loose_equals(right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            Value::Bool(match ordering {
                None => false,
                Some(ordering) => match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
            })
        }
    })
}

fn get_member(receiver: &Value, property: &str, optional: bool) -> Result<Value, EvalError> {
    match receiver {
        Value::Undefined | Value::Null if optional => Ok(Value::Undefined),
        Value::Undefined | Value::Null => Err(EvalError::Type(format!(
            "cannot read properties of {} (reading '{}')",
            receiver.to_display_string(),
            property
        ))),
        Value::String(s) if property == "length" => Ok(Value::Number(s.encode_utf16().count() as f64)),
        Value::Array(items) if property == "length" => Ok(Value::Number(items.len() as f64)),
        Value::Object(fields) => Ok(fields.get(property).cloned().unwrap_or_default()),
        _ => Ok(Value::Undefined),
    }
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// Clamp a relative index the way `slice` does
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = value.to_number();
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    if n < 0.0 {
        len.saturating_sub((-n) as usize)
    } else {
        (n as usize).min(len)
    }
}

fn call_method(receiver: &Value, method: &str, args: &[Value]) -> Result<Value, EvalError> {
    match receiver {
        Value::String(s) => string_method(s, method, args),
        Value::Array(items) => array_method(items, method, args),
        Value::Number(n) => match method {
            "toFixed" => {
                let digits = arg(args, 0).to_number();
                let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 100.0) as usize };
                Ok(Value::String(format!("{:.*}", digits, n)))
            }
            "toString" => Ok(Value::String(value::format_number(*n))),
            _ => Err(EvalError::Type(format!("{} is not a function", method))),
        },
        Value::Undefined | Value::Null => Err(EvalError::Type(format!(
            "cannot read properties of {} (reading '{}')",
            receiver.to_display_string(),
            method
        ))),
        _ => match method {
            "toString" => Ok(Value::String(receiver.to_display_string())),
            _ => Err(EvalError::Type(format!("{} is not a function", method))),
        },
    }
}

fn string_method(s: &str, method: &str, args: &[Value]) -> Result<Value, EvalError> {
    let chars: Vec<char> = s.chars().collect();
    let text_arg = |i: usize| arg(args, i).to_display_string();
    Ok(match method {
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::string(s.trim()),
        "trimStart" => Value::string(s.trim_start()),
        "trimEnd" => Value::string(s.trim_end()),
        "toString" => Value::string(s),
        "includes" => Value::Bool(s.contains(&text_arg(0))),
        "startsWith" => Value::Bool(s.starts_with(&text_arg(0))),
        "endsWith" => Value::Bool(s.ends_with(&text_arg(0))),
        "indexOf" => Value::Number(
            s.find(&text_arg(0))
                .map_or(-1.0, |byte| s[..byte].chars().count() as f64),
        ),
        "charAt" => {
            let index = relative_index(&arg(args, 0), chars.len(), 0);
            Value::String(chars.get(index).map(|c| c.to_string()).unwrap_or_default())
        }
        "slice" | "substring" => {
            let start = relative_index(&arg(args, 0), chars.len(), 0);
            let end = relative_index(&arg(args, 1), chars.len(), chars.len());
            let (start, end) = if method == "substring" && start > end {
                (end, start)
            } else {
                (start, end.max(start))
            };
            Value::String(chars[start..end].iter().collect())
        }
        "concat" => {
            let parts: Vec<String> = args.iter().map(Value::to_display_string).collect();
            check_length(parts.iter().fold(s.len(), |len, part| len.saturating_add(part.len())))?;
            Value::String(std::iter::once(s).chain(parts.iter().map(String::as_str)).collect())
        }
        "repeat" => {
            let count = arg(args, 0).to_number();
            if !(0.0..=10_000.0).contains(&count) {
                return Err(EvalError::Type("invalid count value".to_string()));
            }
            check_length(s.len().saturating_mul(count as usize))?;
            Value::String(s.repeat(count as usize))
        }
        "padStart" | "padEnd" => {
            let width = arg(args, 0).to_number();
            let width = if width.is_nan() { 0 } else { width.clamp(0.0, 10_000.0) as usize };
            let fill = match args.get(1) {
                Some(v) => v.to_display_string(),
                None => " ".to_string(),
            };
            let missing = width.saturating_sub(chars.len());
            let fill_width = fill.chars().map(char::len_utf8).max().unwrap_or(0);
            check_length(s.len().saturating_add(missing.saturating_mul(fill_width)))?;
            let pad: String = fill.chars().cycle().take(if fill.is_empty() { 0 } else { missing }).collect();
            if method == "padStart" {
                Value::String(pad + s)
            } else {
                Value::String(s.to_string() + &pad)
            }
        }
        "split" => match args.first() {
            None | Some(Value::Undefined) => Value::Array(vec![Value::string(s)]),
            Some(sep) => {
                let sep = sep.to_display_string();
                if sep.is_empty() {
                    Value::Array(chars.iter().map(|c| Value::String(c.to_string())).collect())
                } else {
                    Value::Array(s.split(sep.as_str()).map(Value::string).collect())
                }
            }
        },
        _ => return Err(EvalError::Type(format!("{} is not a function", method))),
    })
}

fn array_method(items: &[Value], method: &str, args: &[Value]) -> Result<Value, EvalError> {
    Ok(match method {
        "join" => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(sep) => sep.to_display_string(),
            };
            let parts: Vec<String> = items
                .iter()
                .map(|item| if item.is_nullish() { String::new() } else { item.to_display_string() })
                .collect();
            let separators = sep.len().saturating_mul(parts.len().saturating_sub(1));
            check_length(parts.iter().fold(separators, |len, part| len.saturating_add(part.len())))?;
            Value::String(parts.join(&sep))
        }
        "toString" => Value::String(Value::Array(items.to_vec()).to_display_string()),
        "includes" => {
            let needle = arg(args, 0);
            Value::Bool(items.iter().any(|item| item.strict_equals(&needle)))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            Value::Number(
                items
                    .iter()
                    .position(|item| item.strict_equals(&needle))
                    .map_or(-1.0, |i| i as f64),
            )
        }
        "slice" => {
            let start = relative_index(&arg(args, 0), items.len(), 0);
            let end = relative_index(&arg(args, 1), items.len(), items.len()).max(start);
            Value::Array(items[start..end].to_vec())
        }
        "concat" => {
            let mut out = items.to_vec();
            for value in args {
                match value {
                    Value::Array(more) => out.extend(more.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            let out = Value::Array(out);
            check_size(&out)?;
            out
        }
        _ => return Err(EvalError::Type(format!("{} is not a function", method))),
    })
}

fn global_function(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let first = arg(args, 0);
    match name {
        "String" => Ok(Value::String(if args.is_empty() { String::new() } else { first.to_display_string() })),
        "Number" => Ok(Value::Number(if args.is_empty() { 0.0 } else { first.to_number() })),
        "Boolean" => Ok(Value::Bool(first.is_truthy())),
        _ => Err(EvalError::UnknownIdentifier(name.to_string())),
    }
}

fn math_constant(name: &str) -> Result<Value, EvalError> {
    match name {
        "PI" => Ok(Value::Number(std::f64::consts::PI)),
        "E" => Ok(Value::Number(std::f64::consts::E)),
        _ => Ok(Value::Undefined),
    }
}

fn math_function(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let numbers: Vec<f64> = args.iter().map(Value::to_number).collect();
    let x = numbers.first().copied().unwrap_or(f64::NAN);
    let result = match name {
        "abs" => x.abs(),
        "floor" => x.floor(),
        "ceil" => x.ceil(),
        // JavaScript rounds half-way cases up, toward +∞.
        "round" => (x + 0.5).floor(),
        "trunc" => x.trunc(),
        "sqrt" => x.sqrt(),
        "max" => numbers.iter().copied().fold(f64::NEG_INFINITY, |a, b| {
            if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
        }),
        "min" => numbers.iter().copied().fold(f64::INFINITY, |a, b| {
            if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
        }),
        _ => return Err(EvalError::Type(format!("Math.{} is not a function", name))),
    };
    Ok(Value::Number(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_and_arithmetic() {
        assert_eq!(evaluate_user_expression("1 + 2 * 3").unwrap(), Value::Number(7.0));
        assert_eq!(evaluate_user_expression("'a' + 1").unwrap(), Value::string("a1"));
        assert_eq!(evaluate_user_expression("[1, 2].length").unwrap(), Value::Number(2.0));
        assert_eq!(evaluate_user_expression("10 % 4").unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_string_growth_is_bounded() {
        let too_long: Result<Value, EvalError> = Err(EvalError::Type("invalid string length".to_string()));
        assert_eq!(
            evaluate_user_expression("'ab'.repeat(10000).repeat(10000).repeat(10000).length"),
            too_long
        );
        assert_eq!(
            evaluate_user_expression("'a'.repeat(10000).repeat(100).length").unwrap(),
            Value::Number(1_000_000.0)
        );
        assert_eq!(evaluate_user_expression("'a'.repeat(10000).repeat(100).repeat(2)"), too_long);

        let half = "'a'.repeat(10000).repeat(60)";
        assert_eq!(evaluate_user_expression(&format!("{0} + {0}", half)), too_long);
        assert_eq!(evaluate_user_expression(&format!("`${{{0}}}${{{0}}}`", half)), too_long);
        assert_eq!(evaluate_user_expression(&format!("{0}.concat({0})", half)), too_long);
        assert_eq!(evaluate_user_expression(&format!("[{0}, ''].join({0})", half)), too_long);
        assert_eq!(
            evaluate_user_expression(&format!("[{0}, {0}]", half)),
            Err(EvalError::Type("invalid array length".to_string()))
        );
    }

    #[test]
    fn test_templates_and_methods() {
        assert_eq!(
            evaluate_user_expression("`${'kevin'.toUpperCase()} ${[1, 2].join('-')}`").unwrap(),
            Value::string("KEVIN 1-2")
        );
        assert_eq!(evaluate_user_expression("'abcdef'.slice(-2)").unwrap(), Value::string("ef"));
        assert_eq!(evaluate_user_expression("(3.14159).toFixed(2)").unwrap(), Value::string("3.14"));
        assert_eq!(evaluate_user_expression("Math.max(1, 5, 3)").unwrap(), Value::Number(5.0));
    }

    #[test]
    fn test_logical_and_conditional() {
        assert_eq!(evaluate_user_expression("null ?? 'x'").unwrap(), Value::string("x"));
        assert_eq!(evaluate_user_expression("0 || 'y'").unwrap(), Value::string("y"));
        assert_eq!(evaluate_user_expression("1 > 2 ? 'a' : 'b'").unwrap(), Value::string("b"));
        assert_eq!(evaluate_user_expression("typeof nothing").unwrap(), Value::string("undefined"));
    }

    #[test]
    fn test_sandbox_has_no_ambient_bindings() {
        assert_eq!(
            evaluate_user_expression("process"),
            Err(EvalError::UnknownIdentifier("process".to_string()))
        );
        assert!(matches!(
            evaluate_user_expression("globalThis.fetch('x')"),
            Err(EvalError::UnknownIdentifier(_))
        ));
        assert!(matches!(evaluate_user_expression("x = 1"), Err(EvalError::Unsupported(_))));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(evaluate_user_expression("1 +"), Err(EvalError::Syntax(_))));
        assert!(matches!(evaluate_user_expression("1); (2"), Err(EvalError::Syntax(_))));
    }

    #[test]
    fn test_reading_through_undefined_is_a_type_error() {
        assert!(matches!(evaluate_user_expression("undefined.x"), Err(EvalError::Type(_))));
        assert_eq!(evaluate_user_expression("undefined?.x").unwrap(), Value::Undefined);
    }

    struct Fields(HashMap<&'static str, Value>);

    impl ThisBinding for Fields {
        fn read(&self, property: &str) -> Result<Value, EvalError> {
            Ok(self.0.get(property).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn test_function_bodies_with_locals_and_branches() {
        let this = Fields(HashMap::from([
            ("first", Value::string("Kevin")),
            ("count", Value::Number(3.0)),
        ]));
        let body = FunctionBody {
            params: Vec::new(),
            body: vec![
                Stmt::Let {
                    name: "n".to_string(),
                    init: Some(Expr::Member {
                        object: Box::new(Expr::This),
                        property: "count".to_string(),
                        optional: false,
                    }),
                },
                Stmt::If {
                    test: Expr::Binary {
                        op: BinaryOp::Gt,
                        left: Box::new(Expr::Ident("n".to_string())),
                        right: Box::new(Expr::Literal(Value::Number(2.0))),
                    },
                    consequent: vec![Stmt::Return(Some(Expr::Member {
                        object: Box::new(Expr::This),
                        property: "first".to_string(),
                        optional: false,
                    }))],
                    alternate: None,
                },
                Stmt::Return(Some(Expr::Literal(Value::Null))),
            ],
        };
        let result = Evaluator::new(&this, 8).call(&body).unwrap();
        assert_eq!(result, Value::string("Kevin"));
    }

    #[test]
    fn test_depth_limit() {
        let body = FunctionBody::returning(Expr::Literal(Value::Number(1.0)));
        let result = Evaluator::nested(&Detached, 8, 8).call(&body);
        assert_eq!(result, Err(EvalError::DepthExceeded(8)));
    }
}
