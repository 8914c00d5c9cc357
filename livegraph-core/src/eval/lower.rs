//! Lowering from tree-sitter nodes to the owned expression tree.
//!
//! Lowering never fails: constructs outside the supported subset become
//! `Expr::Unsupported` / `Stmt::Unsupported` and only raise when evaluated.

use super::ast::{BinaryOp, Expr, FunctionBody, LogicalOp, Stmt, UnaryOp};
use super::value::Value;
use crate::syntax::{all_children, named_children, node_text};
use tree_sitter::Node;

pub struct Lowerer<'s> {
    source: &'s str,
}

impl<'s> Lowerer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self { source }
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        node_text(node, self.source)
    }

    pub fn expr(&self, node: Node<'_>) -> Expr {
        match node.kind() {
            "string" => Expr::Literal(Value::String(unquote(self.text(node)))),
            "template_string" => self.template(node),
            "number" => Expr::Literal(Value::Number(parse_number(self.text(node)))),
            "true" => Expr::Literal(Value::Bool(true)),
            "false" => Expr::Literal(Value::Bool(false)),
            "null" => Expr::Literal(Value::Null),
            "undefined" => Expr::Literal(Value::Undefined),
            "this" => Expr::This,
            "identifier" => match self.text(node) {
                "undefined" => Expr::Literal(Value::Undefined),
                "NaN" => Expr::Literal(Value::Number(f64::NAN)),
                "Infinity" => Expr::Literal(Value::Number(f64::INFINITY)),
                name => Expr::Ident(name.to_string()),
            },
            "parenthesized_expression" => match named_children(node).as_slice() {
                [inner] => self.expr(*inner),
                _ => Expr::Unsupported("sequence expression".to_string()),
            },
            "array" => {
                let mut items = Vec::new();
                for child in named_children(node) {
                    if child.kind() == "spread_element" {
                        return Expr::Unsupported("spread element".to_string());
                    }
                    items.push(self.expr(child));
                }
                Expr::Array(items)
            }
            "object" => self.object(node),
            "member_expression" => self.member(node),
            "subscript_expression" => match (
                node.child_by_field_name("object"),
                node.child_by_field_name("index"),
            ) {
                (Some(object), Some(index)) => Expr::Index {
                    object: Box::new(self.expr(object)),
                    index: Box::new(self.expr(index)),
                },
                _ => Expr::Unsupported("subscript".to_string()),
            },
            "call_expression" => self.call(node),
            "unary_expression" => self.unary(node),
            "binary_expression" => self.binary(node),
            "ternary_expression" => match (
                node.child_by_field_name("condition"),
                node.child_by_field_name("consequence"),
                node.child_by_field_name("alternative"),
            ) {
                (Some(test), Some(consequent), Some(alternate)) => Expr::Conditional {
                    test: Box::new(self.expr(test)),
                    consequent: Box::new(self.expr(consequent)),
                    alternate: Box::new(self.expr(alternate)),
                },
                _ => Expr::Unsupported("conditional".to_string()),
            },
            "arrow_function" | "function" | "function_expression" => {
                Expr::Unsupported("function value".to_string())
            }
            other => Expr::Unsupported(other.to_string()),
        }
    }

    fn template(&self, node: Node<'_>) -> Expr {
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        // Skip the opening and closing backticks.
        let mut cursor = node.start_byte() + 1;
        let end = node.end_byte().saturating_sub(1);

        for child in named_children(node) {
            if child.kind() != "template_substitution" {
                continue;
            }
            quasis.push(unescape(&self.source[cursor..child.start_byte()]));
            exprs.push(match named_children(child).as_slice() {
                [inner] => self.expr(*inner),
                _ => Expr::Unsupported("template substitution".to_string()),
            });
            cursor = child.end_byte();
        }
        quasis.push(unescape(&self.source[cursor..end.max(cursor)]));

        Expr::Template { quasis, exprs }
    }

    fn object(&self, node: Node<'_>) -> Expr {
        let mut fields = Vec::new();
        for member in named_children(node) {
            if member.kind() != "pair" {
                return Expr::Unsupported(format!("object member `{}`", member.kind()));
            }
            let (Some(key), Some(value)) = (
                member.child_by_field_name("key"),
                member.child_by_field_name("value"),
            ) else {
                return Expr::Unsupported("object member".to_string());
            };
            match property_key(key, self.source) {
                Some(name) => fields.push((name, self.expr(value))),
                None => return Expr::Unsupported("computed key".to_string()),
            }
        }
        Expr::Object(fields)
    }

    fn member(&self, node: Node<'_>) -> Expr {
        let (Some(object), Some(property)) = (
            node.child_by_field_name("object"),
            node.child_by_field_name("property"),
        ) else {
            return Expr::Unsupported("member".to_string());
        };
        let optional = all_children(node)
            .iter()
            .any(|c| c.kind() == "?." || c.kind() == "optional_chain");
        Expr::Member {
            object: Box::new(self.expr(object)),
            property: self.text(property).to_string(),
            optional,
        }
    }

    fn call(&self, node: Node<'_>) -> Expr {
        let (Some(function), Some(arguments)) = (
            node.child_by_field_name("function"),
            node.child_by_field_name("arguments"),
        ) else {
            return Expr::Unsupported("call".to_string());
        };
        if arguments.kind() != "arguments" {
            return Expr::Unsupported("tagged template".to_string());
        }
        Expr::Call {
            callee: Box::new(self.expr(function)),
            args: named_children(arguments).into_iter().map(|a| self.expr(a)).collect(),
        }
    }

    fn operator(node: Node<'_>) -> Option<&'static str> {
        node.child_by_field_name("operator")
            .or_else(|| all_children(node).into_iter().find(|c| !c.is_named()))
            .map(|op| op.kind())
    }

    fn unary(&self, node: Node<'_>) -> Expr {
        let op = match Self::operator(node) {
            Some("!") => UnaryOp::Not,
            Some("-") => UnaryOp::Neg,
            Some("+") => UnaryOp::Plus,
            Some("typeof") => UnaryOp::TypeOf,
            Some(other) => return Expr::Unsupported(format!("operator `{}`", other)),
            None => return Expr::Unsupported("unary".to_string()),
        };
        match node.child_by_field_name("argument") {
            Some(arg) => Expr::Unary {
                op,
                arg: Box::new(self.expr(arg)),
            },
            None => Expr::Unsupported("unary".to_string()),
        }
    }

    fn binary(&self, node: Node<'_>) -> Expr {
        let (Some(left), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) else {
            return Expr::Unsupported("binary".to_string());
        };
        let Some(token) = Self::operator(node) else {
            return Expr::Unsupported("binary".to_string());
        };
        let left = Box::new(self.expr(left));
        let right = Box::new(self.expr(right));

        if let Some(op) = LogicalOp::from_token(token) {
            Expr::Logical { op, left, right }
        } else if let Some(op) = BinaryOp::from_token(token) {
            Expr::Binary { op, left, right }
        } else {
            Expr::Unsupported(format!("operator `{}`", token))
        }
    }

    /// Lower a function-like node (method, function expression, arrow)
    pub fn function(&self, node: Node<'_>) -> FunctionBody {
        let params = node
            .child_by_field_name("parameters")
            .map(|params| {
                named_children(params)
                    .into_iter()
                    .map(|p| self.text(p).to_string())
                    .collect()
            })
            .or_else(|| {
                node.child_by_field_name("parameter")
                    .map(|p| vec![self.text(p).to_string()])
            })
            .unwrap_or_default();

        let body = match node.child_by_field_name("body") {
            Some(body) if body.kind() == "statement_block" => self.block(body),
            Some(expr) => return FunctionBody { params, ..FunctionBody::returning(self.expr(expr)) },
            None => vec![Stmt::Unsupported("function without body".to_string())],
        };
        FunctionBody { params, body }
    }

    fn block(&self, node: Node<'_>) -> Vec<Stmt> {
        let mut out = Vec::new();
        for child in named_children(node) {
            self.stmt(child, &mut out);
        }
        out
    }

    fn stmt(&self, node: Node<'_>, out: &mut Vec<Stmt>) {
        match node.kind() {
            "lexical_declaration" | "variable_declaration" => {
                for declarator in named_children(node) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    match declarator.child_by_field_name("name") {
                        Some(name) if name.kind() == "identifier" => out.push(Stmt::Let {
                            name: self.text(name).to_string(),
                            init: declarator.child_by_field_name("value").map(|v| self.expr(v)),
                        }),
                        _ => out.push(Stmt::Unsupported("destructuring".to_string())),
                    }
                }
            }
            "expression_statement" => match named_children(node).first() {
                Some(expr) => out.push(Stmt::Expr(self.expr(*expr))),
                None => out.push(Stmt::Empty),
            },
            "return_statement" => {
                out.push(Stmt::Return(named_children(node).first().map(|e| self.expr(*e))));
            }
            "if_statement" => {
                let test = node
                    .child_by_field_name("condition")
                    .map_or_else(|| Expr::Unsupported("if".to_string()), |c| self.expr(c));
                let consequent = node
                    .child_by_field_name("consequence")
                    .map(|c| self.nested(c))
                    .unwrap_or_default();
                let alternate = node.child_by_field_name("alternative").map(|alt| {
                    // `else_clause` wraps the statement in newer grammars.
                    match alt.kind() {
                        "else_clause" => named_children(alt)
                            .first()
                            .map(|s| self.nested(*s))
                            .unwrap_or_default(),
                        _ => self.nested(alt),
                    }
                });
                out.push(Stmt::If {
                    test,
                    consequent,
                    alternate,
                });
            }
            "statement_block" => out.push(Stmt::Block(self.block(node))),
            "empty_statement" => out.push(Stmt::Empty),
            other => out.push(Stmt::Unsupported(other.to_string())),
        }
    }

    fn nested(&self, node: Node<'_>) -> Vec<Stmt> {
        if node.kind() == "statement_block" {
            self.block(node)
        } else {
            let mut out = Vec::new();
            self.stmt(node, &mut out);
            out
        }
    }
}

/// Name of an object key: identifiers, string literals and numbers
pub fn property_key(node: Node<'_>, source: &str) -> Option<String> {
    let text = node_text(node, source);
    match node.kind() {
        "property_identifier" | "identifier" | "private_property_identifier" => Some(text.to_string()),
        "string" => Some(unquote(text)),
        "number" => Some(super::value::format_number(parse_number(text))),
        _ => None,
    }
}

/// Strip the quotes of a string literal and resolve escapes
pub fn unquote(literal: &str) -> String {
    let inner = literal
        .strip_prefix(&['"', '\''][..])
        .and_then(|s| s.strip_suffix(&['"', '\''][..]))
        .unwrap_or(literal);
    unescape(inner)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            // line continuation
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

pub fn parse_number(text: &str) -> f64 {
    let cleaned = text.replace('_', "");
    let cleaned = cleaned.trim_end_matches('n');
    let radix = |prefix: &[&str], radix: u32| {
        prefix
            .iter()
            .find_map(|p| cleaned.strip_prefix(p))
            .map(|digits| i64::from_str_radix(digits, radix).map_or(f64::NAN, |v| v as f64))
    };
    radix(&["0x", "0X"], 16)
        .or_else(|| radix(&["0o", "0O"], 8))
        .or_else(|| radix(&["0b", "0B"], 2))
        .unwrap_or_else(|| cleaned.parse::<f64>().unwrap_or(f64::NAN))
}
