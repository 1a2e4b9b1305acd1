//! Expression evaluator
//!
//! Evaluates a parsed [`Expr`] against a [`Scope`] of named bindings, following
//! JavaScript semantics for the operators the grammar supports.

use crate::error::EvalError;
use crate::parser::{BinaryOp, Expr, Literal, LogicalOp, UnaryOp};
use crate::value::{Function, Value};
use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maximum nesting of user method calls
pub const MAX_CALL_DEPTH: usize = 64;

/// Maximum evaluator recursion, across method calls
pub const MAX_EVAL_DEPTH: usize = 1024;

/// Named bindings visible to an expression
#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: BTreeMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.bindings.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

/// Evaluate an expression in a scope
pub fn evaluate(expr: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    Evaluator {
        scope,
        depth: Cell::new(0),
    }
    .eval(expr, &Frame::default())
}

/// Parameters of the user method currently executing
#[derive(Default)]
struct Frame {
    locals: Vec<(String, Value)>,
    depth: usize,
}

impl Frame {
    fn get(&self, name: &str) -> Option<&Value> {
        self.locals
            .iter()
            .find(|(local, _)| local == name)
            .map(|(_, value)| value)
    }
}

struct Evaluator<'s> {
    scope: &'s Scope,
    depth: Cell<usize>,
}

impl<'s> Evaluator<'s> {
    fn eval(&self, expr: &Expr, frame: &Frame) -> Result<Value, EvalError> {
        let depth = self.depth.get();
        if depth >= MAX_EVAL_DEPTH {
            return Err(EvalError::Nesting(MAX_EVAL_DEPTH));
        }
        self.depth.set(depth + 1);
        let result = self.eval_node(expr, frame);
        self.depth.set(depth);
        result
    }

    fn eval_node(&self, expr: &Expr, frame: &Frame) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),
            Expr::Ident(name) => frame
                .get(name)
                .or_else(|| self.scope.get(name))
                .cloned()
                .ok_or_else(|| EvalError::Reference(name.clone())),
            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::array(values))
            }
            Expr::Member { object, property } => {
                let target = self.eval(object, frame)?;
                get_member(&target, property)
            }
            Expr::Index { object, index } => {
                let target = self.eval(object, frame)?;
                let key = self.eval(index, frame)?;
                get_index(&target, &key)
            }
            Expr::Call { callee, args } => self.eval_call(callee, args, frame),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, frame)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, frame)?;
                let right = self.eval(right, frame)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, frame)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, frame)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, frame)?.is_truthy() {
                    self.eval(consequent, frame)
                } else {
                    self.eval(alternate, frame)
                }
            }
        }
    }

    fn eval_call(&self, callee: &Expr, args: &[Expr], frame: &Frame) -> Result<Value, EvalError> {
        let target = match callee {
            Expr::Member { object, property } => {
                let receiver = self.eval(object, frame)?;
                if let Some(method) = builtin_method(&receiver, property) {
                    let args = self.eval_args(args, frame)?;
                    return method(&receiver, &args);
                }
                get_member(&receiver, property)?
            }
            other => self.eval(other, frame)?,
        };

        let Value::Function(function) = target else {
            return Err(EvalError::Type(format!(
                "{} is not a function",
                callee.path().unwrap_or_else(|| "expression".to_string())
            )));
        };

        let args = self.eval_args(args, frame)?;
        self.call(&function, args, frame.depth)
    }

    fn eval_args(&self, args: &[Expr], frame: &Frame) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.eval(arg, frame)).collect()
    }

    fn call(&self, function: &Function, args: Vec<Value>, depth: usize) -> Result<Value, EvalError> {
        match function {
            Function::Native(native) => native.call(&args),
            Function::Method(method) => {
                if depth >= MAX_CALL_DEPTH {
                    return Err(EvalError::CallDepth(MAX_CALL_DEPTH));
                }

                // Missing arguments are undefined, extra ones are dropped
                let mut args = args.into_iter();
                let locals = method
                    .params
                    .iter()
                    .map(|param| (param.clone(), args.next().unwrap_or_default()))
                    .collect();

                let frame = Frame {
                    locals,
                    depth: depth + 1,
                };
                self.eval(&method.body, &frame)
            }
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Undefined => Value::Undefined,
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::String(s.clone()),
    }
}

fn get_member(target: &Value, property: &str) -> Result<Value, EvalError> {
    match target {
        Value::Undefined | Value::Null => Err(EvalError::Type(format!(
            "Cannot read properties of {} (reading '{}')",
            target, property
        ))),
        Value::Object(map) => Ok(map.get(property).cloned().unwrap_or_default()),
        Value::Array(items) => Ok(match property {
            "length" => Value::Number(items.len() as f64),
            _ => array_index(property)
                .and_then(|i| items.get(i).cloned())
                .unwrap_or_default(),
        }),
        Value::String(s) => Ok(match property {
            "length" => Value::Number(s.encode_utf16().count() as f64),
            // Indexes count UTF-16 units like `length`; half of a surrogate pair reads as U+FFFD
            _ => array_index(property)
                .and_then(|i| s.encode_utf16().nth(i))
                .map(|unit| {
                    Value::String(
                        char::decode_utf16([unit])
                            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                            .collect(),
                    )
                })
                .unwrap_or_default(),
        }),
        Value::Function(function) => Ok(match property {
            "name" => Value::String(function.name().to_string()),
            _ => Value::Undefined,
        }),
        Value::Bool(_) | Value::Number(_) => Ok(Value::Undefined),
    }
}

fn get_index(target: &Value, key: &Value) -> Result<Value, EvalError> {
    match key {
        Value::Number(n) => get_member(target, &Value::Number(*n).to_string()),
        other => get_member(target, &other.to_string()),
    }
}

/// Canonical array index ("0", "12"; not "01" or "-1")
fn array_index(property: &str) -> Option<usize> {
    if property.len() > 1 && property.starts_with('0') {
        return None;
    }
    property.parse().ok()
}

type BuiltinMethod = fn(&Value, &[Value]) -> Result<Value, EvalError>;

/// String and array methods available on values
fn builtin_method(receiver: &Value, name: &str) -> Option<BuiltinMethod> {
    let method: BuiltinMethod = match (receiver, name) {
        (Value::String(_), "toUpperCase") => |s, _| Ok(Value::String(text(s).to_uppercase())),
        (Value::String(_), "toLowerCase") => |s, _| Ok(Value::String(text(s).to_lowercase())),
        (Value::String(_), "trim") => |s, _| Ok(Value::String(text(s).trim().to_string())),
        (Value::String(_), "includes") => {
            |s, args| Ok(Value::Bool(text(s).contains(&arg_string(args))))
        }
        (Value::String(_), "startsWith") => {
            |s, args| Ok(Value::Bool(text(s).starts_with(&arg_string(args))))
        }
        (Value::String(_), "endsWith") => {
            |s, args| Ok(Value::Bool(text(s).ends_with(&arg_string(args))))
        }
        (Value::Array(_), "join") => |items, args| {
            let separator = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(sep) => sep.to_string(),
            };
            let Value::Array(items) = items else {
                return Ok(Value::Undefined);
            };
            let joined = items
                .iter()
                .map(|item| if item.is_nullish() { String::new() } else { item.to_string() })
                .collect::<Vec<_>>()
                .join(separator.as_str());
            Ok(Value::String(joined))
        },
        (Value::Array(_), "includes") => |items, args| {
            let needle = args.first().cloned().unwrap_or_default();
            let Value::Array(items) = items else {
                return Ok(Value::Bool(false));
            };
            Ok(Value::Bool(items.iter().any(|item| same_value_zero(item, &needle))))
        },
        _ => return None,
    };
    Some(method)
}

fn text(value: &Value) -> &str {
    value.as_str().unwrap_or_default()
}

fn arg_string(args: &[Value]) -> String {
    args.first().cloned().unwrap_or_default().to_string()
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::LooseEq => Value::Bool(loose_equals(left, right)),
        BinaryOp::LooseNe => Value::Bool(!loose_equals(left, right)),
        BinaryOp::StrictEq => Value::Bool(strict_equals(left, right)),
        BinaryOp::StrictNe => Value::Bool(!strict_equals(left, right)),
    }
}

fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_) | Value::Function(_))
}

fn add(left: &Value, right: &Value) -> Value {
    let concatenates = |v: &Value| matches!(v, Value::String(_)) || !is_primitive(v);
    if concatenates(left) || concatenates(right) {
        Value::String(format!("{}{}", left, right))
    } else {
        Value::Number(left.to_number() + right.to_number())
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    let to_primitive = |v: &Value| {
        if is_primitive(v) {
            v.clone()
        } else {
            Value::String(v.to_string())
        }
    };
    match (to_primitive(left), to_primitive(right)) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(&b)),
        (a, b) => a.to_number().partial_cmp(&b.to_number()),
    }
}

fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
        (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => a == b,
        _ => false,
    }
}

/// `Array.prototype.includes` comparison: strict, except NaN equals NaN
fn same_value_zero(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
        _ => strict_equals(left, right),
    }
}

/// Abstract equality (`==`)
fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (a, b) if std::mem::discriminant(a) == std::mem::discriminant(b) => strict_equals(a, b),
        (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
        (Value::Number(n), Value::String(_)) | (Value::String(_), Value::Number(n)) => {
            let other = if matches!(left, Value::String(_)) { left } else { right };
            *n == other.to_number()
        }
        (Value::Bool(b), other) | (other, Value::Bool(b)) => {
            loose_equals(&Value::Number(f64::from(u8::from(*b))), other)
        }
        (a, b) if is_primitive(a) != is_primitive(b) => {
            let (object, primitive) = if is_primitive(a) { (b, a) } else { (a, b) };
            loose_equals(&Value::String(object.to_string()), primitive)
        }
        _ => false,
    }
}
