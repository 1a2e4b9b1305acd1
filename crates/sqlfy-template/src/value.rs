//! Runtime values for placeholder expressions

use crate::error::EvalError;
use crate::parser::Expr;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Signature of a Rust function callable from templates
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync;

/// A value produced by evaluating an expression
///
/// Arrays and objects are reference counted, so member access on a large
/// `_` binding does not copy it.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Arc<Vec<Value>>),
    Object(Arc<BTreeMap<String, Value>>),
    Function(Function),
}

/// Callable value
#[derive(Clone)]
pub enum Function {
    /// Implemented in Rust (the `sql` helpers, or methods registered by a library user)
    Native(NativeFunction),

    /// Declared in `[methods]` with an expression body
    Method(Arc<UserMethod>),
}

#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    func: Arc<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.func)(args)
    }
}

/// Expression-bodied user method
#[derive(Debug, Clone, PartialEq)]
pub struct UserMethod {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Self::Native(native) => native.name(),
            Self::Method(method) => &method.name,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(native) => write!(f, "Native({})", native.name()),
            Self::Method(method) => write!(f, "Method({}/{})", method.name, method.params.len()),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Native(a), Self::Native(b)) => Arc::ptr_eq(&a.func, &b.func),
            (Self::Method(a), Self::Method(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Structural equality, used by tests and `Array.includes`.
/// Expression `===` is identity-based for arrays and objects, see `eval`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Self::Array(Arc::new(items))
    }

    pub fn object(entries: BTreeMap<String, Value>) -> Self {
        Self::Object(Arc::new(entries))
    }

    pub fn native(
        name: impl Into<Arc<str>>,
        func: impl Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self::Function(Function::Native(NativeFunction::new(name, func)))
    }

    /// JavaScript `typeof`
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null | Self::Array(_) | Self::Object(_) => "object",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Function(_) => "function",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// JavaScript truthiness
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) | Self::Function(_) => true,
        }
    }

    /// JavaScript `ToNumber`, simplified for composite values
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::String(s) => string_to_number(s),
            Self::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_number(),
                _ => f64::NAN,
            },
            Self::Object(_) | Self::Function(_) => f64::NAN,
        }
    }
}

/// JavaScript `String(value)`, the text substituted for a placeholder
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => fmt_number(*n, f),
            Self::String(s) => f.write_str(s),
            Self::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    // Array.prototype.join renders holes and nullish items as empty
                    if !item.is_nullish() {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            }
            Self::Object(_) => f.write_str("[object Object]"),
            Self::Function(func) => write!(f, "function {}() {{ [native code] }}", func.name()),
        }
    }
}

/// JavaScript `Number(string)`: decimal literals, `Infinity`, and `0x`/`0o`/`0b` integers
fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match trimmed.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &trimmed[2..];
        if digits.is_empty() {
            return f64::NAN;
        }
        return digits.chars().try_fold(0.0, |acc: f64, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN);
    }

    // Rust also accepts "inf" and "nan", which are not numbers in JavaScript
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// JavaScript `Number.prototype.toString()`: plain notation for 1e-6 <= |n| < 1e21, exponent otherwise
fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        return f.write_str("NaN");
    }
    if n.is_infinite() {
        return f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if n == 0.0 {
        // covers -0
        return f.write_str("0");
    }

    // Shortest round-trip digits and exponent, e.g. "1.2345e3"
    let sci = format!("{:e}", n.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let len = digits.len() as i32;
    let point = exponent + 1;

    if n < 0.0 {
        f.write_str("-")?;
    }

    if len <= point && point <= 21 {
        write!(f, "{}{}", digits, "0".repeat((point - len) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        write!(f, "{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        write!(f, "0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let (first, rest) = digits.split_at(1);
        f.write_str(first)?;
        if !rest.is_empty() {
            write!(f, ".{}", rest)?;
        }
        let sign = if exponent >= 0 { "+" } else { "-" };
        write!(f, "e{}{}", sign, exponent.abs())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::array(items)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => Self::array(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Self::object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_matches_js_string_conversion() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Undefined.to_string(), "undefined");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(
            Value::array(vec![Value::from("a"), Value::Null, Value::Number(1.0)]).to_string(),
            "a,,1"
        );
        assert_eq!(Value::object(BTreeMap::new()).to_string(), "[object Object]");
    }

    #[test]
    fn large_and_small_numbers_use_exponent_form() {
        assert_eq!(Value::Number(1e21).to_string(), "1e+21");
        assert_eq!(Value::Number(1e20).to_string(), "100000000000000000000");
        assert_eq!(Value::Number(1.5e300).to_string(), "1.5e+300");
        assert_eq!(Value::Number(1e-7).to_string(), "1e-7");
        assert_eq!(Value::Number(-2.5e-8).to_string(), "-2.5e-8");
        assert_eq!(Value::Number(0.000001).to_string(), "0.000001");
        assert_eq!(Value::Number(123.456).to_string(), "123.456");
        assert_eq!(Value::Number(-42.0).to_string(), "-42");
        assert_eq!(Value::Number(0.1 + 0.2).to_string(), "0.30000000000000004");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(Value::array(vec![]).is_truthy());
        assert!(!Value::Undefined.is_truthy());
    }

    #[test]
    fn to_number_conversions() {
        assert_eq!(Value::from(" 42 ").to_number(), 42.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert!(Value::from("abc").to_number().is_nan());
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert_eq!(Value::Null.to_number(), 0.0);
    }

    #[test]
    fn string_to_number_follows_js_syntax() {
        assert_eq!(Value::from("0x10").to_number(), 16.0);
        assert_eq!(Value::from("0b101").to_number(), 5.0);
        assert_eq!(Value::from("0o17").to_number(), 15.0);
        assert_eq!(Value::from("Infinity").to_number(), f64::INFINITY);
        assert_eq!(Value::from("-Infinity").to_number(), f64::NEG_INFINITY);
        assert_eq!(Value::from("1.5e3").to_number(), 1500.0);
        assert_eq!(Value::from(".5").to_number(), 0.5);
        assert!(Value::from("inf").to_number().is_nan());
        assert!(Value::from("nan").to_number().is_nan());
        assert!(Value::from("infinity").to_number().is_nan());
        assert!(Value::from("0x").to_number().is_nan());
        assert!(Value::from("-0x10").to_number().is_nan());
        assert!(Value::from("1e").to_number().is_nan());
    }

    #[test]
    fn from_json() {
        let value = Value::from(&json!({"name": "users", "ids": [1, 2], "on": true}));
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        assert_eq!(map["name"], Value::from("users"));
        assert_eq!(map["ids"].to_string(), "1,2");
        assert_eq!(map["on"], Value::Bool(true));
    }

    #[test]
    fn function_equality_is_identity() {
        let f = Value::native("f", |_| Ok(Value::Null));
        let g = Value::native("f", |_| Ok(Value::Null));
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
    }
}
