//! Render context: the bindings placeholders are evaluated against
//!
//! Existing templates reference these names literally, so they never change:
//! - `_`   user variables
//! - `$`   user methods
//! - `sql` built-in statement helpers

use crate::error::EvalError;
use crate::eval::Scope;
use crate::functions::sql_helpers;
use crate::parser::parse_expression;
use crate::value::{Function, NativeFunction, UserMethod, Value};
use sqlfy_core::{Config, ConfigError};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const VARS_BINDING: &str = "_";
pub const METHODS_BINDING: &str = "$";
pub const SQL_BINDING: &str = "sql";

/// Bindings for rendering one file
///
/// Built fresh for every file by [`ContextFactory::build`] and dropped after rendering.
#[derive(Debug, Clone)]
pub struct RenderContext {
    scope: Scope,
}

impl RenderContext {
    pub fn new(vars: Value, methods: Value) -> Self {
        let mut scope = Scope::new();
        scope
            .bind(VARS_BINDING, vars)
            .bind(METHODS_BINDING, methods)
            .bind(SQL_BINDING, sql_helpers());
        Self { scope }
    }

    /// Context with no user variables or methods
    pub fn empty() -> Self {
        Self::new(Value::object(BTreeMap::new()), Value::object(BTreeMap::new()))
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn vars(&self) -> &Value {
        self.binding(VARS_BINDING)
    }

    pub fn methods(&self) -> &Value {
        self.binding(METHODS_BINDING)
    }

    pub fn sql(&self) -> &Value {
        self.binding(SQL_BINDING)
    }

    fn binding(&self, name: &str) -> &Value {
        static UNDEFINED: Value = Value::Undefined;
        self.scope.get(name).unwrap_or(&UNDEFINED)
    }
}

/// Validated variables and compiled methods, shared by every file of a run
#[derive(Debug, Clone, Default)]
pub struct ContextFactory {
    vars: BTreeMap<String, serde_json::Value>,
    methods: BTreeMap<String, Function>,
}

impl ContextFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile the `[vars]` and `[methods]` tables of a config
    ///
    /// A method body that does not parse is a config error, reported before any file is touched.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut factory = Self::new();
        factory.vars = config.vars.clone();

        for (name, spec) in &config.methods {
            factory = factory.with_method(name.clone(), spec.params().to_vec(), spec.body())?;
        }

        tracing::debug!(
            vars = factory.vars.len(),
            methods = factory.methods.len(),
            "compiled render context"
        );
        Ok(factory)
    }

    pub fn with_var(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.vars.insert(name.into(), value);
        self
    }

    /// Add an expression-bodied method
    pub fn with_method(
        mut self,
        name: impl Into<String>,
        params: Vec<String>,
        body: &str,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let invalid = |message: String| ConfigError::InvalidMethod {
            name: name.clone(),
            message,
        };

        if let Some(bad) = params.iter().find(|p| !is_identifier(p)) {
            return Err(invalid(format!("'{}' is not a valid parameter name", bad)));
        }
        let body = parse_expression(body).map_err(|e| invalid(e.to_string()))?;

        let method = UserMethod {
            name: name.clone(),
            params,
            body,
        };
        self.methods.insert(name, Function::Method(Arc::new(method)));
        Ok(self)
    }

    /// Add a method implemented in Rust
    pub fn with_native_method<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        let name = name.into();
        let native = NativeFunction::new(name.as_str(), func);
        self.methods.insert(name, Function::Native(native));
        self
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Fresh context for one file
    pub fn build(&self) -> RenderContext {
        let vars = self
            .vars
            .iter()
            .map(|(name, value)| (name.clone(), Value::from(value)))
            .collect();
        let methods = self
            .methods
            .iter()
            .map(|(name, function)| (name.clone(), Value::Function(function.clone())))
            .collect();

        RenderContext::new(Value::object(vars), Value::object(methods))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$');
    let reserved = matches!(name, "true" | "false" | "null" | "undefined");
    starts_ok && !reserved && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
