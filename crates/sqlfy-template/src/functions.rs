//! Built-in `sql` helpers
//!
//! `sql.dropTable`, `sql.dropView`, `sql.dropProcedure` and `sql.truncate` take a
//! name or an array of names and return one statement per name, newline-joined
//! in input order.
//!
//! Identifiers are wrapped in backticks without escaping. A name containing a
//! backtick produces a broken statement; validating names is the caller's job.

use crate::error::EvalError;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Delimiter wrapped around every identifier
pub const IDENTIFIER_QUOTE: char = '`';

/// Statement generated by one helper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    DropTable,
    DropView,
    DropProcedure,
    Truncate,
}

impl StatementKind {
    pub const ALL: [StatementKind; 4] = [
        Self::DropTable,
        Self::DropView,
        Self::DropProcedure,
        Self::Truncate,
    ];

    /// Member name under the `sql` binding
    pub fn helper_name(&self) -> &'static str {
        match self {
            Self::DropTable => "dropTable",
            Self::DropView => "dropView",
            Self::DropProcedure => "dropProcedure",
            Self::Truncate => "truncate",
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            Self::DropTable => "DROP TABLE",
            Self::DropView => "DROP VIEW",
            Self::DropProcedure => "DROP PROCEDURE",
            Self::Truncate => "TRUNCATE TABLE",
        }
    }

    /// Single statement for one name
    pub fn statement(&self, name: &str) -> String {
        format!(
            "{} {q}{}{q};",
            self.keyword(),
            name,
            q = IDENTIFIER_QUOTE
        )
    }

    /// One statement per name, newline-joined
    pub fn statements<S: AsRef<str>>(&self, names: &[S]) -> String {
        names
            .iter()
            .map(|name| self.statement(name.as_ref()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Template-facing entry point: a string or an array of names
    pub fn apply(&self, args: &[Value]) -> Result<Value, EvalError> {
        match args.first() {
            Some(Value::String(name)) => Ok(Value::String(self.statement(name))),
            Some(Value::Array(items)) => {
                let names: Vec<String> = items.iter().map(Value::to_string).collect();
                Ok(Value::String(self.statements(&names)))
            }
            other => Err(EvalError::Type(format!(
                "sql.{} expects a name or an array of names, got {}",
                self.helper_name(),
                other.map_or("undefined", Value::type_name)
            ))),
        }
    }
}

static SQL_HELPERS: OnceLock<Value> = OnceLock::new();

/// The object bound to `sql` in every render context
pub fn sql_helpers() -> Value {
    SQL_HELPERS
        .get_or_init(|| {
            let helpers = StatementKind::ALL
                .iter()
                .map(|kind| {
                    let kind = *kind;
                    let name = kind.helper_name();
                    (name.to_string(), Value::native(name, move |args| kind.apply(args)))
                })
                .collect::<BTreeMap<_, _>>();
            Value::object(helpers)
        })
        .clone()
}
