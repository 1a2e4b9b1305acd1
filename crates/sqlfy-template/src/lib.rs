//! Template rendering for SQLfy
//!
//! This crate handles:
//! - Scanning template text for `${...}` placeholders
//! - Parsing placeholder expressions (a small JavaScript-like expression language)
//! - Evaluating expressions against the `_`, `$` and `sql` bindings
//! - The built-in `sql` helper library (DROP / TRUNCATE statement generators)
//!
//! Placeholders are trusted code: they can call any user method. The language has no
//! statements, assignment, lambdas or global objects.

pub mod context;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod renderer;
pub mod value;

pub use context::{ContextFactory, RenderContext, METHODS_BINDING, SQL_BINDING, VARS_BINDING};
pub use error::{EvalError, SyntaxError, TemplateError};
pub use eval::{evaluate, Scope, MAX_CALL_DEPTH, MAX_EVAL_DEPTH};
pub use functions::{sql_helpers, StatementKind, IDENTIFIER_QUOTE};
pub use parser::{parse_expression, Expr, MAX_NESTING};
pub use renderer::{Segment, Template, TemplateRenderer};
pub use value::{Function, NativeFunction, UserMethod, Value};
