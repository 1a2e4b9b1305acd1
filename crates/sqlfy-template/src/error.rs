//! Template error types

/// Failure while evaluating a placeholder expression
///
/// Variants follow the JavaScript error classes templates were written against,
/// so diagnostics read the same as before.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("ReferenceError: {0} is not defined")]
    Reference(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("RangeError: maximum call depth of {0} exceeded")]
    CallDepth(usize),

    #[error("RangeError: expression evaluation nested deeper than {0} levels")]
    Nesting(usize),

    /// Raised by a native user method
    #[error("Error: {0}")]
    Thrown(String),
}

/// Malformed placeholder expression
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct SyntaxError {
    pub message: String,

    /// Byte offset into the expression source
    pub offset: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Error rendering one template
///
/// Line and column are 1-based and point at the `$` that opens the placeholder.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("unterminated placeholder at line {line}, column {column}")]
    Unterminated { line: usize, column: usize },

    #[error("syntax error in placeholder at line {line}, column {column}: {source}")]
    Syntax {
        line: usize,
        column: usize,
        #[source]
        source: SyntaxError,
    },

    #[error("{source} (in '${{{expression}}}' at line {line}, column {column})")]
    Eval {
        expression: String,
        line: usize,
        column: usize,
        #[source]
        source: EvalError,
    },
}

impl TemplateError {
    /// Position of the offending placeholder
    pub fn position(&self) -> (usize, usize) {
        match self {
            Self::Unterminated { line, column }
            | Self::Syntax { line, column, .. }
            | Self::Eval { line, column, .. } => (*line, *column),
        }
    }
}
