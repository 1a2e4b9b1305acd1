//! Placeholder scanning and rendering
//!
//! Text outside `${...}` is copied through byte for byte, newlines included.
//! `\${` renders a literal `${`; a `$` not followed by `{` is ordinary text.

use crate::context::RenderContext;
use crate::error::TemplateError;
use crate::eval::evaluate;
use crate::parser::{parse_expression, Expr};

/// A piece of a parsed template
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Placeholder {
        /// Expression source between the delimiters
        source: String,
        expr: Expr,
        line: usize,
        column: usize,
    },
}

/// Template split into literal text and parsed placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Scan and parse every placeholder; nothing is evaluated yet
    pub fn parse(src: &str) -> Result<Self, TemplateError> {
        let bytes = src.as_bytes();
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] == b'\\' && src[i + 1..].starts_with("${") {
                text.push_str(&src[literal_start..i]);
                text.push_str("${");
                i += 3;
                literal_start = i;
            } else if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
                text.push_str(&src[literal_start..i]);
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }

                let (line, column) = line_column(src, i);
                let body_start = i + 2;
                let body_end = find_closing_brace(src, body_start)
                    .ok_or(TemplateError::Unterminated { line, column })?;
                let source = &src[body_start..body_end];
                let expr = parse_expression(source).map_err(|source| TemplateError::Syntax {
                    line,
                    column,
                    source,
                })?;

                segments.push(Segment::Placeholder {
                    source: source.to_string(),
                    expr,
                    line,
                    column,
                });
                i = body_end + 1;
                literal_start = i;
            } else {
                i += 1;
            }
        }

        text.push_str(&src[literal_start..]);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn has_placeholders(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Placeholder { .. }))
    }

    /// Evaluate every placeholder in order; the first failure aborts
    pub fn render(&self, context: &RenderContext) -> Result<String, TemplateError> {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder {
                    source,
                    expr,
                    line,
                    column,
                } => {
                    let value = evaluate(expr, context.scope()).map_err(|e| TemplateError::Eval {
                        expression: source.trim().to_string(),
                        line: *line,
                        column: *column,
                        source: e,
                    })?;
                    out.push_str(&value.to_string());
                }
            }
        }

        Ok(out)
    }
}

/// Stateless entry point used by the pipeline
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Quick check for `${`, used to skip parsing plain files
    pub fn has_placeholders(src: &str) -> bool {
        src.contains("${")
    }

    /// Render template text against a context
    pub fn render(src: &str, context: &RenderContext) -> Result<String, TemplateError> {
        if !Self::has_placeholders(src) {
            return Ok(src.to_string());
        }
        Template::parse(src)?.render(context)
    }
}

/// Byte offset of the `}` closing a placeholder body that starts at `start`
///
/// Nested braces are counted and quoted strings skipped, so `${ '}' }` works.
fn find_closing_brace(src: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut chars = src[start..].char_indices();

    while let Some((offset, c)) = chars.next() {
        match c {
            '\'' | '"' => loop {
                match chars.next()?.1 {
                    '\\' => {
                        chars.next()?;
                    }
                    q if q == c => break,
                    _ => {}
                }
            },
            '{' => depth += 1,
            '}' if depth == 0 => return Some(start + offset),
            '}' => depth -= 1,
            _ => {}
        }
    }

    None
}

/// 1-based line and column of a byte offset
fn line_column(src: &str, offset: usize) -> (usize, usize) {
    let before = &src[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
