//! Expression parser
//!
//! Precedence, lowest first:
//! `?:`, `??`, `||`, `&&`, equality, relational, additive, multiplicative, unary, postfix.

use crate::error::SyntaxError;
use crate::lexer::{tokenize, Spanned, Token};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

/// Parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    Array(Vec<Expr>),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
}

impl Expr {
    /// Dotted path for identifiers and member chains (`$.greet`), used in error messages
    pub fn path(&self) -> Option<String> {
        match self {
            Self::Ident(name) => Some(name.clone()),
            Self::Member { object, property } => {
                object.path().map(|base| format!("{}.{}", base, property))
            }
            _ => None,
        }
    }
}

/// Deepest expression tree (and parser recursion) a placeholder may produce
pub const MAX_NESTING: usize = 128;

/// Parse a complete expression; trailing tokens are an error
pub fn parse_expression(src: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: src.len(),
        depth: 0,
        height: 0,
    };

    let expr = parser.conditional()?;
    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(SyntaxError::new(
            format!("unexpected {}", extra.token.describe()),
            extra.offset,
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Offset reported for "unexpected end of expression"
    end: usize,
    /// Current recursion nesting
    depth: usize,
    /// Tree height of the expression parsed last
    height: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), SyntaxError> {
        if self.eat(&expected) {
            return Ok(());
        }
        Err(self.unexpected(&format!("expected {}", expected.describe())))
    }

    fn unexpected(&self, context: &str) -> SyntaxError {
        match self.tokens.get(self.pos) {
            Some(s) => SyntaxError::new(
                format!("{}, found {}", context, s.token.describe()),
                s.offset,
            ),
            None => SyntaxError::new(
                format!("{}, found end of expression", context),
                self.end,
            ),
        }
    }

    fn too_deep(&self) -> SyntaxError {
        SyntaxError::new(
            format!("expression nested too deeply (limit {})", MAX_NESTING),
            self.offset(),
        )
    }

    /// Run `parse` one recursion level deeper
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Record the height of the node about to be built
    fn built(&mut self, height: usize) -> Result<(), SyntaxError> {
        if height > MAX_NESTING {
            return Err(self.too_deep());
        }
        self.height = height;
        Ok(())
    }

    fn conditional(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::conditional_inner)
    }

    fn conditional_inner(&mut self) -> Result<Expr, SyntaxError> {
        let test = self.nullish()?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let mut height = self.height;

        let consequent = self.conditional()?;
        height = height.max(self.height);
        self.expect(Token::Colon)?;
        let alternate = self.conditional()?;
        self.built(height.max(self.height) + 1)?;

        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn nullish(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.or()?;
        let mut height = self.height;
        while self.eat(&Token::QuestionQuestion) {
            let right = self.or()?;
            height = height.max(self.height) + 1;
            self.built(height)?;
            left = logical(LogicalOp::Nullish, left, right);
        }
        Ok(left)
    }

    fn or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.and()?;
        let mut height = self.height;
        while self.eat(&Token::OrOr) {
            let right = self.and()?;
            height = height.max(self.height) + 1;
            self.built(height)?;
            left = logical(LogicalOp::Or, left, right);
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.equality()?;
        let mut height = self.height;
        while self.eat(&Token::AndAnd) {
            let right = self.equality()?;
            height = height.max(self.height) + 1;
            self.built(height)?;
            left = logical(LogicalOp::And, left, right);
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.relational()?;
        let mut height = self.height;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::LooseEq,
                Some(Token::NotEq) => BinaryOp::LooseNe,
                Some(Token::EqEqEq) => BinaryOp::StrictEq,
                Some(Token::NotEqEq) => BinaryOp::StrictNe,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.relational()?;
            height = height.max(self.height) + 1;
            self.built(height)?;
            left = binary(op, left, right);
        }
    }

    fn relational(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.additive()?;
        let mut height = self.height;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.additive()?;
            height = height.max(self.height) + 1;
            self.built(height)?;
            left = binary(op, left, right);
        }
    }

    fn additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.multiplicative()?;
        let mut height = self.height;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            height = height.max(self.height) + 1;
            self.built(height)?;
            left = binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.unary()?;
        let mut height = self.height;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            height = height.max(self.height) + 1;
            self.built(height)?;
            left = binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let operand = self.nested(Self::unary)?;
        self.built(self.height + 1)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;
        let mut height = self.height;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let Some(Token::Ident(property)) = self.peek().cloned() else {
                        return Err(self.unexpected("expected property name after '.'"));
                    };
                    self.pos += 1;
                    height += 1;
                    self.built(height)?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                    };
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.conditional()?;
                    self.expect(Token::RBracket)?;
                    height = height.max(self.height) + 1;
                    self.built(height)?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Some(Token::LParen) => {
                    self.pos += 1;
                    let args = self.list(Token::RParen)?;
                    height = height.max(self.height) + 1;
                    self.built(height)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let offset = self.offset();
        let leaf = match self.advance() {
            Some(Token::Number(n)) => Expr::Literal(Literal::Number(n)),
            Some(Token::Str(s)) => Expr::Literal(Literal::String(s)),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Expr::Literal(Literal::Bool(true)),
                "false" => Expr::Literal(Literal::Bool(false)),
                "null" => Expr::Literal(Literal::Null),
                "undefined" => Expr::Literal(Literal::Undefined),
                _ => Expr::Ident(name),
            },
            Some(Token::LParen) => {
                let inner = self.conditional()?;
                self.expect(Token::RParen)?;
                return Ok(inner);
            }
            Some(Token::LBracket) => {
                let items = self.list(Token::RBracket)?;
                self.built(self.height + 1)?;
                return Ok(Expr::Array(items));
            }
            Some(_) => {
                self.pos -= 1;
                return Err(self.unexpected("expected expression"));
            }
            None => {
                return Err(SyntaxError::new(
                    "expected expression, found end of expression",
                    offset,
                ))
            }
        };
        self.built(1)?;
        Ok(leaf)
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed
    fn list(&mut self, close: Token) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();
        let mut height = 0;
        loop {
            if self.eat(&close) {
                break;
            }
            items.push(self.conditional()?);
            height = height.max(self.height);
            if !self.eat(&Token::Comma) {
                self.expect(close)?;
                break;
            }
        }
        self.height = height;
        Ok(items)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Expr {
        Expr::Ident(name.to_string())
    }

    fn num(n: f64) -> Expr {
        Expr::Literal(Literal::Number(n))
    }

    #[test]
    fn method_call_on_binding() {
        let expr = parse_expression("sql.dropTable('users')").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                callee: Box::new(Expr::Member {
                    object: Box::new(ident("sql")),
                    property: "dropTable".to_string(),
                }),
                args: vec![Expr::Literal(Literal::String("users".to_string()))],
            }
        );
    }

    #[test]
    fn multiplication_binds_tighter() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            binary(BinaryOp::Add, num(1.0), binary(BinaryOp::Mul, num(2.0), num(3.0)))
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        let expr = parse_expression("5 - 2 - 1").unwrap();
        assert_eq!(
            expr,
            binary(BinaryOp::Sub, binary(BinaryOp::Sub, num(5.0), num(2.0)), num(1.0))
        );
    }

    #[test]
    fn ternary_is_right_associative() {
        let expr = parse_expression("a ? b : c ? d : e").unwrap();
        let Expr::Conditional { alternate, .. } = expr else {
            panic!("expected conditional");
        };
        assert!(matches!(*alternate, Expr::Conditional { .. }));
    }

    #[test]
    fn array_literal_and_index() {
        let expr = parse_expression("['a', 'b',][1]").unwrap();
        let Expr::Index { object, index } = expr else {
            panic!("expected index");
        };
        assert!(matches!(*object, Expr::Array(ref items) if items.len() == 2));
        assert_eq!(*index, num(1.0));
    }

    #[test]
    fn keywords_become_literals() {
        assert_eq!(
            parse_expression("undefined").unwrap(),
            Expr::Literal(Literal::Undefined)
        );
        assert_eq!(
            parse_expression("!true").unwrap(),
            Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(Expr::Literal(Literal::Bool(true))),
            }
        );
    }

    #[test]
    fn member_path() {
        let expr = parse_expression("$.naming.prefix").unwrap();
        assert_eq!(expr.path().as_deref(), Some("$.naming.prefix"));
        assert_eq!(parse_expression("(1)").unwrap().path(), None);
    }

    #[test]
    fn empty_expression_is_error() {
        let err = parse_expression("   ").unwrap_err();
        assert!(err.message.contains("expected expression"));
    }

    #[test]
    fn trailing_tokens_are_error() {
        let err = parse_expression("_.a _.b").unwrap_err();
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn missing_colon() {
        let err = parse_expression("a ? b").unwrap_err();
        assert!(err.message.contains("expected ':'"));
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn unclosed_call() {
        assert!(parse_expression("$.f(1, 2").is_err());
        assert!(parse_expression("sql.").is_err());
    }

    #[test]
    fn deep_parentheses_are_rejected() {
        let src = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let err = parse_expression(&src).unwrap_err();
        assert!(err.message.contains("nested too deeply"));
    }

    #[test]
    fn long_unary_chain_is_rejected() {
        let err = parse_expression(&format!("{}1", "!".repeat(10_000))).unwrap_err();
        assert!(err.message.contains("nested too deeply"));
        assert!(parse_expression(&format!("{}1", "-".repeat(10_000))).is_err());
    }

    #[test]
    fn long_operator_chain_is_rejected() {
        let src = vec!["1"; 10_000].join(" + ");
        let err = parse_expression(&src).unwrap_err();
        assert!(err.message.contains("nested too deeply"));

        let src = format!("a{}", ".b".repeat(10_000));
        assert!(parse_expression(&src).is_err());
    }

    #[test]
    fn moderate_nesting_is_accepted() {
        let src = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse_expression(&src).unwrap(), num(1.0));

        let src = vec!["_.a"; 100].join(" + ");
        assert!(parse_expression(&src).is_ok());

        let names: Vec<String> = (0..1_000).map(|i| format!("'t{i}'")).collect();
        let src = format!("sql.dropTable([{}])", names.join(", "));
        assert!(parse_expression(&src).is_ok());
    }
}
