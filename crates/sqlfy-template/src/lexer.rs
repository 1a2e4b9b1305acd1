//! Tokenizer for placeholder expressions

use crate::error::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Question,
    QuestionQuestion,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    EqEqEq,
    NotEq,
    NotEqEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

impl Token {
    /// Source spelling, for error messages
    pub fn describe(&self) -> String {
        let punct = match self {
            Self::Number(n) => return format!("number {}", n),
            Self::Str(s) => return format!("string '{}'", s),
            Self::Ident(name) => return format!("'{}'", name),
            Self::Dot => ".",
            Self::Comma => ",",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Question => "?",
            Self::QuestionQuestion => "??",
            Self::Colon => ":",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Bang => "!",
            Self::EqEq => "==",
            Self::EqEqEq => "===",
            Self::NotEq => "!=",
            Self::NotEqEq => "!==",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
        };
        format!("'{}'", punct)
    }
}

/// Token with its byte offset in the expression source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Split an expression into tokens
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, SyntaxError> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn run(mut self) -> Result<Vec<Spanned>, SyntaxError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
                continue;
            }

            let offset = self.pos;
            let token = if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
                self.number()?
            } else if c == '\'' || c == '"' {
                self.string(c)?
            } else if is_ident_start(c) {
                self.ident()
            } else {
                self.punct(c)?
            };

            tokens.push(Spanned { token, offset });
        }

        Ok(tokens)
    }

    fn number(&mut self) -> Result<Token, SyntaxError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') && self.peek_at(1).map_or(true, |c| !is_ident_start(c)) {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+' | '-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..=sign {
                    self.bump();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }

        let text = &self.src[start..self.pos];
        if self.peek().is_some_and(is_ident_start) {
            return Err(SyntaxError::new(
                "identifier starts immediately after numeric literal",
                self.pos,
            ));
        }
        text.parse()
            .map(Token::Number)
            .map_err(|_| SyntaxError::new(format!("invalid number '{}'", text), start))
    }

    fn string(&mut self, quote: char) -> Result<Token, SyntaxError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();

        loop {
            let Some(c) = self.bump() else {
                return Err(SyntaxError::new("unterminated string literal", start));
            };
            match c {
                c if c == quote => break,
                '\n' => return Err(SyntaxError::new("unterminated string literal", start)),
                '\\' => {
                    let escape_at = self.pos;
                    let Some(escaped) = self.bump() else {
                        return Err(SyntaxError::new("unterminated string literal", start));
                    };
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        'u' => out.push(self.unicode_escape(escape_at)?),
                        // \' \" \\ and any unknown escape yield the character itself
                        other => out.push(other),
                    }
                }
                other => out.push(other),
            }
        }

        Ok(Token::Str(out))
    }

    fn unicode_escape(&mut self, escape_at: usize) -> Result<char, SyntaxError> {
        let digits: String = (0..4).filter_map(|_| self.bump()).collect();
        u32::from_str_radix(&digits, 16)
            .ok()
            .filter(|_| digits.len() == 4)
            .and_then(char::from_u32)
            .ok_or_else(|| SyntaxError::new("invalid unicode escape", escape_at))
    }

    fn ident(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        Token::Ident(self.src[start..self.pos].to_string())
    }

    fn punct(&mut self, c: char) -> Result<Token, SyntaxError> {
        let offset = self.pos;
        let rest = &self.src[self.pos..];

        // Longest match first
        let (token, len) = if rest.starts_with("===") {
            (Token::EqEqEq, 3)
        } else if rest.starts_with("!==") {
            (Token::NotEqEq, 3)
        } else if rest.starts_with("==") {
            (Token::EqEq, 2)
        } else if rest.starts_with("!=") {
            (Token::NotEq, 2)
        } else if rest.starts_with("<=") {
            (Token::Le, 2)
        } else if rest.starts_with(">=") {
            (Token::Ge, 2)
        } else if rest.starts_with("&&") {
            (Token::AndAnd, 2)
        } else if rest.starts_with("||") {
            (Token::OrOr, 2)
        } else if rest.starts_with("??") {
            (Token::QuestionQuestion, 2)
        } else {
            let token = match c {
                '.' => Token::Dot,
                ',' => Token::Comma,
                '(' => Token::LParen,
                ')' => Token::RParen,
                '[' => Token::LBracket,
                ']' => Token::RBracket,
                '?' => Token::Question,
                ':' => Token::Colon,
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '%' => Token::Percent,
                '!' => Token::Bang,
                '<' => Token::Lt,
                '>' => Token::Gt,
                other => {
                    return Err(SyntaxError::new(
                        format!("unexpected character '{}'", other),
                        offset,
                    ))
                }
            };
            (token, 1)
        };

        self.pos += len;
        Ok(token)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}
