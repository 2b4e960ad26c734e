//! Recursive-descent parser producing the condition AST

use super::error::SyntaxError;
use super::lexer::{Spanned, Token};
use super::value::{Comparator, Value};

/// Pure helper functions available to conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Now,
    Date,
    Seconds,
    Minutes,
    Hours,
    Days,
    Number,
    String,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "now" => Some(Function::Now),
            "date" => Some(Function::Date),
            "seconds" => Some(Function::Seconds),
            "minutes" => Some(Function::Minutes),
            "hours" => Some(Function::Hours),
            "days" => Some(Function::Days),
            "number" => Some(Function::Number),
            "string" => Some(Function::String),
            _ => None,
        }
    }

    fn arity(&self) -> usize {
        match self {
            Function::Now => 0,
            _ => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Now => "now",
            Function::Date => "date",
            Function::Seconds => "seconds",
            Function::Minutes => "minutes",
            Function::Hours => "hours",
            Function::Days => "days",
            Function::Number => "number",
            Function::String => "string",
        }
    }
}

/// Additive operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
}

impl ArithOp {
    pub fn symbol(&self) -> char {
        match self {
            ArithOp::Add => '+',
            ArithOp::Sub => '-',
        }
    }
}

/// Condition AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Status,
    Now,
    Call(Function, Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, Comparator, Box<Expr>),
    Arith(Box<Expr>, ArithOp, Box<Expr>),
}

/// Parse a token stream into an expression
pub fn parse(tokens: &[Spanned], source_len: usize) -> Result<Expr, SyntaxError> {
    if tokens.is_empty() {
        return Err(SyntaxError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        source_len,
    };
    let expr = parser.parse_or()?;

    if let Some(extra) = parser.peek() {
        return Err(SyntaxError::TrailingInput {
            found: extra.token.describe(),
            offset: extra.offset,
        });
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    source_len: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Spanned> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Spanned { token: Token::Word(w), .. }) if w == keyword)
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        match self.peek() {
            Some(spanned) => SyntaxError::Unexpected {
                expected: expected.to_string(),
                found: spanned.token.describe(),
                offset: spanned.offset,
            },
            None => SyntaxError::Unexpected {
                expected: expected.to_string(),
                found: "end of input".to_string(),
                offset: self.source_len,
            },
        }
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_not()?;
        while self.peek_keyword("and") {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek_keyword("not") {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.parse_sum()?;

        let Some(Spanned {
            token: Token::Compare(op),
            ..
        }) = self.peek()
        else {
            return Ok(left);
        };
        let op = *op;
        self.advance();

        let right = self.parse_sum()?;

        if let Some(Spanned {
            token: Token::Compare(_),
            offset,
        }) = self.peek()
        {
            return Err(SyntaxError::ChainedComparison { offset: *offset });
        }

        Ok(Expr::Compare(Box::new(left), op, Box::new(right)))
    }

    fn parse_sum(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_atom()?;
        loop {
            let op = match self.peek().map(|s| &s.token) {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_atom()?;
            left = Expr::Arith(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> Result<Expr, SyntaxError> {
        let Some(spanned) = self.peek() else {
            return Err(self.unexpected("operand"));
        };

        match &spanned.token {
            Token::Status => {
                self.advance();
                Ok(Expr::Status)
            }
            Token::Quoted(literal) => {
                self.advance();
                Ok(Expr::Literal(Value::resolve(literal)))
            }
            Token::Duration(duration) => {
                self.advance();
                Ok(Expr::Literal(Value::Duration(*duration)))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            Token::Word(word) => {
                self.advance();
                if matches!(self.peek().map(|s| &s.token), Some(Token::LParen)) {
                    return self.parse_call(word);
                }
                match word.as_str() {
                    "and" | "or" | "not" => {
                        self.pos -= 1;
                        Err(self.unexpected("operand"))
                    }
                    "status" => Ok(Expr::Status),
                    "now" => Ok(Expr::Now),
                    "true" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" => Ok(Expr::Literal(Value::Bool(false))),
                    _ => Ok(Expr::Literal(Value::resolve(word))),
                }
            }
            _ => Err(self.unexpected("operand")),
        }
    }

    fn parse_call(&mut self, name: &str) -> Result<Expr, SyntaxError> {
        let function = Function::lookup(name).ok_or_else(|| SyntaxError::UnknownFunction {
            name: name.to_string(),
        })?;

        // consume '('
        self.advance();

        let mut args = Vec::new();
        if !matches!(self.peek().map(|s| &s.token), Some(Token::RParen)) {
            loop {
                args.push(self.parse_or()?);
                if matches!(self.peek().map(|s| &s.token), Some(Token::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect_rparen()?;

        if args.len() != function.arity() {
            return Err(SyntaxError::Arity {
                name: function.name().to_string(),
                expected: function.arity(),
                got: args.len(),
            });
        }
        Ok(Expr::Call(function, args))
    }

    fn expect_rparen(&mut self) -> Result<(), SyntaxError> {
        match self.peek().map(|s| &s.token) {
            Some(Token::RParen) => {
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected("')'")),
        }
    }
}
