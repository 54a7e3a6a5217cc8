//! Restricted expression evaluator.
//!
//! Evaluates the small expression language accepted in `code{...}`
//! arguments and wait conditions: literals, `storedVars` lookups,
//! function calls forwarded to the target surface, `!`, `+`, `==`, `!=`,
//! `&&`, `||` and parentheses. Nothing else is executed.

use std::iter::Peekable;
use std::str::Chars;

use runner_protocols::{ScriptValue, TargetSurface, VariableStore};

use crate::error::EvalError;

/// Name of the object exposing stored variables.
const STORED_VARS: &str = "storedVars";

/// Built-in function mapped to [`TargetSurface::operation_finished`].
pub const OPERATION_FINISHED: &str = "operationFinished";

/// Deepest syntax tree the parser builds.
pub const MAX_DEPTH: usize = 256;

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Plus,
    Not,
    Eq,
    NotEq,
    And,
    Or,
    Semicolon,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Ident(name) => write!(f, "{}", name),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::Plus => write!(f, "+"),
            Token::Not => write!(f, "!"),
            Token::Eq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Semicolon => write!(f, ";"),
        }
    }
}

struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            position: 0,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.position += 1;
        Some(ch)
    }

    /// Consume `expected` if it is next.
    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn consume_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.bump();
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();
        loop {
            self.consume_whitespace();
            let start = self.position;
            let Some(ch) = self.bump() else {
                return Ok(tokens);
            };

            let token = match ch {
                '(' => Token::LParen,
                ')' => Token::RParen,
                '[' => Token::LBracket,
                ']' => Token::RBracket,
                '.' => Token::Dot,
                ',' => Token::Comma,
                '+' => Token::Plus,
                ';' => Token::Semicolon,
                '!' => {
                    if self.eat('=') {
                        self.eat('=');
                        Token::NotEq
                    } else {
                        Token::Not
                    }
                }
                '=' if self.eat('=') => {
                    self.eat('=');
                    Token::Eq
                }
                '&' if self.eat('&') => Token::And,
                '|' if self.eat('|') => Token::Or,
                '"' | '\'' => Token::Str(self.read_quoted(ch)?),
                c if c.is_ascii_digit() => Token::Number(self.read_number(c)),
                c if is_ident_start(c) => Token::Ident(self.read_ident(c)),
                other => return Err(EvalError::UnexpectedChar(other, start)),
            };
            tokens.push(token);
        }
    }

    fn read_quoted(&mut self, quote: char) -> Result<String, EvalError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(EvalError::UnterminatedString),
                Some(c) if c == quote => return Ok(text),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(c) => text.push(c),
                    None => return Err(EvalError::UnterminatedString),
                },
                Some(c) => text.push(c),
            }
        }
    }

    fn read_number(&mut self, first: char) -> f64 {
        let mut digits = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || (c == '.' && !digits.contains('.')) {
                digits.push(c);
                self.bump();
            } else {
                break;
            }
        }
        digits.parse().unwrap_or(f64::NAN)
    }

    fn read_ident(&mut self, first: char) -> String {
        let mut name = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if is_ident_start(c) || c.is_ascii_digit() {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        name
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

// ============================================================================
// Syntax tree
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(ScriptValue),
    StoredVar(String),
    Call(String, Vec<Expr>),
    Not(Box<Expr>),
    Concat(Box<Expr>, Box<Expr>),
    Equal(Box<Expr>, Box<Expr>, bool),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// One level deeper in the tree being built.
    fn enter(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), EvalError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(EvalError::UnexpectedToken(token.to_string())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    /// Parse a complete program: one expression, optional `;`.
    fn parse_program(mut self) -> Result<Expr, EvalError> {
        let expr = self.parse_or()?;
        if self.peek() == Some(&Token::Semicolon) {
            self.pos += 1;
        }
        match self.next() {
            None => Ok(expr),
            Some(token) => Err(EvalError::UnexpectedToken(token.to_string())),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_and()?;
        let mut nested = 0;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            self.enter()?;
            nested += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth -= nested;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_eq()?;
        let mut nested = 0;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            self.enter()?;
            nested += 1;
            let right = self.parse_eq()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth -= nested;
        Ok(left)
    }

    fn parse_eq(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_concat()?;
        let mut nested = 0;
        loop {
            let negate = match self.peek() {
                Some(Token::Eq) => false,
                Some(Token::NotEq) => true,
                _ => {
                    self.depth -= nested;
                    return Ok(left);
                }
            };
            self.pos += 1;
            self.enter()?;
            nested += 1;
            let right = self.parse_concat()?;
            left = Expr::Equal(Box::new(left), Box::new(right), negate);
        }
    }

    fn parse_concat(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_unary()?;
        let mut nested = 0;
        while self.peek() == Some(&Token::Plus) {
            self.pos += 1;
            self.enter()?;
            nested += 1;
            let right = self.parse_unary()?;
            left = Expr::Concat(Box::new(left), Box::new(right));
        }
        self.depth -= nested;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            self.enter()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.next().ok_or(EvalError::UnexpectedEnd)? {
            Token::Number(n) => Ok(Expr::Literal(ScriptValue::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(ScriptValue::Str(s))),
            Token::LParen => {
                self.enter()?;
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Token::Ident(name) => self.parse_identifier(name),
            other => Err(EvalError::UnexpectedToken(other.to_string())),
        }
    }

    fn parse_identifier(&mut self, name: String) -> Result<Expr, EvalError> {
        match name.as_str() {
            "true" => return Ok(Expr::Literal(ScriptValue::Bool(true))),
            "false" => return Ok(Expr::Literal(ScriptValue::Bool(false))),
            "null" | "undefined" => return Ok(Expr::Literal(ScriptValue::Null)),
            STORED_VARS => return self.parse_stored_var(),
            _ => {}
        }

        if self.peek() != Some(&Token::LParen) {
            return Err(EvalError::UnknownIdentifier(name));
        }
        self.pos += 1;

        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(Expr::Call(name, args));
        }
        self.enter()?;
        loop {
            args.push(self.parse_or()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => {
                    self.depth -= 1;
                    return Ok(Expr::Call(name, args));
                }
                Some(token) => return Err(EvalError::UnexpectedToken(token.to_string())),
                None => return Err(EvalError::UnexpectedEnd),
            }
        }
    }

    fn parse_stored_var(&mut self) -> Result<Expr, EvalError> {
        match self.next() {
            Some(Token::Dot) => match self.next() {
                Some(Token::Ident(key)) => Ok(Expr::StoredVar(key)),
                Some(token) => Err(EvalError::UnexpectedToken(token.to_string())),
                None => Err(EvalError::UnexpectedEnd),
            },
            Some(Token::LBracket) => {
                let key = match self.next() {
                    Some(Token::Str(key)) => key,
                    Some(token) => return Err(EvalError::UnexpectedToken(token.to_string())),
                    None => return Err(EvalError::UnexpectedEnd),
                };
                self.expect(Token::RBracket)?;
                Ok(Expr::StoredVar(key))
            }
            Some(token) => Err(EvalError::UnexpectedToken(token.to_string())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Evaluates restricted expressions against the stored variables and the
/// target surface.
pub struct Evaluator<'a> {
    variables: &'a VariableStore,
    surface: &'a dyn TargetSurface,
}

impl<'a> Evaluator<'a> {
    pub fn new(variables: &'a VariableStore, surface: &'a dyn TargetSurface) -> Self {
        Self { variables, surface }
    }

    /// Parse and evaluate `source`.
    pub fn evaluate(&self, source: &str) -> Result<ScriptValue, EvalError> {
        let tokens = Tokenizer::new(source).tokenize()?;
        let expr = Parser::new(tokens).parse_program()?;
        self.eval(&expr)
    }

    fn eval(&self, expr: &Expr) -> Result<ScriptValue, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::StoredVar(key) => Ok(self
                .variables
                .get(key)
                .map(ScriptValue::from)
                .unwrap_or(ScriptValue::Null)),
            Expr::Call(name, args) => self.call(name, args),
            Expr::Not(inner) => Ok(ScriptValue::Bool(!self.eval(inner)?.is_truthy())),
            Expr::Concat(left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(match (&left, &right) {
                    (ScriptValue::Number(a), ScriptValue::Number(b)) => ScriptValue::Number(a + b),
                    _ => ScriptValue::Str(format!("{}{}", left, right)),
                })
            }
            Expr::Equal(left, right, negate) => {
                let equal = loose_equals(&self.eval(left)?, &self.eval(right)?);
                Ok(ScriptValue::Bool(equal != *negate))
            }
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
        }
    }

    fn call(&self, name: &str, args: &[Expr]) -> Result<ScriptValue, EvalError> {
        if name == OPERATION_FINISHED {
            return Ok(ScriptValue::Bool(self.surface.operation_finished()));
        }
        let values = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        self.surface
            .call(name, &values)
            .map_err(|e| EvalError::Call(e.message().to_string()))
    }
}

/// Equality with numeric coercion between numbers, booleans and strings.
fn loose_equals(left: &ScriptValue, right: &ScriptValue) -> bool {
    match (left, right) {
        (ScriptValue::Null, ScriptValue::Null) => true,
        (ScriptValue::Null, _) | (_, ScriptValue::Null) => false,
        (ScriptValue::Str(a), ScriptValue::Str(b)) => a == b,
        (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod tests;
