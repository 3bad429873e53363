//! Tokenizer, AST and parser for the built-in expression language.
//!
//! Binary operators bind by precedence level, loosest first:
//!
//! | Level | Operators |
//! |-------|-----------|
//! | 1 | `\|\|` |
//! | 2 | `&&` |
//! | 3 | `==` `===` `!=` `!==` |
//! | 4 | `<` `<=` `>` `>=` |
//! | 5 | `+` `-` |
//! | 6 | `*` `/` `%` |
//!
//! The conditional `a ? b : c` sits below level 1; prefix `!`, `-`, `+`
//! and the postfix `.name` / `[index]` accessors bind tighter than level 6.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::value::number;

// ============================================================================
// AST
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Array(Vec<Expr>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    Eof,
}

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
        .expect("number pattern is valid")
});

static IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*").expect("identifier pattern is valid"));

// Longest first, so `===` wins over `==`.
const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "!", "<", ">",
    "?", ":", ",", ".", "(", ")", "[", "]",
];

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = src.trim_start();

    while let Some(first) = rest.chars().next() {
        let (token, len) = if let Some(m) = NUMBER.find(rest) {
            let value = m
                .as_str()
                .parse()
                .map_err(|_| format!("invalid number literal `{}`", m.as_str()))?;
            (Token::Num(value), m.end())
        } else if let Some(m) = IDENT.find(rest) {
            (Token::Ident(m.as_str().to_string()), m.end())
        } else if first == '"' || first == '\'' {
            let (text, len) = string_literal(&rest[1..], first)?;
            (Token::Str(text), len + 1)
        } else if let Some(op) = OPERATORS.iter().copied().find(|op| rest.starts_with(*op)) {
            (Token::Op(op), op.len())
        } else {
            return Err(format!("unexpected character '{}'", first));
        };
        tokens.push(token);
        rest = rest[len..].trim_start();
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

/// Reads a string body up to the closing `quote`; returns the text and the
/// number of bytes consumed, quote included.
fn string_literal(body: &str, quote: char) -> Result<(String, usize), String> {
    let mut text = String::new();
    let mut chars = body.char_indices();

    while let Some((at, ch)) = chars.next() {
        if ch == quote {
            return Ok((text, at + ch.len_utf8()));
        }
        if ch != '\\' {
            text.push(ch);
            continue;
        }
        match chars.next() {
            Some((_, 'n')) => text.push('\n'),
            Some((_, 't')) => text.push('\t'),
            Some((_, 'r')) => text.push('\r'),
            Some((_, 'b')) => text.push('\u{08}'),
            Some((_, 'f')) => text.push('\u{0C}'),
            Some((_, '0')) => text.push('\0'),
            Some((at, 'u')) => {
                let hex = body
                    .get(at + 1..at + 5)
                    .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
                    .ok_or("expected 4 hex digits after \\u")?;
                let code = u32::from_str_radix(hex, 16).map_err(|e| e.to_string())?;
                let decoded = char::from_u32(code)
                    .ok_or_else(|| format!("invalid character escape \\u{}", hex))?;
                text.push(decoded);
                chars.nth(3);
            }
            Some((_, other)) => text.push(other),
            None => break,
        }
    }
    Err("unterminated string literal".to_string())
}

fn describe(token: &Token) -> String {
    match token {
        Token::Num(n) => format!("number {}", n),
        Token::Str(s) => format!("string {:?}", s),
        Token::Ident(name) => format!("identifier `{}`", name),
        Token::Op(op) => format!("'{}'", op),
        Token::Eof => "end of expression".to_string(),
    }
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Clone, Copy)]
enum Infix {
    Arith(BinOp),
    Logic(LogicalOp),
}

fn infix(token: &Token) -> Option<(u8, Infix)> {
    let Token::Op(op) = token else {
        return None;
    };
    let entry = match *op {
        "||" => (1, Infix::Logic(LogicalOp::Or)),
        "&&" => (2, Infix::Logic(LogicalOp::And)),
        "==" | "===" => (3, Infix::Arith(BinOp::Eq)),
        "!=" | "!==" => (3, Infix::Arith(BinOp::Ne)),
        "<" => (4, Infix::Arith(BinOp::Lt)),
        "<=" => (4, Infix::Arith(BinOp::Le)),
        ">" => (4, Infix::Arith(BinOp::Gt)),
        ">=" => (4, Infix::Arith(BinOp::Ge)),
        "+" => (5, Infix::Arith(BinOp::Add)),
        "-" => (5, Infix::Arith(BinOp::Sub)),
        "*" => (6, Infix::Arith(BinOp::Mul)),
        "/" => (6, Infix::Arith(BinOp::Div)),
        "%" => (6, Infix::Arith(BinOp::Rem)),
        _ => return None,
    };
    Some(entry)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos += 1;
        token
    }

    fn eat(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Token::Op(o) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, op: &str) -> Result<(), String> {
        if self.eat(op) {
            Ok(())
        } else {
            Err(format!("expected '{}' but found {}", op, describe(self.peek())))
        }
    }

    /// `cond ? then : otherwise`, right-associative.
    fn expression(&mut self) -> Result<Expr, String> {
        let cond = self.binary(1)?;
        if !self.eat("?") {
            return Ok(cond);
        }
        let then = self.expression()?;
        self.expect(":")?;
        let otherwise = self.expression()?;
        Ok(Expr::Ternary(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    /// Left-associative binary operators at level `min` and tighter.
    fn binary(&mut self, min: u8) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        while let Some((level, op)) = infix(self.peek()).filter(|(level, _)| *level >= min) {
            self.pos += 1;
            let rhs = Box::new(self.binary(level + 1)?);
            lhs = match op {
                Infix::Arith(op) => Expr::Binary(op, Box::new(lhs), rhs),
                Infix::Logic(op) => Expr::Logical(op, Box::new(lhs), rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        let op = if self.eat("!") {
            UnaryOp::Not
        } else if self.eat("-") {
            UnaryOp::Neg
        } else if self.eat("+") {
            UnaryOp::Plus
        } else {
            return self.postfix();
        };
        Ok(Expr::Unary(op, Box::new(self.unary()?)))
    }

    fn postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(".") {
                match self.next() {
                    Token::Ident(name) => expr = Expr::Member(Box::new(expr), name),
                    other => {
                        return Err(format!(
                            "expected property name after '.' but found {}",
                            describe(&other)
                        ))
                    }
                }
            } else if self.eat("[") {
                let index = self.expression()?;
                self.expect("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Token::Num(n) => Ok(Expr::Literal(number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" | "undefined" => Expr::Literal(Value::Null),
                _ => Expr::Var(name),
            }),
            Token::Op("(") => {
                let inner = self.expression()?;
                self.expect(")")?;
                Ok(inner)
            }
            Token::Op("[") => {
                let mut items = Vec::new();
                while !self.eat("]") {
                    items.push(self.expression()?);
                    if !self.eat(",") {
                        self.expect("]")?;
                        break;
                    }
                }
                Ok(Expr::Array(items))
            }
            other => Err(format!("unexpected {}", describe(&other))),
        }
    }
}

/// Parses an expression string into an AST.
pub fn parse_expr(src: &str) -> Result<Expr, String> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        pos: 0,
    };
    let expr = parser.expression()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(format!("unexpected {}", describe(other))),
    }
}
