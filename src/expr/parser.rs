//! Recursive-descent parser for metric expressions.
//!
//! Lexing is delegated to the `sqlparser` tokenizer; its tokens are narrowed
//! to the handful this grammar accepts and everything else is rejected.

use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

use super::{BinaryOp, Expr, Function};
use crate::{Error, Result};

/// Nesting limit for parentheses, unary chains, powers and calls.
const MAX_DEPTH: usize = 64;

/// Caps left-deep chains like `1 + 1 + ...`, which the depth limit cannot see.
const MAX_TOKENS: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Ident(String),
    Op(BinaryOp),
    LParen,
    RParen,
    Comma,
}

impl Tok {
    const fn comparison(&self) -> Option<BinaryOp> {
        match self {
            Self::Op(
                op @ (BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne),
            ) => Some(*op),
            _ => None,
        }
    }
}

/// Parse `source` into an expression tree.
///
/// Only syntax and function arity are checked here; names are resolved by
/// [`super::CompiledExpr::compile`].
///
/// # Errors
/// Returns [`Error::InvalidExpression`] for anything outside the grammar.
///
/// # Example
/// ```
/// use ecoproxy::expr::parse;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tree = parse("1 + 2 * energy ** 2")?;
/// assert_eq!(tree.to_string(), "(1 + (2 * (energy ** 2)))");
/// # Ok(())
/// # }
/// ```
pub fn parse(source: &str) -> Result<Expr> {
    let tokens = lex(source)?;
    if tokens.is_empty() {
        return Err(Error::invalid_expression(source, "empty expression"));
    }

    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;

    if let Some(tok) = parser.peek() {
        return Err(parser.error(format!("unexpected trailing {}", describe(tok))));
    }
    Ok(expr)
}

fn lex(source: &str) -> Result<Vec<Tok>> {
    let dialect = GenericDialect {};
    let raw = Tokenizer::new(&dialect, source)
        .tokenize()
        .map_err(|e| Error::invalid_expression(source, e.to_string()))?;

    let mut tokens = Vec::with_capacity(raw.len());
    // `**` arrives as two adjacent `*` tokens
    let mut after_star = false;

    for token in raw {
        let tok = match token {
            Token::EOF | Token::Whitespace(Whitespace::Space | Whitespace::Tab | Whitespace::Newline) => {
                after_star = false;
                continue;
            }
            Token::Whitespace(Whitespace::SingleLineComment { prefix, .. }) if prefix == "--" => {
                return Err(Error::invalid_expression(
                    source,
                    "comments are not allowed: `--` starts a comment, write `- -` for a double minus",
                ));
            }
            Token::Whitespace(_) => {
                return Err(Error::invalid_expression(source, "comments are not allowed"));
            }
            Token::Number(text, _) => Tok::Num(text.parse().map_err(|_| {
                Error::invalid_expression(source, format!("invalid number '{text}'"))
            })?),
            Token::Word(word) if word.quote_style.is_none() => Tok::Ident(word.value),
            Token::Mul if after_star => {
                tokens.pop();
                after_star = false;
                tokens.push(Tok::Op(BinaryOp::Pow));
                continue;
            }
            Token::Mul => {
                tokens.push(Tok::Op(BinaryOp::Mul));
                after_star = true;
                continue;
            }
            Token::Plus => Tok::Op(BinaryOp::Add),
            Token::Minus => Tok::Op(BinaryOp::Sub),
            Token::Div => Tok::Op(BinaryOp::Div),
            Token::Lt => Tok::Op(BinaryOp::Lt),
            Token::LtEq => Tok::Op(BinaryOp::Le),
            Token::Gt => Tok::Op(BinaryOp::Gt),
            Token::GtEq => Tok::Op(BinaryOp::Ge),
            Token::Eq | Token::DoubleEq => Tok::Op(BinaryOp::Eq),
            Token::Neq => Tok::Op(BinaryOp::Ne),
            Token::LParen => Tok::LParen,
            Token::RParen => Tok::RParen,
            Token::Comma => Tok::Comma,
            other => {
                return Err(Error::invalid_expression(
                    source,
                    format!("unsupported token '{other}'"),
                ));
            }
        };
        after_star = false;
        tokens.push(tok);
    }

    if tokens.len() > MAX_TOKENS {
        return Err(Error::invalid_expression(
            source,
            format!("more than {MAX_TOKENS} tokens"),
        ));
    }
    Ok(tokens)
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Num(n) => format!("number {n}"),
        Tok::Ident(name) => format!("name '{name}'"),
        Tok::Op(op) => format!("operator '{}'", op.symbol()),
        Tok::LParen => "'('".to_string(),
        Tok::RParen => "')'".to_string(),
        Tok::Comma => "','".to_string(),
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Tok>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::invalid_expression(self.source, reason)
    }

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {MAX_DEPTH}")));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr> {
        self.descend()?;
        let result = self.comparison();
        self.depth -= 1;
        result
    }

    fn comparison(&mut self) -> Result<Expr> {
        let left = self.additive()?;
        match self.peek().and_then(Tok::comparison) {
            Some(op) => {
                self.pos += 1;
                let right = self.additive()?;
                Ok(Expr::binary(op, left, right))
            }
            None => Ok(left),
        }
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Op(op @ (BinaryOp::Add | BinaryOp::Sub))) => *op,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Op(op @ (BinaryOp::Mul | BinaryOp::Div))) => *op,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Tok::Op(BinaryOp::Sub)) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.unary();
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(inner?)))
            }
            Some(Tok::Op(BinaryOp::Add)) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.unary();
                self.depth -= 1;
                inner
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.primary()?;
        if self.eat(&Tok::Op(BinaryOp::Pow)) {
            self.descend()?;
            let exponent = self.unary();
            self.depth -= 1;
            return Ok(Expr::binary(BinaryOp::Pow, base, exponent?));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Tok::Num(n)) => Ok(Expr::Number(n)),
            Some(Tok::Ident(name)) => {
                if self.eat(&Tok::LParen) {
                    self.call(&name)
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some(Tok::LParen) => {
                let inner = self.expr()?;
                if !self.eat(&Tok::RParen) {
                    return Err(self.error("missing ')'"));
                }
                Ok(inner)
            }
            Some(tok) => Err(self.error(format!("unexpected {}", describe(&tok)))),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    /// Arguments of `name(`; the opening parenthesis is already consumed.
    fn call(&mut self, name: &str) -> Result<Expr> {
        let func = Function::from_name(name)
            .ok_or_else(|| self.error(format!("unknown function '{name}'")))?;

        let mut args = Vec::new();
        if !self.eat(&Tok::RParen) {
            loop {
                args.push(self.expr()?);
                if self.eat(&Tok::Comma) {
                    continue;
                }
                if self.eat(&Tok::RParen) {
                    break;
                }
                return Err(self.error(format!("expected ',' or ')' in call to {name}")));
            }
        }

        if args.len() != func.arity() {
            return Err(self.error(format!(
                "{name} takes {} argument(s), got {}",
                func.arity(),
                args.len()
            )));
        }
        Ok(Expr::Call { func, args })
    }
}
