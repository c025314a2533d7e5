//! Expression grammar used inside directive arguments, indexes and method calls.
//!
//! Precedence, loosest first: `||`, `&&`, equality, relational, additive,
//! multiplicative, unary. Word forms (`and`, `eq`, `lt`, ...) are accepted
//! wherever the symbol is.

use serde_json::{Number, Value};

use crate::diagnostic::Position;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::error::{Failure, Fallible};
use super::parser;
use super::scanner::Scanner;

impl Scanner {
    /// Parse one expression. Every call counts as a level of nesting.
    pub(super) fn expression(&mut self) -> Fallible<Expr> {
        let base = self.depth;
        let expr = self.enter().and_then(|()| self.or_expr());
        self.depth = base;
        expr
    }

    /// A left-associative run of `operand (operator operand)*`.
    ///
    /// The tree leans left, so each operator adds a level of nesting.
    fn chain(
        &mut self,
        operand: fn(&mut Self) -> Fallible<Expr>,
        operator: fn(&mut Self) -> Option<BinaryOp>,
    ) -> Fallible<Expr> {
        let base = self.depth;
        let mut lhs = operand(self)?;
        loop {
            self.skip_whitespace();
            let pos = self.position();
            let Some(op) = operator(self) else {
                self.depth = base;
                return Ok(lhs);
            };
            self.enter()?;
            self.skip_whitespace();
            let rhs = operand(self)?;
            lhs = binary(op, lhs, rhs, pos);
        }
    }

    fn or_expr(&mut self) -> Fallible<Expr> {
        self.chain(Self::and_expr, |s| {
            (s.eat("||") || s.eat_keyword("or")).then_some(BinaryOp::Or)
        })
    }

    fn and_expr(&mut self) -> Fallible<Expr> {
        self.chain(Self::equality, |s| {
            (s.eat("&&") || s.eat_keyword("and")).then_some(BinaryOp::And)
        })
    }

    fn equality(&mut self) -> Fallible<Expr> {
        self.chain(Self::relational, |s| {
            if s.eat("==") || s.eat_keyword("eq") {
                Some(BinaryOp::Eq)
            } else if s.eat("!=") || s.eat_keyword("ne") {
                Some(BinaryOp::Ne)
            } else {
                None
            }
        })
    }

    fn relational(&mut self) -> Fallible<Expr> {
        self.chain(Self::additive, |s| {
            if s.eat("<=") || s.eat_keyword("le") {
                Some(BinaryOp::Le)
            } else if s.eat(">=") || s.eat_keyword("ge") {
                Some(BinaryOp::Ge)
            } else if s.eat("<") || s.eat_keyword("lt") {
                Some(BinaryOp::Lt)
            } else if s.eat(">") || s.eat_keyword("gt") {
                Some(BinaryOp::Gt)
            } else {
                None
            }
        })
    }

    fn additive(&mut self) -> Fallible<Expr> {
        self.chain(Self::multiplicative, |s| {
            let op = match s.peek() {
                Some('+') => BinaryOp::Add,
                Some('-') => BinaryOp::Sub,
                _ => return None,
            };
            s.bump();
            Some(op)
        })
    }

    fn multiplicative(&mut self) -> Fallible<Expr> {
        self.chain(Self::unary, |s| {
            let op = match s.peek() {
                Some('*') => BinaryOp::Mul,
                Some('/') => BinaryOp::Div,
                Some('%') => BinaryOp::Rem,
                _ => return None,
            };
            s.bump();
            Some(op)
        })
    }

    fn unary(&mut self) -> Fallible<Expr> {
        let pos = self.position();
        let op = if self.peek() == Some('!') && self.peek_at(1) != Some('=') {
            self.bump();
            UnaryOp::Not
        } else if self.eat_keyword("not") {
            UnaryOp::Not
        } else if self.peek() == Some('-') {
            self.bump();
            UnaryOp::Neg
        } else {
            return self.primary();
        };
        self.enter()?;
        self.skip_whitespace();
        let expr = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
            pos,
        })
    }

    fn primary(&mut self) -> Fallible<Expr> {
        match self.peek() {
            Some('$') => match self.try_reference()? {
                Some(reference) => Ok(Expr::Reference(reference)),
                None => Err(self.unexpected("Expected a reference name")),
            },
            Some('"') => self.double_quoted(),
            Some('\'') => self.single_quoted().map(|s| Expr::Literal(Value::String(s))),
            Some(c) if c.is_ascii_digit() => self.number(),
            Some('[') => self.list_or_range(),
            Some('{') => self.map_literal(),
            Some('(') => {
                self.bump();
                self.skip_whitespace();
                let inner = self.expression()?;
                self.skip_whitespace();
                self.expect(')', "to close parenthesis")?;
                Ok(inner)
            }
            _ if self.eat_keyword("true") => Ok(Expr::Literal(Value::Bool(true))),
            _ if self.eat_keyword("false") => Ok(Expr::Literal(Value::Bool(false))),
            _ if self.eat_keyword("null") => Ok(Expr::Literal(Value::Null)),
            _ => Err(self.unexpected("Expected an expression")),
        }
    }

    fn number(&mut self) -> Fallible<Expr> {
        let pos = self.position();
        let mut digits = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            digits.push(c);
            self.bump();
        }
        let fractional =
            self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
        if !fractional {
            return digits
                .parse::<i64>()
                .map(|n| Expr::Literal(Value::from(n)))
                .map_err(|_| Failure::new(format!("Integer literal {digits} is out of range"), pos));
        }
        digits.push('.');
        self.bump();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            digits.push(c);
            self.bump();
        }
        digits
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(|n| Expr::Literal(Value::Number(n)))
            .ok_or_else(|| Failure::new(format!("Invalid number literal {digits}"), pos))
    }

    /// `'...'` with `''` standing for one quote. Never interpolated.
    fn single_quoted(&mut self) -> Fallible<String> {
        let pos = self.position();
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\'') if self.peek() == Some('\'') => {
                    self.bump();
                    out.push('\'');
                }
                Some('\'') => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(Failure::new("Unterminated string literal", pos)),
            }
        }
    }

    /// `"..."`, interpolated when it holds `$` or `#`.
    fn double_quoted(&mut self) -> Fallible<Expr> {
        let pos = self.position();
        self.bump();
        let origin = self.position();
        let mut raw = String::new();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') if self.peek() == Some('"') => {
                    self.bump();
                    raw.push('"');
                    out.push('"');
                }
                Some('\\') if self.peek() == Some('"') => {
                    self.bump();
                    raw.push('"');
                    out.push('"');
                }
                Some('"') => break,
                Some(c) => {
                    raw.push(c);
                    out.push(c);
                }
                None => return Err(Failure::new("Unterminated string literal", pos)),
            }
        }
        if !raw.contains(['$', '#']) {
            return Ok(Expr::Literal(Value::String(out)));
        }
        let nodes = parser::parse_fragment(&raw, origin, self.depth)?;
        Ok(Expr::Interpolated(nodes))
    }

    fn list_or_range(&mut self) -> Fallible<Expr> {
        let pos = self.position();
        self.bump();
        self.skip_whitespace();
        if self.eat("]") {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.expression()?;
        self.skip_whitespace();
        if self.eat("..") {
            self.skip_whitespace();
            let to = self.expression()?;
            self.skip_whitespace();
            self.expect(']', "to close range")?;
            return Ok(Expr::Range {
                from: Box::new(first),
                to: Box::new(to),
                pos,
            });
        }
        let mut items = vec![first];
        loop {
            self.skip_whitespace();
            if self.eat("]") {
                return Ok(Expr::List(items));
            }
            self.expect(',', "or ']' in list")?;
            self.skip_whitespace();
            items.push(self.expression()?);
        }
    }

    fn map_literal(&mut self) -> Fallible<Expr> {
        self.bump();
        let mut entries = Vec::new();
        self.skip_whitespace();
        if self.eat("}") {
            return Ok(Expr::Map(entries));
        }
        loop {
            self.skip_whitespace();
            let key = self.expression()?;
            self.skip_whitespace();
            self.expect(':', "after map key")?;
            self.skip_whitespace();
            let value = self.expression()?;
            entries.push((key, value));
            self.skip_whitespace();
            if self.eat("}") {
                return Ok(Expr::Map(entries));
            }
            self.expect(',', "or '}' in map")?;
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, pos: Position) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        pos,
    }
}
