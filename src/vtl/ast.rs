//! Parsed template structure.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::diagnostic::Position;

/// A parsed template, ready to render.
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) source: Rc<str>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) macros: HashMap<String, Rc<MacroDef>>,
}

impl Template {
    /// The text the template was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of the macros defined anywhere in the template.
    #[cfg(test)]
    pub(crate) fn macro_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.macros.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of top-level nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Reference(Reference),
    Set {
        target: Reference,
        value: Expr,
        pos: Position,
    },
    If {
        branches: Vec<(Expr, Vec<Node>)>,
        otherwise: Option<Vec<Node>>,
    },
    Foreach {
        var: String,
        iterable: Expr,
        body: Vec<Node>,
    },
    MacroCall {
        name: String,
        args: Vec<Expr>,
        literal: String,
        pos: Position,
    },
    Break,
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Node>,
}

/// `$name.prop[idx].method(args)` with its source spelling.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Reference {
    pub name: String,
    pub segments: Vec<Segment>,
    pub quiet: bool,
    pub literal: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Property(String),
    Index(Expr),
    Method { name: String, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    /// Double-quoted string containing references or directives.
    Interpolated(Vec<Node>),
    Reference(Reference),
    List(Vec<Expr>),
    Range {
        from: Box<Expr>,
        to: Box<Expr>,
        pos: Position,
    },
    Map(Vec<(Expr, Expr)>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        pos: Position,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        pos: Position,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}
