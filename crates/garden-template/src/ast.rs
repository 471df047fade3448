/*
 * ast.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Abstract syntax tree for template strings.
//!
//! A template string is a sequence of [`TemplatePart`]s: literal text,
//! escaped `$${...}` blocks, `${...}` expressions and `${if}` blocks. Every
//! expression node carries the byte span it covers in the raw string.

use crate::value::TemplateValue;
use std::fmt;
use std::ops::Range;

/// A parsed template string.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTemplate {
    /// The raw string as written in the document.
    pub raw: String,
    pub parts: Vec<TemplatePart>,
    /// Set by a trailing `?` after a lone `${...}`: a missing key resolves
    /// to undefined instead of failing.
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Literal text between expressions.
    Text(String),
    /// A `$${...}` block, stored with both dollar signs.
    Escaped(String),
    /// A `${...}` expression.
    Expression(Expr),
    /// A `${if c}...${else}...${endif}` block.
    Conditional(ConditionalBlock),
}

/// A multi-line conditional block.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBlock {
    pub condition: Expr,
    pub consequent: Vec<TemplatePart>,
    pub alternate: Vec<TemplatePart>,
    /// From the `${if` to the end of the `${endif}` tag.
    pub span: Range<usize>,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// String, number, boolean or null literal.
    Literal(TemplateValue),
    /// A top-level context key, e.g. `var` or `my-var`.
    Identifier(String),
    /// `object.key` or `object[key]`. For dotted access `key` is a string
    /// literal and `computed` is false.
    Member {
        object: Box<Expr>,
        key: Box<Expr>,
        computed: bool,
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
    Ternary {
        condition: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    HelperCall {
        name: String,
        args: Vec<Expr>,
    },
    Array(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Contains,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Contains => "contains",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Expr {
    pub fn new(kind: ExprKind, span: Range<usize>) -> Self {
        Expr { kind, span }
    }

    /// The text of this expression within the raw template.
    pub fn source_text<'a>(&self, raw: &'a str) -> &'a str {
        raw.get(self.span.clone()).unwrap_or_default()
    }
}

impl ParsedTemplate {
    /// A template consisting of a single `${...}` and nothing else, whose
    /// result keeps its type instead of being stringified.
    pub fn single_expression(&self) -> Option<&Expr> {
        match self.parts.as_slice() {
            [TemplatePart::Expression(expr)] => Some(expr),
            _ => None,
        }
    }
}
