/*
 * parser.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Template string parser.
//!
//! The outer scanner splits the raw string into text, `$${...}` escapes,
//! `${...}` expressions and `${if}`/`${else}`/`${endif}` tags. Expressions
//! are parsed by recursive descent.
//!
//! Operator precedence (lowest to highest):
//!   ternary, `||`, `&&`, equality, relational and `contains`, additive,
//!   multiplicative, unary, postfix, primary

use crate::ast::{
    BinaryOp, ConditionalBlock, Expr, ExprKind, ParsedTemplate, TemplatePart, UnaryOp,
};
use crate::error::{TemplateError, TemplateResult};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::value::TemplateValue;
use std::ops::Range;
use tracing::trace;

/// Whether a string contains template syntax at all.
pub fn is_template_string(s: &str) -> bool {
    s.contains("${")
}

/// Parse a raw template string.
///
/// ```
/// use garden_template::parse_template;
///
/// let template = parse_template("${var.name}?").unwrap();
/// assert!(template.optional);
/// assert!(template.single_expression().is_some());
/// ```
pub fn parse_template(raw: &str) -> TemplateResult<ParsedTemplate> {
    let result = TemplateScanner::new(raw).scan();
    match &result {
        Ok(template) => trace!(template = raw, parts = template.parts.len(), "parsed template string"),
        Err(err) => trace!(template = raw, error = %err.cause, "failed to parse template string"),
    }
    result.map_err(|err| err.within_template(raw))
}

/// An open `${if}` block.
struct Frame {
    condition: Expr,
    start: usize,
    consequent: Vec<TemplatePart>,
    alternate: Option<Vec<TemplatePart>>,
}

enum Tag {
    If(Expr),
    Else,
    EndIf,
    Expression(Expr),
}

struct TemplateScanner<'a> {
    raw: &'a str,
    root: Vec<TemplatePart>,
    frames: Vec<Frame>,
}

impl<'a> TemplateScanner<'a> {
    fn new(raw: &'a str) -> Self {
        TemplateScanner {
            raw,
            root: Vec::new(),
            frames: Vec::new(),
        }
    }

    fn target(&mut self) -> &mut Vec<TemplatePart> {
        match self.frames.last_mut() {
            Some(Frame {
                alternate: Some(alternate),
                ..
            }) => alternate,
            Some(frame) => &mut frame.consequent,
            None => &mut self.root,
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let target = self.target();
        if let Some(TemplatePart::Text(existing)) = target.last_mut() {
            existing.push_str(text);
        } else {
            target.push(TemplatePart::Text(text.to_string()));
        }
    }

    fn scan(mut self) -> TemplateResult<ParsedTemplate> {
        let raw = self.raw;
        let bytes = raw.as_bytes();
        let mut optional = false;
        let mut pos = 0;
        let mut text_start = 0;

        while pos < bytes.len() {
            if raw[pos..].starts_with("$${") {
                match matching_brace(bytes, pos + 3) {
                    Some(end) => {
                        self.push_text(&raw[text_start..pos]);
                        let escaped = raw[pos..=end].to_string();
                        self.target().push(TemplatePart::Escaped(escaped));
                        pos = end + 1;
                        text_start = pos;
                    }
                    // An unclosed escape is plain text.
                    None => pos = bytes.len(),
                }
                continue;
            }

            if !raw[pos..].starts_with("${") {
                pos += raw[pos..].chars().next().map_or(1, char::len_utf8);
                continue;
            }

            self.push_text(&raw[text_start..pos]);
            let tag_start = pos;
            let (tag, end) = parse_tag(raw, pos + 2)?;
            pos = end;

            match tag {
                Tag::Expression(expr) => {
                    // `${foo}?` marks the whole string optional.
                    if tag_start == 0 && &raw[pos..] == "?" && self.frames.is_empty() {
                        optional = true;
                        pos += 1;
                    }
                    self.target().push(TemplatePart::Expression(expr));
                }
                Tag::If(condition) => {
                    if raw[pos..].starts_with('?') {
                        return Err(TemplateError::parse(
                            "Cannot specify optional suffix in if-block.",
                        )
                        .with_span(tag_start..pos + 1));
                    }
                    self.frames.push(Frame {
                        condition,
                        start: tag_start,
                        consequent: Vec::new(),
                        alternate: None,
                    });
                }
                Tag::Else => match self.frames.last_mut() {
                    None => {
                        return Err(TemplateError::parse(
                            "Found ${else} block without a preceding ${if ...} block.",
                        )
                        .with_span(tag_start..pos));
                    }
                    Some(Frame {
                        alternate: Some(_),
                        ..
                    }) => {
                        return Err(TemplateError::parse(
                            "Found multiple ${else} blocks in the same ${if ...} block.",
                        )
                        .with_span(tag_start..pos));
                    }
                    Some(frame) => frame.alternate = Some(Vec::new()),
                },
                Tag::EndIf => {
                    let Some(frame) = self.frames.pop() else {
                        return Err(TemplateError::parse(
                            "Found ${endif} block without a preceding ${if ...} block.",
                        )
                        .with_span(tag_start..pos));
                    };
                    let block = ConditionalBlock {
                        condition: frame.condition,
                        consequent: frame.consequent,
                        alternate: frame.alternate.unwrap_or_default(),
                        span: frame.start..pos,
                    };
                    self.target().push(TemplatePart::Conditional(block));
                }
            }
            text_start = pos;
        }

        self.push_text(&raw[text_start..]);

        if let Some(frame) = self.frames.last() {
            return Err(TemplateError::parse(
                "Missing ${endif} after ${if ...} block.",
            )
            .with_span(frame.start..frame.condition.span.end + 1));
        }

        Ok(ParsedTemplate {
            raw: raw.to_string(),
            parts: self.root,
            optional,
        })
    }
}

/// Byte index of the `}` closing a block whose content starts at `from`.
fn matching_brace(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, b) in bytes.iter().enumerate().skip(from) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse the body of a `${...}` tag starting at `pos`; returns the tag and
/// the offset just past its closing `}`.
fn parse_tag(raw: &str, pos: usize) -> TemplateResult<(Tag, usize)> {
    let mut parser = Parser::new(raw, pos);

    let first = parser.peek()?.clone();
    if let TokenKind::Ident(word) = &first.kind {
        match word.as_str() {
            "else" | "endif" => {
                parser.next()?;
                if parser.peek()?.kind == TokenKind::RBrace {
                    let end = parser.next()?.span.end;
                    let tag = if word == "else" { Tag::Else } else { Tag::EndIf };
                    return Ok((tag, end));
                }
                return Err(TemplateError::parse(format!(
                    "Unexpected content after ${{{word}"
                ))
                .with_span(first.span));
            }
            "if" => {
                parser.next()?;
                if parser.peek()?.kind == TokenKind::RBrace {
                    return Err(TemplateError::parse("Missing condition in ${if ...} block.")
                        .with_span(first.span));
                }
                let condition = parser.parse_expression()?;
                let end = parser.expect_close()?;
                return Ok((Tag::If(condition), end));
            }
            _ => {}
        }
    }

    let expr = parser.parse_expression()?;
    let end = parser.expect_close()?;
    Ok((Tag::Expression(expr), end))
}

/// Recursive-descent expression parser.
struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
}

impl<'a> Parser<'a> {
    fn new(raw: &'a str, pos: usize) -> Self {
        Parser {
            lexer: Lexer::new(raw, pos),
            peeked: None,
        }
    }

    fn peek(&mut self) -> TemplateResult<&Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    fn next(&mut self) -> TemplateResult<Token> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lexer.next_token(),
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> TemplateResult<bool> {
        if &self.peek()?.kind == kind {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> TemplateResult<Token> {
        let token = self.next()?;
        if token.kind == kind {
            Ok(token)
        } else {
            Err(unexpected(&token, &kind.to_string()))
        }
    }

    /// Consume the closing `}` of a tag and return the offset past it.
    fn expect_close(&mut self) -> TemplateResult<usize> {
        let token = self.next()?;
        match token.kind {
            TokenKind::RBrace => Ok(token.span.end),
            TokenKind::Eof => Err(TemplateError::parse(
                "Unexpected end of template string: missing closing '}'",
            )
            .with_span(token.span.start.saturating_sub(1)..token.span.end)),
            _ => Err(unexpected(&token, "'}' or an operator")),
        }
    }

    fn parse_expression(&mut self) -> TemplateResult<Expr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> TemplateResult<Expr> {
        let condition = self.parse_or()?;
        if !self.eat(&TokenKind::Question)? {
            return Ok(condition);
        }
        let consequent = self.parse_ternary()?;
        self.expect(TokenKind::Colon)?;
        let alternate = self.parse_ternary()?;
        let span = condition.span.start..alternate.span.end;
        Ok(Expr::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    fn parse_or(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or)? {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::And)? {
            let right = self.parse_equality()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek()?.kind {
                TokenKind::Eq => BinaryOp::Equal,
                TokenKind::Ne => BinaryOp::NotEqual,
                _ => return Ok(left),
            };
            self.next()?;
            let right = self.parse_relational()?;
            left = binary(op, left, right);
        }
    }

    fn parse_relational(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match &self.peek()?.kind {
                TokenKind::Lt => BinaryOp::Less,
                TokenKind::Le => BinaryOp::LessEqual,
                TokenKind::Gt => BinaryOp::Greater,
                TokenKind::Ge => BinaryOp::GreaterEqual,
                TokenKind::Ident(word) if word == "contains" => BinaryOp::Contains,
                _ => return Ok(left),
            };
            self.next()?;
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
    }

    fn parse_additive(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek()?.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => return Ok(left),
            };
            self.next()?;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek()?.kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Modulo,
                _ => return Ok(left),
            };
            self.next()?;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> TemplateResult<Expr> {
        let token = self.peek()?.clone();
        let op = match &token.kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Ident(word) if word == "typeof" => UnaryOp::TypeOf,
            _ => return self.parse_postfix(),
        };
        self.next()?;
        let operand = self.parse_unary()?;
        let span = token.span.start..operand.span.end;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self) -> TemplateResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek()?.kind {
                TokenKind::Dot => {
                    self.next()?;
                    let (key, key_span) = self.lexer.member_key()?;
                    let span = expr.span.start..key_span.end;
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            key: Box::new(Expr::new(
                                ExprKind::Literal(TemplateValue::String(key)),
                                key_span,
                            )),
                            computed: false,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.next()?;
                    let key = self.parse_expression()?;
                    let close = self.expect(TokenKind::RBracket)?;
                    let span = expr.span.start..close.span.end;
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            key: Box::new(key),
                            computed: true,
                        },
                        span,
                    );
                }
                TokenKind::LParen => {
                    let token = self.next()?;
                    return Err(TemplateError::parse(
                        "Only helper functions can be called; a function name must be a plain identifier",
                    )
                    .with_span(expr.span.start..token.span.end));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> TemplateResult<Expr> {
        let token = self.next()?;
        let span = token.span.clone();
        let kind = match token.kind {
            TokenKind::Number(n) => ExprKind::Literal(TemplateValue::Number(n)),
            TokenKind::Str(s) => ExprKind::Literal(TemplateValue::String(s)),
            TokenKind::Ident(name) => match name.as_str() {
                "true" => ExprKind::Literal(TemplateValue::Bool(true)),
                "false" => ExprKind::Literal(TemplateValue::Bool(false)),
                "null" => ExprKind::Literal(TemplateValue::Null),
                _ if self.peek()?.kind == TokenKind::LParen => {
                    return self.parse_helper_call(name, span);
                }
                _ => ExprKind::Identifier(name),
            },
            TokenKind::LParen => {
                let inner = self.parse_expression()?;
                let close = self.expect(TokenKind::RParen)?;
                return Ok(Expr::new(inner.kind, span.start..close.span.end));
            }
            TokenKind::LBracket => {
                let (items, end) = self.parse_list(TokenKind::RBracket)?;
                return Ok(Expr::new(ExprKind::Array(items), span.start..end));
            }
            TokenKind::DollarBrace => {
                let inner = self.parse_expression()?;
                let close = self.expect(TokenKind::RBrace)?;
                return Ok(Expr::new(inner.kind, span.start..close.span.end));
            }
            _ => return Err(unexpected(&token, "an expression")),
        };
        Ok(Expr::new(kind, span))
    }

    fn parse_helper_call(&mut self, name: String, name_span: Range<usize>) -> TemplateResult<Expr> {
        self.expect(TokenKind::LParen)?;
        let (args, end) = self.parse_list(TokenKind::RParen)?;
        Ok(Expr::new(
            ExprKind::HelperCall { name, args },
            name_span.start..end,
        ))
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn parse_list(&mut self, close: TokenKind) -> TemplateResult<(Vec<Expr>, usize)> {
        let mut items = Vec::new();
        loop {
            if self.peek()?.kind == close {
                let end = self.next()?.span.end;
                return Ok((items, end));
            }
            items.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma)? && self.peek()?.kind != close {
                let token = self.next()?;
                return Err(unexpected(&token, &format!("',' or {close}")));
            }
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.start..right.span.end;
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn unexpected(token: &Token, expected: &str) -> TemplateError {
    let message = match token.kind {
        TokenKind::Eof => format!("Unexpected end of template string, expected {expected}"),
        _ => format!("Unexpected {}, expected {expected}", token.kind),
    };
    TemplateError::parse(message).with_span(token.span.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expr(raw: &str) -> Expr {
        let template = parse_template(raw).unwrap();
        template.single_expression().cloned().unwrap()
    }

    fn ident(name: &str, span: Range<usize>) -> Expr {
        Expr::new(ExprKind::Identifier(name.to_string()), span)
    }

    #[test]
    fn test_plain_text_and_expression_parts() {
        let template = parse_template("foo-${a}-bar").unwrap();
        assert_eq!(
            template.parts,
            vec![
                TemplatePart::Text("foo-".into()),
                TemplatePart::Expression(ident("a", 6..7)),
                TemplatePart::Text("-bar".into()),
            ]
        );
        assert!(!template.optional);
    }

    #[test]
    fn test_precedence() {
        let parsed = expr("${a || b && c == d}");
        let ExprKind::Binary { op, right, .. } = parsed.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Or);
        let ExprKind::Binary { op, right, .. } = right.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::And);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Equal, .. }));
    }

    #[test]
    fn test_arithmetic_is_left_associative() {
        let parsed = expr("${1 - 2 - 3}");
        let ExprKind::Binary { left, right, .. } = parsed.kind else {
            panic!("expected binary");
        };
        assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Subtract, .. }));
        assert_eq!(right.kind, ExprKind::Literal(TemplateValue::Number(3.0)));
    }

    #[test]
    fn test_member_access() {
        let parsed = expr("${var.list.0}");
        assert_eq!(parsed.span, 2..12);
        let ExprKind::Member { object, key, computed } = parsed.kind else {
            panic!("expected member");
        };
        assert!(!computed);
        assert_eq!(key.kind, ExprKind::Literal(TemplateValue::String("0".into())));
        assert!(matches!(object.kind, ExprKind::Member { .. }));
    }

    #[test]
    fn test_bracket_access_with_nested_template() {
        let parsed = expr("${actions[${var.kind}].api}");
        let ExprKind::Member { object, .. } = parsed.kind else {
            panic!("expected member");
        };
        let ExprKind::Member { key, computed, .. } = object.kind else {
            panic!("expected member");
        };
        assert!(computed);
        assert!(matches!(key.kind, ExprKind::Member { .. }));
        assert_eq!(key.span, 10..21);
    }

    #[test]
    fn test_helper_call_and_array_literal() {
        let parsed = expr("${join([\"a\", b,], '-')}");
        let ExprKind::HelperCall { name, args } = parsed.kind else {
            panic!("expected helper call");
        };
        assert_eq!(name, "join");
        assert_eq!(args.len(), 2);
        let ExprKind::Array(items) = &args[0].kind else {
            panic!("expected array");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_unary_and_ternary() {
        let parsed = expr("${!a ? typeof b : -1}");
        let ExprKind::Ternary { condition, consequent, alternate } = parsed.kind else {
            panic!("expected ternary");
        };
        assert!(matches!(condition.kind, ExprKind::Unary { op: UnaryOp::Not, .. }));
        assert!(matches!(consequent.kind, ExprKind::Unary { op: UnaryOp::TypeOf, .. }));
        assert!(matches!(alternate.kind, ExprKind::Unary { op: UnaryOp::Negate, .. }));
    }

    #[test]
    fn test_contains_keyword() {
        let parsed = expr("${var.list contains 'x'}");
        assert!(matches!(parsed.kind, ExprKind::Binary { op: BinaryOp::Contains, .. }));
    }

    #[test]
    fn test_optional_suffix_only_on_whole_string() {
        assert!(parse_template("${a}?").unwrap().optional);

        let template = parse_template("x ${a}?").unwrap();
        assert!(!template.optional);
        assert_eq!(template.parts.last(), Some(&TemplatePart::Text("?".into())));
    }

    #[test]
    fn test_escaped_block() {
        let template = parse_template("$${bar} and ${baz}").unwrap();
        assert_eq!(
            template.parts,
            vec![
                TemplatePart::Escaped("$${bar}".into()),
                TemplatePart::Text(" and ".into()),
                TemplatePart::Expression(ident("baz", 14..17)),
            ]
        );
    }

    #[test]
    fn test_nested_if_blocks() {
        let template =
            parse_template("${if a}A${if b}B${else}C${endif}${else}D${endif}!").unwrap();
        assert_eq!(template.parts.len(), 2);
        let TemplatePart::Conditional(block) = &template.parts[0] else {
            panic!("expected conditional");
        };
        assert_eq!(block.span, 0..48);
        assert_eq!(block.consequent.len(), 2);
        assert!(matches!(block.consequent[1], TemplatePart::Conditional(_)));
        assert_eq!(block.alternate, vec![TemplatePart::Text("D".into())]);
        assert_eq!(template.parts[1], TemplatePart::Text("!".into()));
    }

    #[test]
    fn test_if_block_errors() {
        let err = parse_template("${if a}x").unwrap_err();
        assert_eq!(err.cause, "Missing ${endif} after ${if ...} block.");
        assert_eq!(err.template.as_deref(), Some("${if a}x"));

        let err = parse_template("x${endif}").unwrap_err();
        assert_eq!(
            err.cause,
            "Found ${endif} block without a preceding ${if ...} block."
        );

        let err = parse_template("${else}").unwrap_err();
        assert_eq!(
            err.cause,
            "Found ${else} block without a preceding ${if ...} block."
        );

        let err = parse_template("${if a}?x${endif}").unwrap_err();
        assert_eq!(err.cause, "Cannot specify optional suffix in if-block.");
    }

    #[test]
    fn test_malformed_expressions() {
        let err = parse_template("${a +}").unwrap_err();
        assert_eq!(err.cause, "Unexpected '}', expected an expression");
        assert_eq!(err.span, Some(5..6));

        let err = parse_template("${a").unwrap_err();
        assert_eq!(
            err.cause,
            "Unexpected end of template string: missing closing '}'"
        );

        let err = parse_template("${a b}").unwrap_err();
        assert_eq!(err.cause, "Unexpected identifier 'b', expected '}' or an operator");
        assert_eq!(
            err.to_string(),
            "Invalid template string (${a b}): Unexpected identifier 'b', expected '}' or an operator."
        );
    }
}
