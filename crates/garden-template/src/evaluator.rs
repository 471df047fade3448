/*
 * evaluator.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Evaluation of single template strings.

use crate::ast::{BinaryOp, ConditionalBlock, Expr, ExprKind, ParsedTemplate, TemplatePart, UnaryOp};
use crate::context::{Context, LookupResult};
use crate::error::{TemplateError, TemplateResult, key_not_found_message};
use crate::helpers::call_helper;
use crate::options::{EvalOptions, ResolutionMode};
use crate::resolved::{Inputs, Resolved, TemplateLeaf};
use crate::value::TemplateValue;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// Result of evaluating a template string.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateOutcome {
    Value(Resolved),
    /// The template could not be resolved yet and should be kept as written.
    Deferred,
}

/// Result of evaluating one expression.
#[derive(Debug)]
pub(crate) enum Outcome {
    Value(Resolved),
    /// A key was not found. Operators such as `||` may recover from this.
    Missing(TemplateError),
    /// A key is only available in a later phase.
    Later,
}

/// Evaluate a parsed template string against a context.
///
/// Strict mode fails on missing keys. Legacy partial mode returns
/// [`TemplateOutcome::Deferred`] instead. Values only available later are
/// always deferred.
pub fn evaluate_template(
    template: &ParsedTemplate,
    context: &Arc<Context>,
    opts: &EvalOptions,
) -> TemplateResult<TemplateOutcome> {
    let mut evaluator = ExprEvaluator::new(context, opts);
    let outcome = evaluator
        .eval_parts(&template.parts)
        .map_err(|err| err.within_template(&template.raw))?;
    let inputs = evaluator.inputs;

    match outcome {
        Outcome::Value(resolved) => Ok(TemplateOutcome::Value(finish(
            resolved,
            &template.raw,
            &inputs,
        ))),
        Outcome::Later => {
            debug!(template = %template.raw, "value available later, deferring template");
            Ok(TemplateOutcome::Deferred)
        }
        Outcome::Missing(_) if template.optional => {
            Ok(TemplateOutcome::Value(Resolved::Leaf(TemplateLeaf {
                value: None,
                expr: Some(template.raw.clone()),
                inputs,
            })))
        }
        Outcome::Missing(err) => match opts.mode {
            ResolutionMode::Strict => Err(err.within_template(&template.raw)),
            ResolutionMode::LegacyPartial => {
                debug!(template = %template.raw, cause = %err.cause, "passing through unresolved template");
                Ok(TemplateOutcome::Deferred)
            }
        },
    }
}

fn finish(resolved: Resolved, raw: &str, inputs: &Inputs) -> Resolved {
    match resolved {
        Resolved::Leaf(mut leaf) => {
            leaf.expr = Some(raw.to_string());
            for (key, input) in inputs {
                leaf.inputs.entry(key.clone()).or_insert_with(|| input.clone());
            }
            Resolved::Leaf(leaf)
        }
        other => other.with_inputs(inputs),
    }
}

fn truthy(value: &Option<TemplateValue>) -> bool {
    value.as_ref().is_some_and(TemplateValue::is_truthy)
}

fn type_name(value: &Option<TemplateValue>) -> &'static str {
    value.as_ref().map_or("undefined", TemplateValue::type_name)
}

fn plain(value: TemplateValue) -> Resolved {
    Resolved::Leaf(TemplateLeaf::plain(value))
}

enum PathOutcome {
    Path(Vec<String>),
    Stop(Outcome),
    /// The base of a member expression is not a context reference.
    NotPath,
}

/// Evaluates expressions, accumulating the inputs of every value it
/// consumes into a primitive result.
pub(crate) struct ExprEvaluator<'a> {
    context: &'a Arc<Context>,
    opts: &'a EvalOptions,
    pub(crate) inputs: Inputs,
}

impl<'a> ExprEvaluator<'a> {
    pub(crate) fn new(context: &'a Arc<Context>, opts: &'a EvalOptions) -> Self {
        ExprEvaluator {
            context,
            opts,
            inputs: Inputs::new(),
        }
    }

    /// Unwrap a value whose contents flow into a derived result.
    pub(crate) fn consume(&mut self, value: &Resolved) -> Option<TemplateValue> {
        self.inputs.extend(value.collect_inputs());
        value.unwrap()
    }

    fn eval_parts(&mut self, parts: &[TemplatePart]) -> TemplateResult<Outcome> {
        match parts {
            [TemplatePart::Expression(expr)] => return self.eval(expr),
            [TemplatePart::Conditional(block)] => return self.eval_conditional(block),
            _ => {}
        }

        let mut out = String::new();
        let mut missing = None;
        let mut later = false;
        for part in parts {
            let (outcome, span) = match part {
                TemplatePart::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                TemplatePart::Escaped(raw) => {
                    out.push_str(if self.opts.unescape { &raw[1..] } else { raw.as_str() });
                    continue;
                }
                TemplatePart::Expression(expr) => (self.eval(expr)?, expr.span.clone()),
                TemplatePart::Conditional(block) => {
                    (self.eval_conditional(block)?, block.span.clone())
                }
            };
            match outcome {
                Outcome::Value(value) => match self.consume(&value) {
                    None => {}
                    Some(value) => match value.to_interpolated() {
                        Some(text) => out.push_str(&text),
                        None => {
                            return Err(TemplateError::type_error(format!(
                                "Cannot interpolate a value of type {} into a string. \
                                 Use the jsonEncode helper to serialize it",
                                value.type_name()
                            ))
                            .with_span(span));
                        }
                    },
                },
                Outcome::Missing(err) => {
                    missing.get_or_insert(err);
                }
                Outcome::Later => later = true,
            }
        }

        Ok(if later {
            Outcome::Later
        } else if let Some(err) = missing {
            Outcome::Missing(err)
        } else {
            Outcome::Value(plain(TemplateValue::String(out)))
        })
    }

    fn eval_conditional(&mut self, block: &ConditionalBlock) -> TemplateResult<Outcome> {
        let branch = match self.eval(&block.condition)? {
            Outcome::Value(value) => {
                if truthy(&self.consume(&value)) {
                    &block.consequent
                } else {
                    &block.alternate
                }
            }
            Outcome::Missing(_) => &block.alternate,
            Outcome::Later => return Ok(Outcome::Later),
        };
        self.eval_parts(branch)
    }

    pub(crate) fn eval(&mut self, expr: &Expr) -> TemplateResult<Outcome> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(Outcome::Value(Resolved::from_value(value.clone()))),
            ExprKind::Identifier(name) => self.lookup(std::slice::from_ref(name), &expr.span),
            ExprKind::Member { object, key, .. } => match self.reference_path(expr)? {
                PathOutcome::Path(path) => self.lookup(&path, &expr.span),
                PathOutcome::Stop(outcome) => Ok(outcome),
                PathOutcome::NotPath => self.eval_member_of_value(object, key, &expr.span),
            },
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, &expr.span),
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right, &expr.span),
            ExprKind::Ternary {
                condition,
                consequent,
                alternate,
            } => match self.eval(condition)? {
                Outcome::Value(value) => {
                    if truthy(&self.consume(&value)) {
                        self.eval(consequent)
                    } else {
                        self.eval(alternate)
                    }
                }
                Outcome::Missing(_) => self.eval(alternate),
                Outcome::Later => Ok(Outcome::Later),
            },
            ExprKind::HelperCall { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    match self.eval(arg)? {
                        Outcome::Value(value) => values.push(self.consume(&value)),
                        // Helper arguments never resolve partially.
                        Outcome::Missing(err) => return Err(err),
                        Outcome::Later => return Ok(Outcome::Later),
                    }
                }
                let result =
                    call_helper(name, &values).map_err(|err| err.with_span(expr.span.clone()))?;
                Ok(Outcome::Value(Resolved::from_value(result)))
            }
            ExprKind::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match self.eval(item)? {
                        Outcome::Value(value) => out.push(value),
                        other => return Ok(other),
                    }
                }
                Ok(Outcome::Value(Resolved::Array(out)))
            }
        }
    }

    /// Flatten a chain of member accesses on an identifier into a key path.
    fn reference_path(&mut self, expr: &Expr) -> TemplateResult<PathOutcome> {
        match &expr.kind {
            ExprKind::Identifier(name) => Ok(PathOutcome::Path(vec![name.clone()])),
            ExprKind::Member { object, key, .. } => match self.reference_path(object)? {
                PathOutcome::Path(mut path) => match self.eval_key(key)? {
                    Ok(key) => {
                        path.push(key);
                        Ok(PathOutcome::Path(path))
                    }
                    Err(outcome) => Ok(PathOutcome::Stop(outcome)),
                },
                other => Ok(other),
            },
            _ => Ok(PathOutcome::NotPath),
        }
    }

    /// Evaluate a member key to a string. `Err` carries a key that is only
    /// available later. A missing key inside `[...]` is an error in every
    /// mode, even under `||`.
    pub(crate) fn eval_key(&mut self, key: &Expr) -> TemplateResult<Result<String, Outcome>> {
        if let ExprKind::Literal(TemplateValue::String(s)) = &key.kind {
            return Ok(Ok(s.clone()));
        }
        let value = match self.eval(key)? {
            Outcome::Value(value) => self.consume(&value),
            Outcome::Missing(err) => return Err(err),
            Outcome::Later => return Ok(Err(Outcome::Later)),
        };
        match value {
            Some(TemplateValue::String(s)) => Ok(Ok(s)),
            Some(ref number @ TemplateValue::Number(_)) if number.as_index().is_some() => {
                Ok(Ok(number.to_string()))
            }
            other => Err(TemplateError::type_error(format!(
                "Invalid key type: expected a string or a non-negative integer (got {})",
                type_name(&other)
            ))
            .with_span(key.span.clone())),
        }
    }

    fn eval_member_of_value(
        &mut self,
        object: &Expr,
        key: &Expr,
        span: &Range<usize>,
    ) -> TemplateResult<Outcome> {
        let base = match self.eval(object)? {
            Outcome::Value(value) => value,
            other => return Ok(other),
        };
        let key = match self.eval_key(key)? {
            Ok(key) => key,
            Err(outcome) => return Ok(outcome),
        };
        Ok(match base.get(&key) {
            Some(child) => Outcome::Value(child.clone()),
            None => Outcome::Missing(
                TemplateError::lookup(key_not_found_message(&[key], 0, &base.keys()))
                    .with_span(span.clone()),
            ),
        })
    }

    fn lookup(&mut self, path: &[String], span: &Range<usize>) -> TemplateResult<Outcome> {
        Ok(match self.context.lookup(path, self.opts)? {
            LookupResult::Found(value) => Outcome::Value(value.tracked(&path.join("."))),
            LookupResult::AvailableLater => Outcome::Later,
            LookupResult::NotFound(miss) => {
                Outcome::Missing(TemplateError::lookup(miss.message()).with_span(span.clone()))
            }
        })
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr, span: &Range<usize>) -> TemplateResult<Outcome> {
        let outcome = self.eval(operand)?;
        let value = match (op, outcome) {
            (UnaryOp::TypeOf, Outcome::Missing(_)) => {
                return Ok(Outcome::Value(plain("undefined".into())));
            }
            (_, Outcome::Value(value)) => self.consume(&value),
            (_, other) => return Ok(other),
        };
        let result = match op {
            UnaryOp::TypeOf => {
                TemplateValue::from(value.as_ref().map_or("undefined", TemplateValue::typeof_name))
            }
            UnaryOp::Not => TemplateValue::Bool(!truthy(&value)),
            UnaryOp::Negate => match value {
                Some(TemplateValue::Number(n)) => TemplateValue::Number(-n),
                other => {
                    return Err(TemplateError::type_error(format!(
                        "The - operator requires a number (got {})",
                        type_name(&other)
                    ))
                    .with_span(span.clone()));
                }
            },
        };
        Ok(Outcome::Value(plain(result)))
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: &Range<usize>,
    ) -> TemplateResult<Outcome> {
        match op {
            BinaryOp::Or => match self.eval(left)? {
                Outcome::Value(value) => {
                    if truthy(&self.consume(&value)) {
                        Ok(Outcome::Value(value))
                    } else {
                        self.eval(right)
                    }
                }
                Outcome::Missing(_) => self.eval(right),
                Outcome::Later => Ok(Outcome::Later),
            },
            BinaryOp::And => match self.eval(left)? {
                Outcome::Value(value) => {
                    if truthy(&self.consume(&value)) {
                        self.eval(right)
                    } else {
                        Ok(Outcome::Value(value))
                    }
                }
                Outcome::Missing(_) => Ok(Outcome::Value(plain(TemplateValue::Bool(false)))),
                Outcome::Later => Ok(Outcome::Later),
            },
            _ => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                let (left, right) = match (left, right) {
                    (Outcome::Value(left), Outcome::Value(right)) => (left, right),
                    (Outcome::Later, _) | (_, Outcome::Later) => return Ok(Outcome::Later),
                    (Outcome::Missing(err), _) | (_, Outcome::Missing(err)) => {
                        return Ok(Outcome::Missing(err));
                    }
                };
                self.apply_binary(op, left, right)
                    .map(Outcome::Value)
                    .map_err(|err| err.with_span(span.clone()))
            }
        }
    }

    fn apply_binary(&mut self, op: BinaryOp, left: Resolved, right: Resolved) -> TemplateResult<Resolved> {
        if op == BinaryOp::Add {
            if let (Resolved::Array(a), Resolved::Array(b)) = (&left, &right) {
                return Ok(Resolved::Array(a.iter().chain(b).cloned().collect()));
            }
        }

        let lhs = self.consume(&left);
        let rhs = self.consume(&right);
        let numbers = || match (&lhs, &rhs) {
            (Some(TemplateValue::Number(a)), Some(TemplateValue::Number(b))) => Ok((*a, *b)),
            _ => Err(TemplateError::type_error(format!(
                "Both terms need to be numbers for {op} operator (got {} and {})",
                type_name(&lhs),
                type_name(&rhs)
            ))),
        };

        let result = match op {
            BinaryOp::Or => {
                if truthy(&lhs) {
                    return Ok(left);
                }
                return Ok(right);
            }
            BinaryOp::And => {
                if truthy(&lhs) {
                    return Ok(right);
                }
                return Ok(left);
            }
            BinaryOp::Equal => TemplateValue::Bool(lhs == rhs),
            BinaryOp::NotEqual => TemplateValue::Bool(lhs != rhs),
            BinaryOp::Less => {
                let (a, b) = numbers()?;
                TemplateValue::Bool(a < b)
            }
            BinaryOp::LessEqual => {
                let (a, b) = numbers()?;
                TemplateValue::Bool(a <= b)
            }
            BinaryOp::Greater => {
                let (a, b) = numbers()?;
                TemplateValue::Bool(a > b)
            }
            BinaryOp::GreaterEqual => {
                let (a, b) = numbers()?;
                TemplateValue::Bool(a >= b)
            }
            BinaryOp::Add => match (&lhs, &rhs) {
                (Some(TemplateValue::Number(a)), Some(TemplateValue::Number(b))) => {
                    TemplateValue::Number(a + b)
                }
                (Some(TemplateValue::String(a)), Some(TemplateValue::String(b))) => {
                    TemplateValue::String(format!("{a}{b}"))
                }
                _ => {
                    return Err(TemplateError::type_error(format!(
                        "Both terms need to be either arrays or strings or numbers for + operator (got {} and {})",
                        type_name(&lhs),
                        type_name(&rhs)
                    )));
                }
            },
            BinaryOp::Subtract => {
                let (a, b) = numbers()?;
                TemplateValue::Number(a - b)
            }
            BinaryOp::Multiply => {
                let (a, b) = numbers()?;
                TemplateValue::Number(a * b)
            }
            BinaryOp::Divide | BinaryOp::Modulo => {
                let (a, b) = numbers()?;
                if b == 0.0 {
                    return Err(TemplateError::type_error(format!(
                        "Cannot divide by zero with {op} operator"
                    )));
                }
                TemplateValue::Number(if op == BinaryOp::Divide { a / b } else { a % b })
            }
            BinaryOp::Contains => TemplateValue::Bool(contains(&lhs, &rhs)?),
        };
        Ok(plain(result))
    }
}

fn contains(haystack: &Option<TemplateValue>, needle: &Option<TemplateValue>) -> TemplateResult<bool> {
    let needle = match needle {
        Some(value) if value.is_primitive() => value,
        other => {
            return Err(TemplateError::type_error(format!(
                "The right-hand side of a contains operator must be a string, number, boolean or null (got {}).",
                type_name(other)
            )));
        }
    };
    match haystack {
        Some(TemplateValue::String(s)) => Ok(s.contains(&needle.to_string())),
        Some(TemplateValue::Array(items)) => Ok(items.contains(needle)),
        Some(TemplateValue::Object(map)) => Ok(map.contains_key(&needle.to_string())),
        other => Err(TemplateError::type_error(format!(
            "The left-hand side of a contains operator must be a string, array or object (got {}).",
            type_name(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_template;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn context(value: serde_json::Value) -> Arc<Context> {
        Arc::new(Context::from_value(value.into()))
    }

    fn eval_with(raw: &str, ctx: serde_json::Value, opts: &EvalOptions) -> TemplateResult<TemplateOutcome> {
        evaluate_template(&parse_template(raw).unwrap(), &context(ctx), opts)
    }

    fn eval(raw: &str, ctx: serde_json::Value) -> Option<TemplateValue> {
        match eval_with(raw, ctx, &EvalOptions::strict()).unwrap() {
            TemplateOutcome::Value(value) => value.unwrap(),
            TemplateOutcome::Deferred => panic!("unexpected deferral"),
        }
    }

    fn eval_err(raw: &str, ctx: serde_json::Value) -> TemplateError {
        eval_with(raw, ctx, &EvalOptions::strict()).unwrap_err()
    }

    #[test]
    fn test_single_expression_keeps_type() {
        assert_eq!(eval("${var.n}", json!({"var": {"n": 3}})), Some(3.0.into()));
        assert_eq!(
            eval("${var.list}", json!({"var": {"list": [1, "a"]}})),
            Some(json!([1, "a"]).into())
        );
        assert_eq!(eval("port-${var.n}", json!({"var": {"n": 3}})), Some("port-3".into()));
    }

    #[test]
    fn test_interpolating_collections_fails() {
        let err = eval_err("x-${var.list}", json!({"var": {"list": [1]}}));
        assert_eq!(err.kind, crate::error::ErrorKind::Type);
        assert!(err.to_string().starts_with("Invalid template string (x-${var.list}): Cannot interpolate"));
    }

    #[test]
    fn test_logical_operators() {
        let ctx = json!({"var": {"a": "", "b": "fallback"}});
        assert_eq!(eval("${var.a || var.b}", ctx.clone()), Some("fallback".into()));
        assert_eq!(eval("${var.missing || 'x'}", ctx.clone()), Some("x".into()));
        assert_eq!(eval("${var.missing && 'x'}", ctx.clone()), Some(false.into()));
        assert_eq!(eval("${var.b && 'x'}", ctx), Some("x".into()));
    }

    #[test]
    fn test_missing_on_both_sides_of_or_fails() {
        let err = eval_err("${var.a || var.b}", json!({"var": {}}));
        assert_eq!(err.cause, "Could not find key b under var.");
    }

    #[test]
    fn test_comparison_type_error() {
        let err = eval_err("${'a' > 1}", json!({}));
        assert_eq!(
            err.to_string(),
            "Invalid template string (${'a' > 1}): Both terms need to be numbers for > operator (got string and number)."
        );
    }

    #[test]
    fn test_addition() {
        assert_eq!(eval("${1 + 2}", json!({})), Some(3.0.into()));
        assert_eq!(eval("${'a' + 'b'}", json!({})), Some("ab".into()));
        assert_eq!(
            eval("${var.a + var.b}", json!({"var": {"a": [1], "b": [2]}})),
            Some(json!([1, 2]).into())
        );
        let err = eval_err("${'a' + 1}", json!({}));
        assert_eq!(
            err.cause,
            "Both terms need to be either arrays or strings or numbers for + operator (got string and number)"
        );
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval_err("${4 / 0}", json!({}));
        assert_eq!(err.cause, "Cannot divide by zero with / operator");
        assert_eq!(eval("${7 % 4}", json!({})), Some(3.0.into()));
    }

    #[test]
    fn test_contains() {
        let ctx = json!({"var": {"list": ["a", "b"], "map": {"k": 1}, "s": "hello"}});
        assert_eq!(eval("${var.list contains 'a'}", ctx.clone()), Some(true.into()));
        assert_eq!(eval("${var.map contains 'k'}", ctx.clone()), Some(true.into()));
        assert_eq!(eval("${var.s contains 'ell'}", ctx.clone()), Some(true.into()));
        let err = eval_err("${1 contains 'a'}", ctx);
        assert_eq!(
            err.cause,
            "The left-hand side of a contains operator must be a string, array or object (got number)."
        );
    }

    #[test]
    fn test_typeof_and_ternary() {
        assert_eq!(eval("${typeof var.x}", json!({"var": {}})), Some("undefined".into()));
        assert_eq!(eval("${typeof var.x}", json!({"var": {"x": [1]}})), Some("object".into()));
        assert_eq!(
            eval("${var.x ? 'yes' : 'no'}", json!({"var": {}})),
            Some("no".into())
        );
    }

    #[test]
    fn test_computed_keys() {
        let ctx = json!({"var": {"list": ["a", "b"], "key": "name", "map": {"name": "api"}}});
        assert_eq!(eval("${var.list[1]}", ctx.clone()), Some("b".into()));
        assert_eq!(eval("${var.map[var.key]}", ctx.clone()), Some("api".into()));
        let err = eval_err("${var.map[var.list]}", ctx);
        assert_eq!(err.kind, crate::error::ErrorKind::Type);
    }

    #[test]
    fn test_member_of_helper_result() {
        assert_eq!(eval("${split('a,b', ',')[1]}", json!({})), Some("b".into()));
    }

    #[test]
    fn test_conditional_blocks() {
        let ctx = json!({"var": {"on": true}});
        assert_eq!(eval("a${if var.on}b${else}c${endif}d", ctx), Some("abd".into()));
        assert_eq!(
            eval("a${if var.missing}b${endif}d", json!({"var": {}})),
            Some("ad".into())
        );
    }

    #[test]
    fn test_optional_suffix() {
        let outcome = eval_with("${var.missing}?", json!({"var": {}}), &EvalOptions::strict()).unwrap();
        let TemplateOutcome::Value(Resolved::Leaf(leaf)) = outcome else {
            panic!("expected leaf");
        };
        assert_eq!(leaf.value, None);
    }

    #[test]
    fn test_legacy_mode_defers_missing_keys() {
        let outcome =
            eval_with("${var.missing}", json!({"var": {}}), &EvalOptions::legacy_partial()).unwrap();
        assert_eq!(outcome, TemplateOutcome::Deferred);
    }

    #[test]
    fn test_escapes() {
        assert_eq!(eval("$${var.x}", json!({})), Some("$${var.x}".into()));
        let outcome = eval_with("a $${var.x}", json!({}), &EvalOptions::strict().with_unescape(true)).unwrap();
        assert_eq!(
            outcome,
            TemplateOutcome::Value(Resolved::Leaf(TemplateLeaf {
                value: Some("a ${var.x}".into()),
                expr: Some("a $${var.x}".to_string()),
                inputs: Inputs::new(),
            }))
        );
    }

    #[test]
    fn test_provenance_of_derived_values() {
        let outcome = eval_with(
            "${var.a}-${var.b}",
            json!({"var": {"a": "x", "b": "y"}}),
            &EvalOptions::strict(),
        )
        .unwrap();
        let TemplateOutcome::Value(Resolved::Leaf(leaf)) = outcome else {
            panic!("expected leaf");
        };
        assert_eq!(leaf.value, Some("x-y".into()));
        assert_eq!(leaf.expr.as_deref(), Some("${var.a}-${var.b}"));
        assert_eq!(leaf.inputs.keys().collect::<Vec<_>>(), ["var.a", "var.b"]);
    }
}
