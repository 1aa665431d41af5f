//! Pure expression evaluation over case file data.
//!
//! Conditions in criteria and item control rules are small data ASTs evaluated
//! against the case file rendered as JSON. Evaluation is a pure function of
//! (expression, context); the engine relies on that purity when conditions are
//! re-evaluated during replay.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A condition or rule expression from the definition tree.
///
/// Paths are slash-separated lookups into the case file JSON (`order/total`).
/// A missing path evaluates to `null`; equality treats `null` as a regular
/// value, while ordering comparisons require numbers on both sides and fail
/// otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    /// A constant JSON value.
    Literal(Value),
    /// Lookup into the case file; missing paths yield `null`.
    Path(String),
    /// True when the path resolves to a non-null value.
    Exists(String),
    Not(Box<Expression>),
    /// True when every operand is true. Empty list is true.
    All(Vec<Expression>),
    /// True when at least one operand is true. Empty list is false.
    Any(Vec<Expression>),
    Eq(Box<Expression>, Box<Expression>),
    Ne(Box<Expression>, Box<Expression>),
    Gt(Box<Expression>, Box<Expression>),
    Lt(Box<Expression>, Box<Expression>),
}

/// Failure while evaluating an expression.
///
/// Propagated to the command issuer as an execution failure; evaluation never
/// silently defaults a broken expression to false.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationError {
    pub message: String,
}

impl EvaluationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expression evaluation failed: {}", self.message)
    }
}

impl std::error::Error for EvaluationError {}

/// Evaluates an expression against case data, producing a JSON value.
pub fn evaluate(expression: &Expression, context: &Value) -> Result<Value, EvaluationError> {
    match expression {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Path(path) => Ok(lookup(context, path).cloned().unwrap_or(Value::Null)),
        Expression::Exists(path) => {
            let present = matches!(lookup(context, path), Some(v) if !v.is_null());
            Ok(Value::Bool(present))
        }
        Expression::Not(inner) => {
            let value = evaluate_bool(inner, context)?;
            Ok(Value::Bool(!value))
        }
        Expression::All(operands) => {
            for operand in operands {
                if !evaluate_bool(operand, context)? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Expression::Any(operands) => {
            for operand in operands {
                if evaluate_bool(operand, context)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Expression::Eq(left, right) => {
            Ok(Value::Bool(evaluate(left, context)? == evaluate(right, context)?))
        }
        Expression::Ne(left, right) => {
            Ok(Value::Bool(evaluate(left, context)? != evaluate(right, context)?))
        }
        Expression::Gt(left, right) => compare(left, right, context, "greater-than", |l, r| l > r),
        Expression::Lt(left, right) => compare(left, right, context, "less-than", |l, r| l < r),
    }
}

/// Evaluates an expression that must produce a boolean.
pub fn evaluate_bool(expression: &Expression, context: &Value) -> Result<bool, EvaluationError> {
    match evaluate(expression, context)? {
        Value::Bool(b) => Ok(b),
        other => Err(EvaluationError::new(format!(
            "expected a boolean, got {other}"
        ))),
    }
}

fn compare(
    left: &Expression,
    right: &Expression,
    context: &Value,
    op: &str,
    cmp: impl Fn(f64, f64) -> bool,
) -> Result<Value, EvaluationError> {
    let l = as_number(evaluate(left, context)?, op)?;
    let r = as_number(evaluate(right, context)?, op)?;
    Ok(Value::Bool(cmp(l, r)))
}

fn as_number(value: Value, op: &str) -> Result<f64, EvaluationError> {
    value
        .as_f64()
        .ok_or_else(|| EvaluationError::new(format!("{op} requires numbers, got {value}")))
}

fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = context;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
#[path = "tests/expression_tests.rs"]
mod tests;
