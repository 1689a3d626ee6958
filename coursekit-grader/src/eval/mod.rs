// SPDX-License-Identifier: MIT OR Apache-2.0

//! The expression evaluator behind numerical and formula responses.
//!
//! Submissions like `4 + 5/2^2` or `2*g/c` are parsed and evaluated against
//! a variable table. The language covers the standard operators with usual
//! precedence, implicit multiplication, scientific notation, metric
//! suffixes, a set of scientific functions and the constants `pi`, `e`,
//! `g` and `c`. All arithmetic is real-valued.

mod functions;
mod lexer;
mod parser;

use std::collections::HashMap;

use thiserror::Error;

pub use parser::Expr;

/// Error types raised while parsing or evaluating an expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("empty expression")]
    EmptyExpression,

    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),

    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),

    #[error("unexpected token")]
    UnexpectedToken,

    #[error("unmatched parenthesis")]
    UnmatchedParenthesis,

    #[error("undefined variable {0:?}")]
    UndefinedVariable(String),
}

/// Variable table for evaluation.
///
/// Lookup tries the exact name first; unless `case_sensitive` is set, a
/// lowercase match is accepted as a fallback, so `R1` satisfies a formula
/// written with `r1`.
#[derive(Clone, Debug, Default)]
pub struct Context {
    variables: HashMap<String, f64>,
    case_sensitive: bool,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_variable(mut self, name: &str, value: f64) -> Self {
        self.variables.insert(name.to_owned(), value);
        self
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.variables.insert(name.to_owned(), value);
    }

    fn lookup(&self, name: &str) -> Option<f64> {
        if let Some(&value) = self.variables.get(name) {
            return Some(value);
        }
        if !self.case_sensitive {
            let lowered = name.to_lowercase();
            if let Some(&value) = self.variables.get(&lowered) {
                return Some(value);
            }
            // Variables may also have been declared in mixed case.
            for (key, &value) in &self.variables {
                if key.to_lowercase() == lowered {
                    return Some(value);
                }
            }
        }
        None
    }
}

/// Parse an expression without evaluating it.
pub fn parse(input: &str) -> Result<Expr, EvalError> {
    if input.trim().is_empty() {
        return Err(EvalError::EmptyExpression);
    }
    let tokens = lexer::tokenize(input)?;
    parser::parse(&tokens)
}

/// Parse and evaluate an expression against a variable table.
pub fn evaluate(input: &str, context: &Context) -> Result<f64, EvalError> {
    let expr = parse(input)?;
    evaluate_expr(&expr, context)
}

/// Evaluate an already-parsed expression.
pub fn evaluate_expr(expr: &Expr, context: &Context) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Var(name) => resolve(name, context),
        Expr::Call(name, argument) => {
            let argument = evaluate_expr(argument, context)?;
            // An unknown function name in call position is an undefined
            // symbol, same as a variable.
            apply_function(name, argument)
        }
        Expr::Neg(inner) => Ok(-evaluate_expr(inner, context)?),
        Expr::Add(l, r) => Ok(evaluate_expr(l, context)? + evaluate_expr(r, context)?),
        Expr::Sub(l, r) => Ok(evaluate_expr(l, context)? - evaluate_expr(r, context)?),
        Expr::Mul(l, r) => Ok(evaluate_expr(l, context)? * evaluate_expr(r, context)?),
        Expr::Div(l, r) => Ok(evaluate_expr(l, context)? / evaluate_expr(r, context)?),
        Expr::Pow(l, r) => Ok(evaluate_expr(l, context)?.powf(evaluate_expr(r, context)?)),
    }
}

/// Apply a named built-in function. Unknown names are undefined symbols.
pub(crate) fn apply_function(name: &str, argument: f64) -> Result<f64, EvalError> {
    match functions::function(name).or_else(|| functions::function(&name.to_lowercase())) {
        Some(f) => Ok(f(argument)),
        None => Err(EvalError::UndefinedVariable(name.to_owned())),
    }
}

pub(crate) fn resolve(name: &str, context: &Context) -> Result<f64, EvalError> {
    if let Some(value) = context.lookup(name) {
        return Ok(value);
    }
    if let Some(value) = functions::constant(name).or_else(|| functions::constant(&name.to_lowercase())) {
        return Ok(value);
    }
    Err(EvalError::UndefinedVariable(name.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::{Context, EvalError, evaluate};

    #[test]
    fn arithmetic() {
        let ctx = Context::new();
        assert_eq!(evaluate("4 + 5 / 2^2", &ctx).unwrap(), 5.25);
        assert_eq!(evaluate("-3^2", &ctx).unwrap(), -9.0);
        assert_eq!(evaluate("(1 + 2) * 3", &ctx).unwrap(), 9.0);
    }

    #[test]
    fn constants_and_functions() {
        let ctx = Context::new();
        assert!((evaluate("sin(pi/2)", &ctx).unwrap() - 1.0).abs() < 1e-12);
        assert!((evaluate("ln(e)", &ctx).unwrap() - 1.0).abs() < 1e-12);
        assert!((evaluate("2*c", &ctx).unwrap() - 5.996e8).abs() < 1.0);
    }

    #[test]
    fn variables_with_case_fallback() {
        let ctx = Context::new().with_variable("r1", 10.0);
        assert_eq!(evaluate("R1 * 2", &ctx).unwrap(), 20.0);

        let strict = Context::new().with_variable("r1", 10.0).case_sensitive(true);
        assert_eq!(
            evaluate("R1 * 2", &strict),
            Err(EvalError::UndefinedVariable("R1".to_owned()))
        );
    }

    #[test]
    fn undefined_variable_is_reported_by_name() {
        let ctx = Context::new();
        assert_eq!(
            evaluate("2 * flux", &ctx),
            Err(EvalError::UndefinedVariable("flux".to_owned()))
        );
    }

    #[test]
    fn implicit_multiplication_evaluates() {
        let ctx = Context::new().with_variable("x", 4.0);
        assert_eq!(evaluate("5x", &ctx).unwrap(), 20.0);
        assert_eq!(evaluate("(2)(3)(4)", &ctx).unwrap(), 24.0);
    }

    #[test]
    fn blank_input_is_empty_expression() {
        let ctx = Context::new();
        assert_eq!(evaluate("   ", &ctx), Err(EvalError::EmptyExpression));
    }
}
