// SPDX-License-Identifier: MIT OR Apache-2.0

//! Numerical responses: a number or formulaic expression accepted with a
//! tolerance.

use serde::{Deserialize, Serialize};

use crate::eval;
use crate::grade::{Correctness, GradeContext, IncorrectReason};
use crate::tolerance::Tolerance;

/// The accepted answer: a single target expression, or a closed/open range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericalAnswer {
    /// Target expression, evaluated with the problem's template variables.
    Value(String),

    /// Accept anything inside the range. Bounds are expressions too.
    Range {
        lower: String,
        upper: String,
        #[serde(default = "default_inclusive")]
        lower_inclusive: bool,
        #[serde(default = "default_inclusive")]
        upper_inclusive: bool,
    },
}

fn default_inclusive() -> bool {
    true
}

/// Extra credit style for near misses.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialCredit {
    /// Half credit within twice the declared tolerance.
    Close,
}

/// Fraction of points a `Close` near-miss earns.
const CLOSE_CREDIT: f64 = 0.5;

/// How much the tolerance band widens for `Close` credit.
const CLOSE_FACTOR: f64 = 2.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericalResponse {
    pub answer: NumericalAnswer,

    #[serde(default)]
    pub tolerance: Tolerance,

    /// Further accepted target expressions, each graded with the same
    /// tolerance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_answers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_credit: Option<PartialCredit>,
}

impl NumericalResponse {
    pub fn grade(&self, raw: &str, ctx: &GradeContext<'_>) -> Correctness {
        let value = match eval::evaluate(raw, ctx.variables) {
            Ok(value) => value,
            Err(_) => {
                return Correctness::Incorrect {
                    reason: Some(IncorrectReason::Unparseable),
                };
            }
        };

        match &self.answer {
            NumericalAnswer::Value(answer) => self.grade_value(answer, value, ctx),
            NumericalAnswer::Range {
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            } => grade_range(
                lower,
                upper,
                *lower_inclusive,
                *upper_inclusive,
                value,
                ctx,
            ),
        }
    }

    fn grade_value(&self, answer: &str, value: f64, ctx: &GradeContext<'_>) -> Correctness {
        let mut targets = Vec::with_capacity(1 + self.additional_answers.len());
        targets.push(answer);
        targets.extend(self.additional_answers.iter().map(String::as_str));

        for target in targets {
            // A target that does not evaluate is a content error; grading
            // proceeds with the remaining targets.
            let Ok(target) = eval::evaluate(target, ctx.variables) else {
                tracing::warn!(target, "numerical answer does not evaluate");
                continue;
            };
            if self.tolerance.admits(target, value) {
                return Correctness::Correct;
            }
            if self.partial_credit == Some(PartialCredit::Close)
                && self.tolerance.scaled(CLOSE_FACTOR).admits(target, value)
            {
                return Correctness::PartiallyCorrect {
                    credit: CLOSE_CREDIT,
                };
            }
        }
        Correctness::incorrect()
    }

    pub fn validate(&self) -> Result<(), String> {
        match &self.answer {
            NumericalAnswer::Value(answer) => {
                eval::parse(answer).map_err(|err| format!("answer does not parse: {}", err))?;
            }
            NumericalAnswer::Range { lower, upper, .. } => {
                eval::parse(lower)
                    .map_err(|err| format!("range lower bound does not parse: {}", err))?;
                eval::parse(upper)
                    .map_err(|err| format!("range upper bound does not parse: {}", err))?;
            }
        }
        for additional in &self.additional_answers {
            eval::parse(additional)
                .map_err(|err| format!("additional answer does not parse: {}", err))?;
        }
        Ok(())
    }
}

fn grade_range(
    lower: &str,
    upper: &str,
    lower_inclusive: bool,
    upper_inclusive: bool,
    value: f64,
    ctx: &GradeContext<'_>,
) -> Correctness {
    let (Ok(lower), Ok(upper)) = (
        eval::evaluate(lower, ctx.variables),
        eval::evaluate(upper, ctx.variables),
    ) else {
        tracing::warn!("range bounds do not evaluate");
        return Correctness::Incorrect {
            reason: Some(IncorrectReason::GraderError),
        };
    };

    let above = if lower_inclusive {
        value >= lower
    } else {
        value > lower
    };
    let below = if upper_inclusive {
        value <= upper
    } else {
        value < upper
    };

    if above && below {
        Correctness::Correct
    } else {
        Correctness::incorrect()
    }
}
