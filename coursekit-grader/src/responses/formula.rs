// SPDX-License-Identifier: MIT OR Apache-2.0

//! Formula responses: symbolic equivalence checked by numerical sampling.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::eval::{self, Context};
use crate::grade::{Correctness, GradeContext, IncorrectReason};
use crate::tolerance::Tolerance;

/// Fewest sample points allowed; fewer makes false positives too likely.
pub const MIN_SAMPLES: u32 = 5;

/// Declares the variable domain formulas are sampled over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleSpec {
    pub variables: Vec<String>,

    /// `(low, high)` per variable, parallel to `variables`.
    pub ranges: Vec<(f64, f64)>,

    pub count: u32,
}

impl SampleSpec {
    /// Draw `count` points over the declared domain, deterministically per
    /// seed.
    fn draw(&self, seed: u64) -> Vec<Vec<(String, f64)>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..self.count)
            .map(|_| {
                self.variables
                    .iter()
                    .zip(&self.ranges)
                    .map(|(name, &(low, high))| {
                        let value = if low == high {
                            low
                        } else {
                            rng.random_range(low..high)
                        };
                        (name.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.variables.is_empty() {
            return Err("no sample variables declared".to_owned());
        }
        if self.variables.len() != self.ranges.len() {
            return Err("sample ranges do not match variables".to_owned());
        }
        if self.ranges.iter().any(|&(low, high)| low > high) {
            return Err("sample range is empty".to_owned());
        }
        if self.count < MIN_SAMPLES {
            return Err(format!("at least {} samples required", MIN_SAMPLES));
        }
        Ok(())
    }
}

/// Symbolic-equivalence response. Both the declared answer and the
/// submission are evaluated at the same sampled points; they must agree
/// within the tolerance at every point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormulaResponse {
    pub answer: String,
    pub samples: SampleSpec,

    #[serde(default)]
    pub tolerance: Tolerance,

    /// Whether variable lookup in submissions is case-sensitive.
    #[serde(default)]
    pub case_sensitive: bool,
}

impl FormulaResponse {
    pub fn grade(&self, raw: &str, ctx: &GradeContext<'_>) -> Correctness {
        // Parse once; a submission that does not parse is incorrect with a
        // reason, never a grader fault.
        let submitted = match eval::parse(raw) {
            Ok(expr) => expr,
            Err(_) => {
                return Correctness::Incorrect {
                    reason: Some(IncorrectReason::Unparseable),
                };
            }
        };
        let expected = match eval::parse(&self.answer) {
            Ok(expr) => expr,
            Err(err) => {
                tracing::warn!(answer = %self.answer, %err, "formula answer does not parse");
                return Correctness::Incorrect {
                    reason: Some(IncorrectReason::GraderError),
                };
            }
        };

        for point in self.samples.draw(ctx.sample_seed) {
            // Sample variables shadow template variables of the same name.
            let mut variables = ctx.variables.clone().case_sensitive(self.case_sensitive);
            for (name, value) in &point {
                variables.set(name, *value);
            }

            let expected_value = match eval::evaluate_expr(&expected, &variables) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(answer = %self.answer, %err, "formula answer does not evaluate");
                    return Correctness::Incorrect {
                        reason: Some(IncorrectReason::GraderError),
                    };
                }
            };

            // Submissions over the wrong variables fail here and grade as
            // unparseable input rather than a fault.
            let submitted_value = match eval::evaluate_expr(&submitted, &variables) {
                Ok(value) => value,
                Err(_) => {
                    return Correctness::Incorrect {
                        reason: Some(IncorrectReason::Unparseable),
                    };
                }
            };

            if !self.tolerance.admits(expected_value, submitted_value) {
                return Correctness::incorrect();
            }
        }

        Correctness::Correct
    }

    pub fn validate(&self) -> Result<(), String> {
        eval::parse(&self.answer).map_err(|err| format!("answer does not parse: {}", err))?;
        self.samples.validate()
    }
}
