// SPDX-License-Identifier: MIT OR Apache-2.0

//! Grading a submission against a prepared problem.

use std::collections::BTreeMap;

use coursekit_core::Score;
use serde::{Deserialize, Serialize};

use crate::eval::Context;
use crate::prepare::PreparedProblem;
use crate::problem::{AnswerId, Submission};
use crate::sandbox::Sandbox;

/// Why an answer graded incorrect, when the cause is more specific than a
/// wrong value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncorrectReason {
    /// Empty or whitespace-only input.
    Blank,

    /// The input did not parse as the expected form.
    Unparseable,

    /// The grader itself faulted; logged, never propagated.
    GraderError,
}

/// Per-answer grading outcome.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "correctness", rename_all = "snake_case")]
pub enum Correctness {
    Correct,
    PartiallyCorrect {
        /// Fraction of the response's points earned, in `(0, 1)`.
        credit: f64,
    },
    Incorrect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<IncorrectReason>,
    },
}

impl Correctness {
    /// Plain incorrectness, no specific reason.
    pub fn incorrect() -> Self {
        Correctness::Incorrect { reason: None }
    }

    /// Fraction of points earned.
    pub fn credit(&self) -> f64 {
        match self {
            Correctness::Correct => 1.0,
            Correctness::PartiallyCorrect { credit } => *credit,
            Correctness::Incorrect { .. } => 0.0,
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, Correctness::Correct)
    }
}

/// Everything a response grading function may consult.
pub struct GradeContext<'a> {
    /// Template variables of the prepared problem.
    pub variables: &'a Context,

    /// Seed for formula sampling; fixed per prepared problem so grading is
    /// deterministic.
    pub sample_seed: u64,

    /// Budgeted evaluator for custom check programs.
    pub sandbox: Sandbox,
}

/// The outcome of grading one submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub correctness: BTreeMap<AnswerId, Correctness>,
    pub score: Score,
}

impl GradingResult {
    pub fn is_perfect(&self) -> bool {
        self.correctness.values().all(Correctness::is_correct)
    }
}

/// Grade a submission against a prepared problem.
///
/// Deterministic given `(prepared, submission)`: the same inputs always
/// produce the same result. Blank answers grade incorrect; a problem with
/// zero responses scores `(0, 0)`.
pub fn grade(prepared: &PreparedProblem, submission: &Submission, sandbox: Sandbox) -> GradingResult {
    let variables = prepared.variable_context();
    let ctx = GradeContext {
        variables: &variables,
        sample_seed: prepared.sample_seed(),
        sandbox,
    };

    let mut correctness = BTreeMap::new();
    let mut earned = 0.0;
    let mut possible = 0.0;

    for response in &prepared.definition().responses {
        possible += response.points;

        let raw = submission
            .get(&response.id)
            .map(String::as_str)
            .unwrap_or("");
        let outcome = if raw.trim().is_empty() {
            Correctness::Incorrect {
                reason: Some(IncorrectReason::Blank),
            }
        } else {
            response.response.grade(raw, &ctx)
        };

        earned += response.points * outcome.credit();
        correctness.insert(response.id.clone(), outcome);
    }

    GradingResult {
        correctness,
        score: Score::new(earned, possible),
    }
}
