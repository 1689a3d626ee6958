// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed problem definitions.
//!
//! A problem declares one or more responses, each with an accepted-answer
//! specification and an optional point value. Definitions arrive from the
//! block store as opaque JSON and are deserialized here; the closed set of
//! response kinds is fixed at build time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::responses::Response;

/// Identifies one response (input) within a problem.
pub type AnswerId = String;

/// A learner's submission: raw input text per answer id.
pub type Submission = std::collections::BTreeMap<AnswerId, String>;

/// A randomized template variable, sampled uniformly per seed and available
/// in answer expressions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

/// One response entry of a problem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseDef {
    pub id: AnswerId,

    /// Points this response is worth.
    #[serde(default = "default_points")]
    pub points: f64,

    #[serde(flatten)]
    pub response: Response,
}

fn default_points() -> f64 {
    1.0
}

/// A full problem definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProblemDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// A problem with zero responses scores `(0, 0)` and counts as not
    /// attempted.
    #[serde(default)]
    pub responses: Vec<ResponseDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableDef>,
}

impl ProblemDefinition {
    /// Deserialize a definition from the opaque JSON carried on a problem
    /// block.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ProblemError> {
        let definition: Self = serde_json::from_value(value.clone())
            .map_err(|err| ProblemError::Malformed(err.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Structural validation beyond what serde enforces.
    pub fn validate(&self) -> Result<(), ProblemError> {
        let mut ids: Vec<&str> = self.responses.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.responses.len() {
            return Err(ProblemError::DuplicateAnswerId);
        }

        for response in &self.responses {
            if response.points < 0.0 {
                return Err(ProblemError::NegativePoints(response.id.clone()));
            }
            response.response.validate().map_err(|message| {
                ProblemError::InvalidResponse {
                    id: response.id.clone(),
                    message,
                }
            })?;
        }

        for variable in &self.variables {
            if variable.min > variable.max {
                return Err(ProblemError::EmptyVariableRange(variable.name.clone()));
            }
        }

        Ok(())
    }

    /// Total points possible.
    pub fn possible(&self) -> f64 {
        self.responses.iter().map(|r| r.points).sum()
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ProblemError {
    #[error("problem definition does not deserialize: {0}")]
    Malformed(String),

    #[error("duplicate answer id")]
    DuplicateAnswerId,

    #[error("response {0} has negative points")]
    NegativePoints(AnswerId),

    #[error("response {id} is invalid: {message}")]
    InvalidResponse { id: AnswerId, message: String },

    #[error("variable {0} has an empty range")]
    EmptyVariableRange(String),
}
