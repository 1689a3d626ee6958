// SPDX-License-Identifier: MIT OR Apache-2.0

//! The closed set of response kinds and their grading functions.
//!
//! Each kind owns its accepted-answer declaration and knows how to grade a
//! raw submission string against it. Dispatch is a match on the sum type;
//! there is no runtime registration.

mod choice;
mod custom;
mod formula;
mod numerical;
mod string;

use serde::{Deserialize, Serialize};

pub use choice::{Choice, MultipleChoiceResponse, OptionResponse};
pub use custom::CustomResponse;
pub use formula::{FormulaResponse, SampleSpec};
pub use numerical::{NumericalAnswer, NumericalResponse, PartialCredit};
pub use string::{StringAnswer, StringResponse};

use crate::grade::{Correctness, GradeContext};

/// One response declaration, by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    MultipleChoice(MultipleChoiceResponse),
    OptionSelect(OptionResponse),
    Numerical(NumericalResponse),
    Formula(FormulaResponse),
    String(StringResponse),
    Custom(CustomResponse),
}

impl Response {
    /// Grade a non-blank submission. Blank handling happens upstream.
    pub fn grade(&self, raw: &str, ctx: &GradeContext<'_>) -> Correctness {
        match self {
            Response::MultipleChoice(response) => response.grade(raw),
            Response::OptionSelect(response) => response.grade(raw),
            Response::Numerical(response) => response.grade(raw, ctx),
            Response::Formula(response) => response.grade(raw, ctx),
            Response::String(response) => response.grade(raw),
            Response::Custom(response) => response.grade(raw, ctx),
        }
    }

    /// Declaration-level validation; returns a message naming the defect.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Response::MultipleChoice(response) => response.validate(),
            Response::OptionSelect(response) => response.validate(),
            Response::Numerical(response) => response.validate(),
            Response::Formula(response) => response.validate(),
            Response::String(response) => response.validate(),
            Response::Custom(response) => response.validate(),
        }
    }
}
