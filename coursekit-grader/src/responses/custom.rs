// SPDX-License-Identifier: MIT OR Apache-2.0

//! Custom responses: an author-supplied check program run in the sandbox.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::eval::{self, Context};
use crate::grade::{Correctness, GradeContext, IncorrectReason};

/// Name under which the submitted value is visible to check programs.
pub const ANSWER_VARIABLE: &str = "ans";

/// An author-supplied check expression.
///
/// The program sees the submission as the variable `ans` (evaluated as an
/// expression first, so `2^3` arrives as `8`) alongside the problem's
/// template variables. A non-zero result grades correct.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomResponse {
    pub check: String,
}

impl CustomResponse {
    pub fn grade(&self, raw: &str, ctx: &GradeContext<'_>) -> Correctness {
        // The submission itself is evaluated outside the sandbox budget; it
        // went through the same parser every numerical response uses.
        let submitted = match eval::evaluate(raw, ctx.variables) {
            Ok(value) => value,
            Err(_) => {
                return Correctness::Incorrect {
                    reason: Some(IncorrectReason::Unparseable),
                };
            }
        };

        let mut program_ctx: Context = ctx.variables.clone();
        program_ctx.set(ANSWER_VARIABLE, submitted);

        match ctx.sandbox.run(&self.check, &program_ctx) {
            Ok(result) if result != 0.0 => Correctness::Correct,
            Ok(_) => Correctness::incorrect(),
            Err(err) => {
                // Sandbox faults never propagate; they grade incorrect and
                // are reported in telemetry.
                warn!(%err, "custom check program failed");
                Correctness::Incorrect {
                    reason: Some(IncorrectReason::GraderError),
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        eval::parse(&self.check)
            .map(|_| ())
            .map_err(|err| format!("check program does not parse: {}", err))
    }
}
