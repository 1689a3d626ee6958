// SPDX-License-Identifier: MIT OR Apache-2.0

//! Neutral render models for prepared problems.
//!
//! The core does not render HTML; it describes the inputs a host should
//! present, in display order, together with any prior values and outcomes.

use serde::{Deserialize, Serialize};

use crate::grade::{Correctness, GradingResult};
use crate::prepare::PreparedProblem;
use crate::problem::{AnswerId, Submission};
use crate::responses::Response;

/// What kind of input widget a response needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum InputModel {
    /// A list of labelled choices, in display order.
    Choices { choices: Vec<ChoiceModel> },

    /// A drop-down of plain options.
    Options { options: Vec<String> },

    /// A free-text line.
    Textline,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChoiceModel {
    pub id: String,
    pub text: String,
}

/// One response as the host should present it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseModel {
    pub answer_id: AnswerId,
    pub points: f64,

    #[serde(flatten)]
    pub input: InputModel,

    /// The learner's previous submission for this input, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<String>,

    /// Outcome of the last grading, if the problem has been graded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correctness: Option<Correctness>,
}

/// A prepared problem as the host should present it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub responses: Vec<ResponseModel>,
}

/// Describe a prepared problem, folding in prior state when the learner has
/// some.
pub fn render(
    prepared: &PreparedProblem,
    prior_submission: Option<&Submission>,
    prior_result: Option<&GradingResult>,
) -> RenderModel {
    let responses = prepared
        .definition()
        .responses
        .iter()
        .map(|response| {
            let input = match &response.response {
                Response::MultipleChoice(mc) => InputModel::Choices {
                    choices: prepared
                        .display_choices(&response.id, &mc.choices)
                        .into_iter()
                        .map(|choice| ChoiceModel {
                            id: choice.id.clone(),
                            text: choice.text.clone(),
                        })
                        .collect(),
                },
                Response::OptionSelect(options) => InputModel::Options {
                    options: options.options.clone(),
                },
                Response::Numerical(_)
                | Response::Formula(_)
                | Response::String(_)
                | Response::Custom(_) => InputModel::Textline,
            };

            ResponseModel {
                answer_id: response.id.clone(),
                points: response.points,
                input,
                current_value: prior_submission
                    .and_then(|submission| submission.get(&response.id))
                    .cloned(),
                correctness: prior_result
                    .and_then(|result| result.correctness.get(&response.id))
                    .copied(),
            }
        })
        .collect();

    RenderModel {
        prompt: prepared.definition().prompt.clone(),
        responses,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::grade::grade;
    use crate::prepare::prepare;
    use crate::problem::{ProblemDefinition, Submission};
    use crate::sandbox::Sandbox;

    use super::{InputModel, render};

    #[test]
    fn describes_inputs_and_prior_state() {
        let definition = ProblemDefinition::from_json(&json!({
            "prompt": "Answer both.",
            "responses": [
                {
                    "id": "r1",
                    "type": "multiple_choice",
                    "choices": [
                        {"id": "a", "text": "A", "correct": true},
                        {"id": "b", "text": "B"},
                    ],
                },
                {"id": "r2", "type": "numerical", "answer": "42"},
            ],
        }))
        .unwrap();

        let prepared = prepare(&definition, 5);

        // Fresh render: no values, no outcomes.
        let model = render(&prepared, None, None);
        assert_eq!(model.prompt.as_deref(), Some("Answer both."));
        assert_eq!(model.responses.len(), 2);
        assert!(model.responses[0].current_value.is_none());
        assert!(matches!(model.responses[1].input, InputModel::Textline));

        // After a submission the render model echoes values and outcomes.
        let submission: Submission = [
            ("r1".to_owned(), "b".to_owned()),
            ("r2".to_owned(), "42".to_owned()),
        ]
        .into_iter()
        .collect();
        let result = grade(&prepared, &submission, Sandbox::for_tests());

        let model = render(&prepared, Some(&submission), Some(&result));
        assert_eq!(model.responses[0].current_value.as_deref(), Some("b"));
        assert!(!model.responses[0].correctness.unwrap().is_correct());
        assert!(model.responses[1].correctness.unwrap().is_correct());
    }
}
