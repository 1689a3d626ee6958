// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multiple-choice and option-select responses.

use serde::{Deserialize, Serialize};

use crate::grade::Correctness;

/// One choice of a multiple-choice response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

/// Single-select multiple choice. The submission is a choice id; it is
/// correct iff that id is in the correct set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoiceResponse {
    pub choices: Vec<Choice>,

    /// Present choices in a seed-dependent order.
    #[serde(default)]
    pub shuffle: bool,
}

impl MultipleChoiceResponse {
    pub fn grade(&self, raw: &str) -> Correctness {
        let submitted = raw.trim();
        match self.choices.iter().find(|choice| choice.id == submitted) {
            Some(choice) if choice.correct => Correctness::Correct,
            Some(_) => Correctness::incorrect(),
            // An id outside the declared set is an invalid submission, not
            // a grader fault.
            None => Correctness::incorrect(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.choices.is_empty() {
            return Err("no choices declared".to_owned());
        }
        if !self.choices.iter().any(|choice| choice.correct) {
            return Err("no correct choice declared".to_owned());
        }
        let mut ids: Vec<&str> = self.choices.iter().map(|choice| choice.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.choices.len() {
            return Err("duplicate choice id".to_owned());
        }
        Ok(())
    }
}

/// A drop-down of plain string options with exactly one correct value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionResponse {
    pub options: Vec<String>,
    pub correct: String,
}

impl OptionResponse {
    pub fn grade(&self, raw: &str) -> Correctness {
        if raw.trim() == self.correct {
            Correctness::Correct
        } else {
            Correctness::incorrect()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.options.is_empty() {
            return Err("no options declared".to_owned());
        }
        if !self.options.contains(&self.correct) {
            return Err("correct value is not among the options".to_owned());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::grade::Correctness;

    use super::{Choice, MultipleChoiceResponse, OptionResponse};

    fn two_choices() -> MultipleChoiceResponse {
        MultipleChoiceResponse {
            choices: vec![
                Choice {
                    id: "a".to_owned(),
                    text: "Yes".to_owned(),
                    correct: true,
                },
                Choice {
                    id: "b".to_owned(),
                    text: "No".to_owned(),
                    correct: false,
                },
            ],
            shuffle: false,
        }
    }

    #[test]
    fn correct_choice_id() {
        let response = two_choices();
        assert_eq!(response.grade("a"), Correctness::Correct);
        assert_eq!(response.grade("b"), Correctness::incorrect());
        assert_eq!(response.grade("zzz"), Correctness::incorrect());
    }

    #[test]
    fn validation_requires_a_correct_choice() {
        let mut response = two_choices();
        response.choices[0].correct = false;
        assert!(response.validate().is_err());
    }

    #[test]
    fn option_select_matches_exactly() {
        let response = OptionResponse {
            options: vec!["red".to_owned(), "blue".to_owned()],
            correct: "blue".to_owned(),
        };
        assert_eq!(response.grade("blue"), Correctness::Correct);
        assert_eq!(response.grade("Blue"), Correctness::incorrect());
        assert_eq!(response.grade("red"), Correctness::incorrect());
    }
}
