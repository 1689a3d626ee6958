// SPDX-License-Identifier: MIT OR Apache-2.0

//! String responses: exact or regex matching.

use serde::{Deserialize, Serialize};

use crate::grade::Correctness;

/// One accepted answer: a literal or a regular expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringAnswer {
    Text(String),
    Pattern { regex: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StringResponse {
    /// Accepted answers; any match grades correct.
    pub answers: Vec<StringAnswer>,

    #[serde(default)]
    pub case_sensitive: bool,
}

impl StringResponse {
    pub fn grade(&self, raw: &str) -> Correctness {
        let submitted = raw.trim();
        for answer in &self.answers {
            let matched = match answer {
                StringAnswer::Text(text) => {
                    if self.case_sensitive {
                        submitted == text
                    } else {
                        submitted.eq_ignore_ascii_case(text)
                    }
                }
                StringAnswer::Pattern { regex } => match self.build(regex) {
                    Some(compiled) => compiled.is_match(submitted),
                    None => {
                        tracing::warn!(regex, "string answer pattern does not compile");
                        false
                    }
                },
            };
            if matched {
                return Correctness::Correct;
            }
        }
        Correctness::incorrect()
    }

    fn build(&self, pattern: &str) -> Option<regex::Regex> {
        regex::RegexBuilder::new(pattern)
            .case_insensitive(!self.case_sensitive)
            .build()
            .ok()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.answers.is_empty() {
            return Err("no accepted answers declared".to_owned());
        }
        for answer in &self.answers {
            if let StringAnswer::Pattern { regex } = answer {
                self.build(regex)
                    .ok_or_else(|| format!("pattern does not compile: {:?}", regex))?;
            }
        }
        Ok(())
    }
}
