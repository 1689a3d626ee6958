// SPDX-License-Identifier: MIT OR Apache-2.0

//! Learner identity as seen by the core.
//!
//! The core never talks to an identity system; a learner is an opaque,
//! non-empty identifier handed in by the host.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque learner identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LearnerId(String);

impl LearnerId {
    pub fn new(value: &str) -> Result<Self, LearnerIdError> {
        if value.is_empty() {
            return Err(LearnerIdError::Empty);
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(LearnerIdError::InvalidCharacter);
        }
        Ok(Self(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LearnerId").field(&self.0).finish()
    }
}

impl std::str::FromStr for LearnerId {
    type Err = LearnerIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for LearnerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::new(&value).map_err(serde::de::Error::custom)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LearnerIdError {
    #[error("learner id must not be empty")]
    Empty,

    #[error("learner id contains whitespace or control characters")]
    InvalidCharacter,
}
