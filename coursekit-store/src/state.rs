// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable per-(learner, block) state records.

use chrono::{DateTime, Utc};
use coursekit_core::Score;
use serde::{Deserialize, Serialize};

/// The per-(learner, block) record owned by the learner state store.
///
/// `state` is opaque to the core; the grader round-trips its problem state
/// through it. `version` backs the store's optimistic concurrency check and
/// is never exposed to callers for mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearnerBlockState {
    pub state: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub done: bool,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl LearnerBlockState {
    /// A fresh record as created on first write.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            state: serde_json::Value::Null,
            score: None,
            attempts: 0,
            done: false,
            version: 0,
            updated_at: now,
        }
    }
}

/// The fields a state update may change. Returned by the pure update
/// function passed to `LearnerStateStore::update`; the store owns `version`
/// and `updated_at`.
#[derive(Clone, Debug, PartialEq)]
pub struct StateDraft {
    pub state: serde_json::Value,
    pub score: Option<Score>,
    pub attempts: u32,
    pub done: bool,
}

impl StateDraft {
    /// Start a draft from the prior record, or empty fields when the learner
    /// has no state yet.
    pub fn from_prior(prior: Option<&LearnerBlockState>) -> Self {
        match prior {
            Some(prior) => Self {
                state: prior.state.clone(),
                score: prior.score,
                attempts: prior.attempts,
                done: prior.done,
            },
            None => Self {
                state: serde_json::Value::Null,
                score: None,
                attempts: 0,
                done: false,
            },
        }
    }
}
