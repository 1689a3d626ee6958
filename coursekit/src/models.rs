// SPDX-License-Identifier: MIT OR Apache-2.0

//! View models returned to the host.

use chrono::{DateTime, Utc};
use coursekit_core::Score;
use coursekit_core::block::{BlockContent, BlockType};
use coursekit_core::keys::{CourseKey, UsageKey};
use coursekit_grader::{GradingResult, RenderModel, Submission};
use coursekit_grades::CourseGrade;
use coursekit_store::LearnerBlockState;
use serde::{Deserialize, Serialize};

/// Per-block learner state as exposed to the host. The opaque `state`
/// payload and the store's version counter stay internal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub score: Option<Score>,
    pub attempts: u32,
    pub done: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<&LearnerBlockState> for StateSnapshot {
    fn from(state: &LearnerBlockState) -> Self {
        Self {
            score: state.score,
            attempts: state.attempts,
            done: state.done,
            updated_at: state.updated_at,
        }
    }
}

/// Render payload by block type. Problem definitions never leave the core;
/// problems render through the grader's neutral [`RenderModel`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ViewPayload {
    Container,
    Html {
        html: String,
    },
    Video {
        source: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_secs: Option<u32>,
    },
    Problem(RenderModel),
    Unknown {
        data: serde_json::Value,
    },
}

/// The result of a `view` operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub usage_key: UsageKey,
    pub block_type: BlockType,
    pub display_name: String,

    /// Learner-visible ordered children.
    pub children: Vec<UsageKey>,

    pub payload: ViewPayload,

    /// Present when the learner has recorded state on this block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<StateSnapshot>,
}

/// The result of a `submit` operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub usage_key: UsageKey,
    pub result: GradingResult,
    pub state: StateSnapshot,

    /// True when the submission was an identical resubmission and no state
    /// changed.
    pub unchanged: bool,
}

/// One unit row of a `sequence` operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitModel {
    pub usage_key: UsageKey,
    pub display_name: String,
    pub complete: bool,
}

/// The ordered units of one subsection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceModel {
    pub subsection: UsageKey,
    pub display_name: String,
    pub units: Vec<UnitModel>,
}

/// One node of a `course_outline` tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub usage_key: UsageKey,
    pub block_type: BlockType,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineNode>,
}

/// The result of a `progress` operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressModel {
    pub course_key: CourseKey,
    pub grade: CourseGrade,
}

/// The grader's slice of a learner state record, round-tripped through the
/// opaque `state` payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ProblemState {
    pub seed: u64,
    pub last_submission: Submission,
    pub last_result: Option<GradingResult>,
}

impl ProblemState {
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("problem state serializes")
    }
}

pub(crate) fn payload_for(content: &BlockContent) -> ViewPayload {
    match content {
        BlockContent::Course | BlockContent::Container => ViewPayload::Container,
        BlockContent::Html { html } => ViewPayload::Html { html: html.clone() },
        BlockContent::Video {
            source,
            duration_secs,
        } => ViewPayload::Video {
            source: source.clone(),
            duration_secs: *duration_secs,
        },
        // Replaced by a render model at the call site; this arm only covers
        // non-problem fallbacks.
        BlockContent::Problem { .. } => ViewPayload::Unknown {
            data: serde_json::Value::Null,
        },
        BlockContent::Unknown { data } => ViewPayload::Unknown { data: data.clone() },
    }
}
