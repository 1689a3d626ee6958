// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access decisions and denial reasons.

use chrono::{DateTime, Utc};
use coursekit_core::enrollment::EnrollmentMode;
use coursekit_core::keys::UsageKey;
use coursekit_core::partition::PartitionId;
use serde::Serialize;

/// Outcome of an access check: allowed, or denied with a typed reason the
/// host can turn into an actionable message and status code.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            AccessDecision::Allow => None,
            AccessDecision::Deny(reason) => Some(reason),
        }
    }
}

/// The closed set of denial reasons, each carrying the context the host
/// needs to render a useful message.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
    /// The course or block does not exist or is unpublished.
    NotFound,

    /// The block has not been released yet.
    NotStarted { start: DateTime<Utc> },

    /// The course has ended; interaction is closed.
    Ended { end: DateTime<Utc> },

    /// No active enrollment.
    NotEnrolled,

    /// The enrollment mode does not satisfy the block's requirement.
    WrongMode {
        required: Vec<EnrollmentMode>,
        actual: EnrollmentMode,
    },

    /// A required subsection has not been completed.
    PrerequisiteIncomplete { prerequisite: UsageKey },

    /// The learner's group assignment does not satisfy the block's
    /// partition restriction.
    PartitionRestricted { partition: PartitionId },

    /// The learner's resolved country is blocked for this course.
    Embargoed,

    /// The per-block attempt budget is exhausted.
    AttemptsExhausted { used: u32, max: u32 },

    /// The block is visible to course staff only.
    StaffOnly,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::NotFound => write!(f, "content not found"),
            DenyReason::NotStarted { start } => {
                write!(f, "content is available from {}", start.to_rfc3339())
            }
            DenyReason::Ended { end } => {
                write!(f, "the course ended on {}", end.to_rfc3339())
            }
            DenyReason::NotEnrolled => write!(f, "enrollment required"),
            DenyReason::WrongMode { required, .. } => {
                let names: Vec<&str> = required.iter().map(|mode| mode.as_str()).collect();
                write!(f, "requires enrollment mode {}", names.join(" or "))
            }
            DenyReason::PrerequisiteIncomplete { prerequisite } => {
                write!(f, "complete {} first", prerequisite)
            }
            DenyReason::PartitionRestricted { partition } => {
                write!(f, "content is not available to your group (partition {})", partition)
            }
            DenyReason::Embargoed => write!(f, "content is not available in your region"),
            DenyReason::AttemptsExhausted { used, max } => {
                write!(f, "attempts exhausted: {}/{}", used, max)
            }
            DenyReason::StaffOnly => write!(f, "content is available to course staff only"),
        }
    }
}
