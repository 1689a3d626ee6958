// SPDX-License-Identifier: MIT OR Apache-2.0

//! The individual access rules.
//!
//! Each rule is a pure function of `(learner, block, action, now)` returning
//! [`AccessDecision`]; rules never write and never raise. The fixed
//! evaluation order lives in [`crate::engine`].

use chrono::{DateTime, Utc};
use coursekit_core::block::Block;

use crate::context::{Action, BlockContext, LearnerContext};
use crate::decision::{AccessDecision, DenyReason};

pub type Rule = fn(&LearnerContext, &BlockContext<'_>, Action, DateTime<Utc>) -> AccessDecision;

/// Not staff-only, released, and inside the course window.
pub fn visibility(
    _learner: &LearnerContext,
    block: &BlockContext<'_>,
    action: Action,
    now: DateTime<Utc>,
) -> AccessDecision {
    if block.tree.effective_staff_only(block.usage_key()) {
        return AccessDecision::Deny(DenyReason::StaffOnly);
    }

    let start = block.tree.effective_start(block.usage_key());
    if !Block::is_released(start, now) {
        // `is_released` only fails when a start date exists.
        let start = start.expect("unreleased block has a start date");
        return AccessDecision::Deny(DenyReason::NotStarted { start });
    }

    // Content stays viewable after a course ends; interaction closes.
    if action == Action::Interact {
        if let Some(end) = block.tree.config().end {
            if now > end {
                return AccessDecision::Deny(DenyReason::Ended { end });
            }
        }
    }

    AccessDecision::Allow
}

/// An active enrollment exists and satisfies any mode gate on the block.
pub fn enrollment(
    learner: &LearnerContext,
    block: &BlockContext<'_>,
    _action: Action,
    _now: DateTime<Utc>,
) -> AccessDecision {
    let Some(enrollment) = learner.enrollment.as_ref().filter(|e| e.active) else {
        return AccessDecision::Deny(DenyReason::NotEnrolled);
    };

    let required = &block.block.fields.required_modes;
    if !required.is_empty() && !required.contains(&enrollment.mode) {
        return AccessDecision::Deny(DenyReason::WrongMode {
            required: required.clone(),
            actual: enrollment.mode,
        });
    }

    AccessDecision::Allow
}

/// Configured prerequisite subsections are complete. A prerequisite on a
/// subsection gates everything nested inside it, so ancestors are checked
/// too.
pub fn prerequisite(
    learner: &LearnerContext,
    block: &BlockContext<'_>,
    _action: Action,
    _now: DateTime<Utc>,
) -> AccessDecision {
    let mut chain = vec![block.block];
    chain.extend(block.tree.ancestors_of(block.usage_key()));

    for node in chain {
        for required in &node.fields.prerequisites {
            if !learner.completed.contains(required) {
                return AccessDecision::Deny(DenyReason::PrerequisiteIncomplete {
                    prerequisite: required.clone(),
                });
            }
        }
    }
    AccessDecision::Allow
}

/// Group assignments satisfy `group_access` on the block and all ancestors.
pub fn partition(
    learner: &LearnerContext,
    block: &BlockContext<'_>,
    _action: Action,
    _now: DateTime<Utc>,
) -> AccessDecision {
    let mut chain = vec![block.block];
    chain.extend(block.tree.ancestors_of(block.usage_key()));

    for node in chain {
        for (partition, allowed) in node.fields.group_access.partitions() {
            let satisfied = learner
                .groups
                .get(partition)
                .map(|group| allowed.contains(group))
                .unwrap_or(false);
            if !satisfied {
                return AccessDecision::Deny(DenyReason::PartitionRestricted {
                    partition: *partition,
                });
            }
        }
    }
    AccessDecision::Allow
}

/// The learner's resolved country is not blocked for the course.
pub fn embargo(
    learner: &LearnerContext,
    block: &BlockContext<'_>,
    _action: Action,
    _now: DateTime<Utc>,
) -> AccessDecision {
    match &block.tree.config().embargo {
        Some(config) if !config.allows(learner.country.as_deref()) => {
            AccessDecision::Deny(DenyReason::Embargoed)
        }
        _ => AccessDecision::Allow,
    }
}

/// Per-block attempt budget, for submissions only.
pub fn attempts(
    learner: &LearnerContext,
    block: &BlockContext<'_>,
    action: Action,
    _now: DateTime<Utc>,
) -> AccessDecision {
    if action != Action::Interact {
        return AccessDecision::Allow;
    }
    if let Some(max) = block.block.fields.max_attempts {
        if learner.attempts_used >= max {
            return AccessDecision::Deny(DenyReason::AttemptsExhausted {
                used: learner.attempts_used,
                max,
            });
        }
    }
    AccessDecision::Allow
}
