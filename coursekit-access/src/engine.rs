// SPDX-License-Identifier: MIT OR Apache-2.0

//! The rule pipeline.

use chrono::{DateTime, Utc};
use coursekit_core::keys::UsageKey;
use coursekit_core::tree::BlockTree;

use crate::context::{Action, BlockContext, LearnerContext};
use crate::decision::{AccessDecision, DenyReason};
use crate::rules::{self, Rule};

/// Rules in their fixed evaluation order. Existence and the staff override
/// are handled in [`check_access`] before this table is consulted.
const RULES: [Rule; 5] = [
    rules::visibility,
    rules::enrollment,
    rules::prerequisite,
    rules::partition,
    rules::embargo,
];

/// Evaluate the full rule stack for a learner and block.
///
/// Evaluation short-circuits on the first denial. Course staff bypass every
/// rule except existence. The attempt-budget rule runs last and only for
/// [`Action::Interact`].
pub fn check_access(
    tree: &BlockTree,
    usage_key: &UsageKey,
    learner: &LearnerContext,
    action: Action,
    now: DateTime<Utc>,
) -> AccessDecision {
    // Rule 1: existence. The tree only contains published blocks.
    let Some(block) = tree.get(usage_key) else {
        return AccessDecision::Deny(DenyReason::NotFound);
    };

    // Rule 2: staff override.
    if learner.staff {
        return AccessDecision::Allow;
    }

    let block_ctx = BlockContext::new(tree, block);

    let denied = RULES
        .iter()
        .chain(std::iter::once(&(rules::attempts as Rule)))
        .find_map(|rule| {
            rule(learner, &block_ctx, action, now)
                .deny_reason()
                .cloned()
        });

    match denied {
        Some(reason) => AccessDecision::Deny(reason),
        None => AccessDecision::Allow,
    }
}
