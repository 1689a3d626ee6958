// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inputs to the access rule pipeline.
//!
//! Rules are pure functions over these contexts and a clock value; the
//! coordinator resolves stores into contexts before any rule runs, so the
//! pipeline itself never touches I/O.

use std::collections::{BTreeMap, HashSet};

use coursekit_core::block::Block;
use coursekit_core::enrollment::Enrollment;
use coursekit_core::keys::UsageKey;
use coursekit_core::learner::LearnerId;
use coursekit_core::partition::{GroupId, PartitionId};
use coursekit_core::tree::BlockTree;

/// What the learner is trying to do. Submission-only rules (attempt
/// budgets) apply to `Interact` alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// View content.
    Load,
    /// Submit an answer or otherwise mutate block state.
    Interact,
}

/// Everything the rules need to know about the learner, resolved ahead of
/// evaluation.
#[derive(Clone, Debug)]
pub struct LearnerContext {
    pub learner_id: LearnerId,

    /// Course-staff capability, as established by the host.
    pub staff: bool,

    /// Resolved ISO 3166-1 alpha-2 country, when geo-resolution succeeded.
    pub country: Option<String>,

    /// The learner's enrollment in the course, if any.
    pub enrollment: Option<Enrollment>,

    /// Partition-group assignments relevant to the course, resolved lazily
    /// by the partition service before the check.
    pub groups: BTreeMap<PartitionId, GroupId>,

    /// Subsections this learner has completed, for prerequisite checks.
    pub completed: HashSet<UsageKey>,

    /// Prior graded attempts on the block under evaluation.
    pub attempts_used: u32,
}

impl LearnerContext {
    /// A context with nothing resolved: not staff, no enrollment, no
    /// assignments. Useful as a starting point in tests and for anonymous
    /// checks.
    pub fn anonymous(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            staff: false,
            country: None,
            enrollment: None,
            groups: BTreeMap::new(),
            completed: HashSet::new(),
            attempts_used: 0,
        }
    }
}

/// The block under evaluation, with its tree for ancestor lookups.
#[derive(Clone, Copy, Debug)]
pub struct BlockContext<'a> {
    pub tree: &'a BlockTree,
    pub block: &'a Block,
}

impl<'a> BlockContext<'a> {
    pub fn new(tree: &'a BlockTree, block: &'a Block) -> Self {
        Self { tree, block }
    }

    pub fn usage_key(&self) -> &UsageKey {
        &self.block.usage_key
    }
}
