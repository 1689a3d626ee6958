// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces of the persistence layers the core requires.
//!
//! Implementations decide where the data lives; the in-memory stores in this
//! crate are the reference. Every trait has an associated error type that
//! converts into [`StoreError`] at the coordinator boundary, so hosts can
//! plug in fallible backends without the core knowing their failure shapes.

use std::collections::HashMap;
use std::sync::Arc;

use coursekit_core::enrollment::Enrollment;
use coursekit_core::keys::{CourseKey, UsageKey};
use coursekit_core::learner::LearnerId;
use coursekit_core::partition::{GroupId, PartitionId};
use coursekit_core::tree::BlockTree;
use thiserror::Error;

use crate::state::{LearnerBlockState, StateDraft};

/// Store failures as the coordinator sees them.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The course or block is absent or unpublished.
    #[error("not found")]
    NotFound,

    /// I/O failure in the backing store.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Optimistic-lock conflict not resolved within the retry budget.
    #[error("write conflict after retries")]
    Conflict,
}

/// Read access to published course content.
pub trait BlockStore: Send + Sync {
    type Error: std::error::Error + Into<StoreError> + Send + Sync + 'static;

    /// The published tree of a course, or `None` when the course is absent
    /// or unpublished. The full tree is returned; depth truncation is a view
    /// concern.
    fn get_course(
        &self,
        course_key: &CourseKey,
    ) -> impl Future<Output = Result<Option<Arc<BlockTree>>, Self::Error>> + Send;

    /// A single block, or `None` when the block or its course is absent.
    fn get_block(
        &self,
        usage_key: &UsageKey,
    ) -> impl Future<Output = Result<Option<coursekit_core::block::Block>, Self::Error>> + Send;
}

/// Durable per-(learner, block) state.
///
/// `update` is a read-modify-write with the effect that no two calls for the
/// same `(learner, usage_key)` interleave their windows; the update function
/// must be pure because conflicted writes re-run it.
pub trait LearnerStateStore: Send + Sync {
    type Error: std::error::Error + Into<StoreError> + Send + Sync + 'static;

    fn get(
        &self,
        learner_id: &LearnerId,
        usage_key: &UsageKey,
    ) -> impl Future<Output = Result<Option<LearnerBlockState>, Self::Error>> + Send;

    /// Fetch many records in a single round-trip. Missing records are simply
    /// absent from the result map.
    fn get_many(
        &self,
        learner_id: &LearnerId,
        usage_keys: &[UsageKey],
    ) -> impl Future<Output = Result<HashMap<UsageKey, LearnerBlockState>, Self::Error>> + Send;

    /// Apply a pure update function to the record, creating it when absent.
    /// Returns the record as written.
    fn update<F>(
        &self,
        learner_id: &LearnerId,
        usage_key: &UsageKey,
        f: F,
    ) -> impl Future<Output = Result<LearnerBlockState, Self::Error>> + Send
    where
        F: Fn(Option<&LearnerBlockState>) -> StateDraft + Send + Sync;

    /// Record completion of a block, preserving all other state.
    fn mark_done(
        &self,
        learner_id: &LearnerId,
        usage_key: &UsageKey,
    ) -> impl Future<Output = Result<LearnerBlockState, Self::Error>> + Send {
        self.update(learner_id, usage_key, |prior| {
            let mut draft = StateDraft::from_prior(prior);
            draft.done = true;
            draft
        })
    }
}

/// Course enrollments, at most one per `(learner, course)`.
pub trait EnrollmentStore: Send + Sync {
    type Error: std::error::Error + Into<StoreError> + Send + Sync + 'static;

    fn enrollment(
        &self,
        learner_id: &LearnerId,
        course_key: &CourseKey,
    ) -> impl Future<Output = Result<Option<Enrollment>, Self::Error>> + Send;
}

/// Persisted partition-group assignments.
pub trait GroupAssignmentStore: Send + Sync {
    type Error: std::error::Error + Into<StoreError> + Send + Sync + 'static;

    fn assignment(
        &self,
        learner_id: &LearnerId,
        course_key: &CourseKey,
        partition_id: PartitionId,
    ) -> impl Future<Output = Result<Option<GroupId>, Self::Error>> + Send;

    /// Persist an assignment under the uniqueness constraint on
    /// `(learner, course, partition)`. Returns the stored value: the given
    /// group when this call won, or the earlier winner when another call got
    /// there first.
    fn insert_if_absent(
        &self,
        learner_id: &LearnerId,
        course_key: &CourseKey,
        partition_id: PartitionId,
        group_id: GroupId,
    ) -> impl Future<Output = Result<GroupId, Self::Error>> + Send;

    /// Overwrite an assignment. Used only for deterministic reassignment
    /// when the assigned group has disappeared from the partition, and by
    /// administrative tooling.
    fn replace(
        &self,
        learner_id: &LearnerId,
        course_key: &CourseKey,
        partition_id: PartitionId,
        group_id: GroupId,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
