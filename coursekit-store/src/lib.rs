// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store interfaces and in-memory implementations for coursekit.
//!
//! Four persistence concerns back the courseware core: published block
//! trees, per-(learner, block) state, enrollments, and partition-group
//! assignments. Each is a trait in [`traits`] with an in-memory reference
//! implementation in [`memory`]. Per-learner filtering over trees is a pure
//! overlay in [`overlay`], and [`cache::TreeCache`] memoises tree fetches
//! within a single request.
//!
//! Writes to learner state are serialized per `(learner, usage_key)` via an
//! optimistic version check with bounded retries; see
//! [`memory::MemoryStateStore`].

pub mod cache;
pub mod memory;
pub mod overlay;
pub mod state;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod traits;

pub use cache::TreeCache;
pub use overlay::{LearnerView, is_visible, visible_children, visible_subtree};
pub use state::{LearnerBlockState, StateDraft};
pub use traits::{
    BlockStore, EnrollmentStore, GroupAssignmentStore, LearnerStateStore, StoreError,
};
