// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures for integration tests: in-memory stores wired into a
//! coordinator, with a recording sink for event assertions.

use std::sync::Arc;

use coursekit_core::enrollment::EnrollmentMode;
use coursekit_core::events::RecordingSink;
use coursekit_core::keys::CourseKey;
use coursekit_core::learner::LearnerId;
use coursekit_core::settings::Settings;
use coursekit_core::tree::{BlockTree, RawTree};
use coursekit_store::memory::{
    MemoryAssignmentStore, MemoryBlockStore, MemoryEnrollmentStore, MemoryStateStore,
};

use crate::coordinator::{Coordinator, RequestContext};

pub use coursekit_core::test_utils::CourseBuilder;

/// Everything a coordinator test needs, with handles kept on the raw stores
/// so tests can arrange state directly.
pub struct World {
    pub blocks: MemoryBlockStore,
    pub state: MemoryStateStore,
    pub enrollments: MemoryEnrollmentStore,
    pub assignments: MemoryAssignmentStore,
    pub sink: RecordingSink,
    pub coordinator:
        Coordinator<MemoryBlockStore, MemoryStateStore, MemoryEnrollmentStore, MemoryAssignmentStore>,
}

impl World {
    pub fn new(settings: Settings) -> Self {
        let blocks = MemoryBlockStore::new();
        let state = MemoryStateStore::new(settings.write_retry);
        let enrollments = MemoryEnrollmentStore::new();
        let assignments = MemoryAssignmentStore::new();
        let sink = RecordingSink::new();

        let coordinator = Coordinator::new(
            blocks.clone(),
            state.clone(),
            enrollments.clone(),
            assignments.clone(),
            settings,
        )
        .with_sink(Arc::new(sink.clone()));

        Self {
            blocks,
            state,
            enrollments,
            assignments,
            sink,
            coordinator,
        }
    }

    pub fn publish(&self, tree: BlockTree) {
        self.blocks
            .publish(RawTree::from(tree))
            .expect("fixture trees are valid");
    }

    pub fn enroll(&self, learner: &str, course: &str, mode: EnrollmentMode) {
        let learner: LearnerId = learner.parse().expect("valid learner id literal");
        let course: CourseKey = course.parse().expect("valid course key literal");
        self.enrollments.enroll(&learner, &course, mode);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

/// A plain learner request.
pub fn request(learner: &str) -> RequestContext {
    RequestContext::new(learner.parse().expect("valid learner id literal"))
}

/// Route `tracing` output to the test harness. Safe to call repeatedly.
#[cfg(feature = "test_utils")]
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
