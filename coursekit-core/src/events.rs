// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracking events emitted by the core.
//!
//! The host decides where events go (tracking log, analytics bus, nowhere).
//! Emission is fire-and-forget; no core behaviour depends on a sink's
//! side effects.

use serde::Serialize;

use crate::keys::{CourseKey, UsageKey};
use crate::learner::LearnerId;
use crate::partition::{GroupId, PartitionId};
use crate::score::Score;

/// Events the core reports to the host's tracking sink.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum TrackingEvent {
    /// A learner received their first group assignment in a partition.
    #[serde(rename = "partition.assigned")]
    PartitionAssigned {
        learner_id: LearnerId,
        course_key: CourseKey,
        partition_id: PartitionId,
        group_id: GroupId,
    },

    /// A stored assignment pointed at a group that no longer exists and was
    /// replaced.
    #[serde(rename = "partition.reassigned")]
    PartitionReassigned {
        learner_id: LearnerId,
        course_key: CourseKey,
        partition_id: PartitionId,
        from_group: GroupId,
        to_group: GroupId,
    },

    /// A submission was graded and its state written.
    #[serde(rename = "problem.graded")]
    ProblemGraded {
        learner_id: LearnerId,
        usage_key: UsageKey,
        score: Score,
        attempts: u32,
    },

    /// A course grade roll-up ran for a learner.
    #[serde(rename = "grades.updated")]
    GradesUpdated {
        learner_id: LearnerId,
        course_key: CourseKey,
        percent: f64,
        passed: bool,
    },
}

/// Destination for tracking events.
pub trait TrackingSink: Send + Sync {
    fn emit(&self, event: TrackingEvent);
}

/// Drops every event. The default for hosts that do not track.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl TrackingSink for NullSink {
    fn emit(&self, _event: TrackingEvent) {}
}

/// Collects events in memory for assertions.
#[cfg(any(test, feature = "test_utils"))]
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: std::sync::Arc<std::sync::Mutex<Vec<TrackingEvent>>>,
}

#[cfg(any(test, feature = "test_utils"))]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TrackingEvent> {
        self.events.lock().expect("acquire event log").clone()
    }
}

#[cfg(any(test, feature = "test_utils"))]
impl TrackingSink for RecordingSink {
    fn emit(&self, event: TrackingEvent) {
        self.events.lock().expect("acquire event log").push(event);
    }
}
