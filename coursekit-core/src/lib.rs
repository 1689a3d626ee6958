// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core data types for the coursekit courseware engine.
//!
//! This crate owns the value types everything else is built from: the key
//! algebra (course, usage and asset keys with canonical and legacy string
//! forms), the published block tree and its validation, partition and
//! enrollment declarations, grading policies and the settings object threaded
//! through the coordinator.
//!
//! Nothing in this crate performs I/O; stores and services live in the
//! sibling crates.

pub mod block;
pub mod course;
pub mod enrollment;
pub mod events;
pub mod keys;
pub mod learner;
pub mod partition;
pub mod policy;
pub mod score;
pub mod settings;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod tree;

pub use block::{Block, BlockContent, BlockFields, BlockType, GroupAccess};
pub use course::{CourseConfig, EmbargoConfig};
pub use enrollment::{Enrollment, EnrollmentMode};
pub use events::{NullSink, TrackingEvent, TrackingSink};
pub use keys::{AssetKey, CourseKey, KeyError, UsageKey};
pub use learner::{LearnerId, LearnerIdError};
pub use partition::{Group, GroupId, PartitionId, UserPartition};
pub use policy::{AssignmentCategory, GradeCutoff, GradingPolicy, PolicyError};
pub use score::Score;
pub use settings::{PartitionSeed, RawSettings, Settings, SettingsError};
pub use tree::{BlockTree, RawTree, TreeError};
