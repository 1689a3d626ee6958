// SPDX-License-Identifier: MIT OR Apache-2.0

//! Courseware access and assessment core.
//!
//! `coursekit` coordinates a published content model, an access-policy
//! engine, a CAPA-style grading pipeline and durable learner state behind
//! one request-facing [`Coordinator`]:
//!
//! - resolve a learner's request to a renderable block subtree, with
//!   per-learner partition overlays applied as a pure function over the
//!   immutable tree;
//! - enforce eligibility through an ordered stack of pure access rules,
//!   short-circuiting on the first denial;
//! - grade submissions deterministically per `(definition, seed,
//!   submission)` and record scores under per-(learner, block) write
//!   serialization;
//! - roll scores up into course grades under the course's grading policy.
//!
//! The member crates carry the pieces: `coursekit-core` (keys, block trees,
//! declarations, settings), `coursekit-store` (store traits and in-memory
//! implementations), `coursekit-access` (rules and partition service),
//! `coursekit-grader` (problem grading) and `coursekit-grades`
//! (aggregation). Hosts that only need a subset can depend on those
//! directly.

pub mod coordinator;
pub mod error;
pub mod events;
pub mod models;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use coordinator::{Coordinator, RequestContext};
pub use error::CoordinatorError;
pub use events::TracingSink;
pub use models::{
    OutlineNode, ProgressModel, SequenceModel, StateSnapshot, SubmitOutcome, UnitModel, ViewModel,
    ViewPayload,
};

pub use coursekit_access::{AccessDecision, Action, DenyReason};
pub use coursekit_core::{
    Block, BlockTree, BlockType, CourseKey, EnrollmentMode, LearnerId, RawTree, Score, Settings,
    TrackingEvent, TrackingSink, UsageKey,
};
pub use coursekit_grader::{GradingResult, Submission};
pub use coursekit_grades::CourseGrade;
pub use coursekit_store::{LearnerBlockState, StoreError};
