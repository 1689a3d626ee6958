// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access policy engine and partition service for coursekit.
//!
//! Access control composes a fixed stack of independent rules — existence,
//! staff override, visibility windows, enrollment and mode gates,
//! prerequisites, partition-group restrictions, country embargo and attempt
//! budgets — each a pure function returning `Allow` or `Deny(reason)`.
//! Evaluation is a fold with short-circuit on the first denial; rules never
//! write and never raise.
//!
//! The partition service resolves each learner's stable group within a
//! course partition, assigning deterministically on first access and
//! persisting the result under a uniqueness constraint.

pub mod context;
pub mod decision;
pub mod engine;
pub mod partition;
pub mod rules;

pub use context::{Action, BlockContext, LearnerContext};
pub use decision::{AccessDecision, DenyReason};
pub use engine::check_access;
pub use partition::{PartitionError, PartitionService};
