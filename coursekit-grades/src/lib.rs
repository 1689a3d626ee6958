// SPDX-License-Identifier: MIT OR Apache-2.0

//! Score aggregation for coursekit.
//!
//! Rolls per-block scores into category and course grades under a course's
//! grading policy: group by category, drop the lowest `drop_lowest`, pad up
//! to `min_count` with zero scores, average, then weight. The aggregator is
//! pure; the coordinator invokes it after every successful state write and
//! may batch behind the same interface.

pub mod aggregator;

pub use aggregator::{CategoryGrade, CourseGrade, GradedBlock, aggregate};
