// SPDX-License-Identifier: MIT OR Apache-2.0

//! Grading-policy declarations.
//!
//! A policy turns per-block scores into a course score: assignment
//! categories with weights and drop rules, plus the cutoffs that decide
//! pass/fail and letter grades. The arithmetic itself lives in
//! `coursekit-grades`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Weights must sum to 1 within this epsilon.
pub const WEIGHT_EPSILON: f64 = 1e-4;

/// One assignment category of a grading policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignmentCategory {
    /// Category name, matched against a graded block's `format` field, e.g.
    /// "Homework".
    pub category: String,

    /// Abbreviation used in progress displays, e.g. "HW".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_label: Option<String>,

    /// Fraction of the course grade this category carries.
    pub weight: f64,

    /// Number of lowest-scored assignments dropped before averaging.
    #[serde(default)]
    pub drop_lowest: u32,

    /// Expected number of assignments; fewer are padded with zero scores.
    #[serde(default)]
    pub min_count: u32,
}

/// A letter-grade cutoff: scores at or above `threshold` earn `letter`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradeCutoff {
    pub letter: String,
    pub threshold: f64,
}

/// Per-course grading policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradingPolicy {
    pub categories: Vec<AssignmentCategory>,

    /// Cutoffs in descending threshold order. The lowest threshold is the
    /// pass mark.
    pub cutoffs: Vec<GradeCutoff>,
}

impl GradingPolicy {
    /// Validate a policy: weights sum to one, cutoffs descend and stay in
    /// `(0, 1]`, category names are unique.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let total: f64 = self.categories.iter().map(|c| c.weight).sum();
        if !self.categories.is_empty() && (total - 1.0).abs() > WEIGHT_EPSILON {
            return Err(PolicyError::WeightSum(total));
        }

        for category in &self.categories {
            if !(0.0..=1.0).contains(&category.weight) {
                return Err(PolicyError::WeightRange(category.category.clone()));
            }
        }

        let mut names: Vec<&str> = self.categories.iter().map(|c| c.category.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.categories.len() {
            return Err(PolicyError::DuplicateCategory);
        }

        let mut previous = f64::INFINITY;
        for cutoff in &self.cutoffs {
            if !(0.0..=1.0).contains(&cutoff.threshold) || cutoff.threshold >= previous {
                return Err(PolicyError::CutoffOrder);
            }
            previous = cutoff.threshold;
        }

        Ok(())
    }

    pub fn category(&self, name: &str) -> Option<&AssignmentCategory> {
        self.categories.iter().find(|c| c.category == name)
    }

    /// The score at or above which the course counts as passed.
    pub fn pass_threshold(&self) -> f64 {
        self.cutoffs
            .last()
            .map(|cutoff| cutoff.threshold)
            .unwrap_or(0.5)
    }

    /// The letter earned by a score, if any cutoff is met.
    pub fn letter_for(&self, percent: f64) -> Option<&str> {
        self.cutoffs
            .iter()
            .find(|cutoff| percent >= cutoff.threshold)
            .map(|cutoff| cutoff.letter.as_str())
    }
}

impl Default for GradingPolicy {
    /// An ungraded course: no categories, pass at 50%.
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            cutoffs: vec![GradeCutoff {
                letter: "Pass".to_owned(),
                threshold: 0.5,
            }],
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum PolicyError {
    #[error("category weights sum to {0}, expected 1.0")]
    WeightSum(f64),

    #[error("weight of category {0:?} outside [0, 1]")]
    WeightRange(String),

    #[error("duplicate category name")]
    DuplicateCategory,

    #[error("grade cutoffs must descend within (0, 1]")]
    CutoffOrder,
}
