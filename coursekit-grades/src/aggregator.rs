// SPDX-License-Identifier: MIT OR Apache-2.0

//! The scoring aggregator: per-block scores in, course grade out.
//!
//! A pure function of `(policy, graded blocks)`. Recomputation over
//! unchanged inputs yields the same grade, and raising any per-block earned
//! score never lowers the course score.

use std::collections::BTreeMap;

use coursekit_core::Score;
use coursekit_core::keys::UsageKey;
use coursekit_core::policy::GradingPolicy;
use serde::{Deserialize, Serialize};

/// One graded block feeding the aggregation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradedBlock {
    pub usage_key: UsageKey,

    /// Assignment category the block's subsection is filed under.
    pub category: String,

    pub score: Score,
}

/// The score of one assignment category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryGrade {
    pub category: String,

    /// Mean of the counted normalized scores, in `[0, 1]`.
    pub percent: f64,

    /// Graded blocks that fed the category, before drops and padding.
    pub graded_count: u32,

    /// Scores dropped as the lowest `drop_lowest`.
    pub dropped: u32,
}

/// A learner's course grade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CourseGrade {
    pub category_grades: Vec<CategoryGrade>,

    /// Weighted course score in `[0, 1]`.
    pub percent: f64,

    pub passed: bool,

    /// Letter earned under the policy's cutoffs, when any cutoff is met.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter: Option<String>,
}

/// Aggregate per-block scores into a course grade under a policy.
///
/// Blocks in categories the policy does not declare are ignored; declared
/// categories with no graded blocks still contribute their weight at the
/// padded zero score when `min_count` demands it.
pub fn aggregate(policy: &GradingPolicy, blocks: &[GradedBlock]) -> CourseGrade {
    let mut by_category: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for block in blocks {
        by_category
            .entry(block.category.as_str())
            .or_default()
            .push(block.score.normalized());
    }

    let mut category_grades = Vec::with_capacity(policy.categories.len());
    let mut percent = 0.0;

    for declared in &policy.categories {
        let mut scores = by_category
            .get(declared.category.as_str())
            .cloned()
            .unwrap_or_default();
        let graded_count = scores.len() as u32;

        // Drop the lowest n by normalized score.
        scores.sort_by(|a, b| a.partial_cmp(b).expect("scores are never NaN"));
        let dropped = (declared.drop_lowest as usize).min(scores.len());
        let kept: Vec<f64> = scores.split_off(dropped);

        // Pad with zeros up to min_count so missing assignments weigh in.
        let denominator = (kept.len() as u32).max(declared.min_count).max(1);
        let category_percent = kept.iter().sum::<f64>() / denominator as f64;

        percent += category_percent * declared.weight;
        category_grades.push(CategoryGrade {
            category: declared.category.clone(),
            percent: category_percent,
            graded_count,
            dropped: dropped as u32,
        });
    }

    let passed = percent >= policy.pass_threshold();
    let letter = policy.letter_for(percent).map(str::to_owned);

    CourseGrade {
        category_grades,
        percent,
        passed,
        letter,
    }
}

#[cfg(test)]
mod tests {
    use coursekit_core::Score;
    use coursekit_core::keys::CourseKey;
    use coursekit_core::policy::{AssignmentCategory, GradeCutoff, GradingPolicy};

    use super::{GradedBlock, aggregate};

    fn block(id: &str, category: &str, earned: f64, possible: f64) -> GradedBlock {
        let course: CourseKey = "course-v1:Org+Course+2024".parse().unwrap();
        GradedBlock {
            usage_key: course
                .make_usage_key(coursekit_core::block::BlockType::Problem, id)
                .unwrap(),
            category: category.to_owned(),
            score: Score::new(earned, possible),
        }
    }

    fn policy() -> GradingPolicy {
        GradingPolicy {
            categories: vec![
                AssignmentCategory {
                    category: "Homework".to_owned(),
                    short_label: Some("HW".to_owned()),
                    weight: 0.4,
                    drop_lowest: 1,
                    min_count: 4,
                },
                AssignmentCategory {
                    category: "Exam".to_owned(),
                    short_label: None,
                    weight: 0.6,
                    drop_lowest: 0,
                    min_count: 1,
                },
            ],
            cutoffs: vec![
                GradeCutoff {
                    letter: "A".to_owned(),
                    threshold: 0.9,
                },
                GradeCutoff {
                    letter: "Pass".to_owned(),
                    threshold: 0.5,
                },
            ],
        }
    }

    #[test]
    fn drops_lowest_and_pads_to_min_count() {
        let policy = policy();
        // Four homeworks (one zero gets dropped), min_count already met.
        let blocks = vec![
            block("hw1", "Homework", 1.0, 1.0),
            block("hw2", "Homework", 1.0, 1.0),
            block("hw3", "Homework", 1.0, 1.0),
            block("hw4", "Homework", 0.0, 1.0),
            block("exam", "Exam", 0.8, 1.0),
        ];

        let grade = aggregate(&policy, &blocks);
        let homework = &grade.category_grades[0];
        // Dropped the zero; three perfect scores over max(3, 4) = 4.
        assert_eq!(homework.dropped, 1);
        assert!((homework.percent - 0.75).abs() < 1e-9);

        let expected = 0.75 * 0.4 + 0.8 * 0.6;
        assert!((grade.percent - expected).abs() < 1e-9);
        assert!(grade.passed);
        assert_eq!(grade.letter.as_deref(), Some("Pass"));
    }

    #[test]
    fn missing_category_counts_as_zero() {
        let policy = policy();
        let blocks = vec![block("exam", "Exam", 1.0, 1.0)];

        let grade = aggregate(&policy, &blocks);
        assert_eq!(grade.category_grades[0].percent, 0.0);
        assert!((grade.percent - 0.6).abs() < 1e-9);
        assert!(grade.passed);
    }

    #[test]
    fn zero_possible_scores_count_as_zero() {
        let policy = policy();
        let blocks = vec![
            block("exam", "Exam", 0.0, 0.0),
            block("hw1", "Homework", 1.0, 1.0),
        ];

        let grade = aggregate(&policy, &blocks);
        assert_eq!(grade.category_grades[1].percent, 0.0);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let policy = policy();
        let blocks = vec![
            block("hw1", "Homework", 2.0, 3.0),
            block("exam", "Exam", 0.5, 1.0),
        ];

        let first = aggregate(&policy, &blocks);
        for _ in 0..5 {
            assert_eq!(aggregate(&policy, &blocks), first);
        }
    }

    #[test]
    fn raising_a_score_never_lowers_the_course_grade() {
        let policy = policy();
        let mut blocks = vec![
            block("hw1", "Homework", 0.2, 1.0),
            block("hw2", "Homework", 0.4, 1.0),
            block("hw3", "Homework", 0.9, 1.0),
            block("exam", "Exam", 0.5, 1.0),
        ];

        let mut previous = aggregate(&policy, &blocks).percent;
        // Raise hw1 step by step past the other scores; the course score is
        // monotone throughout, including across drop-set changes.
        for step in 1..=10 {
            blocks[0].score = Score::new(0.2 + 0.08 * step as f64, 1.0);
            let current = aggregate(&policy, &blocks).percent;
            assert!(current >= previous - 1e-12);
            previous = current;
        }
    }

    #[test]
    fn undeclared_categories_are_ignored() {
        let policy = policy();
        let blocks = vec![
            block("exam", "Exam", 1.0, 1.0),
            block("extra", "Extra Credit", 1.0, 1.0),
        ];

        let grade = aggregate(&policy, &blocks);
        assert_eq!(grade.category_grades.len(), 2);
        assert!((grade.percent - 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_policy_grades_zero() {
        let policy = GradingPolicy::default();
        let grade = aggregate(&policy, &[]);
        assert_eq!(grade.percent, 0.0);
        assert!(!grade.passed);
        assert!(grade.category_grades.is_empty());
    }
}
