// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenarios through the coordinator against in-memory stores.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use coursekit::test_utils::{CourseBuilder, World, request};
use coursekit::{
    CoordinatorError, DenyReason, EnrollmentMode, Score, Submission, TrackingEvent, ViewPayload,
};
use coursekit_core::block::{BlockContent, BlockFields, BlockType, GroupAccess};
use coursekit_core::course::CourseConfig;
use coursekit_core::partition::{Group, GroupId, PartitionId, UserPartition};
use coursekit_core::policy::{AssignmentCategory, GradeCutoff, GradingPolicy};
use serde_json::json;

const COURSE: &str = "course-v1:X+Y+2024";

fn submission(entries: &[(&str, &str)]) -> Submission {
    entries
        .iter()
        .map(|(id, value)| (id.to_string(), value.to_string()))
        .collect()
}

fn mc_problem_json() -> serde_json::Value {
    json!({
        "responses": [{
            "id": "r1",
            "type": "multiple_choice",
            "choices": [
                {"id": "a", "text": "Yes", "correct": true},
                {"id": "b", "text": "No"},
            ],
        }],
    })
}

fn numerical_problem_json() -> serde_json::Value {
    json!({
        "responses": [{
            "id": "x",
            "type": "numerical",
            "answer": "3.14",
            "tolerance": "0.01",
        }],
    })
}

/// A course with one graded subsection holding an MC and a numerical
/// problem, plus an intro page.
fn standard_world() -> World {
    let world = World::default();

    let mut config = CourseConfig::default();
    config.start = Some(Utc::now() - Duration::days(1));
    config.grading_policy = GradingPolicy {
        categories: vec![AssignmentCategory {
            category: "Homework".to_owned(),
            short_label: Some("HW".to_owned()),
            weight: 1.0,
            drop_lowest: 0,
            min_count: 2,
        }],
        cutoffs: vec![GradeCutoff {
            letter: "Pass".to_owned(),
            threshold: 0.5,
        }],
    };

    let mut builder = CourseBuilder::new(COURSE).with_config(config);
    let root = builder.root_key();
    let chapter = builder.add(&root, BlockType::Chapter, "week1");
    builder.add(&chapter, BlockType::Html, "intro");

    let subsection = builder.add_block(
        &chapter,
        BlockType::Sequential,
        "hw1",
        BlockFields {
            graded: true,
            format: Some("Homework".to_owned()),
            ..BlockFields::default()
        },
    );
    let unit = builder.add(&subsection, BlockType::Vertical, "u1");
    builder.add_with_content(
        &unit,
        BlockType::Problem,
        "q1",
        BlockFields::default(),
        BlockContent::Problem {
            definition: mc_problem_json(),
        },
    );
    builder.add_with_content(
        &unit,
        BlockType::Problem,
        "q2",
        BlockFields::default(),
        BlockContent::Problem {
            definition: numerical_problem_json(),
        },
    );

    world.publish(builder.build());
    world
}

fn block(id: &str, block_type: &str) -> String {
    format!("block-v1:X+Y+2024+type@{}+block@{}", block_type, id)
}

#[tokio::test]
async fn happy_view_returns_payload_without_state_writes() {
    let world = standard_world();
    world.enroll("u1", COURSE, EnrollmentMode::Audit);

    let view = world
        .coordinator
        .view(&request("u1"), &block("intro", "html"))
        .await
        .unwrap();

    assert_eq!(view.display_name, "intro");
    assert!(matches!(view.payload, ViewPayload::Html { .. }));
    assert!(view.state.is_none());

    // No learner state was written by the view.
    assert!(world.state.read_store().is_empty());
}

#[tokio::test]
async fn view_before_course_start_is_denied_with_the_date() {
    let world = World::default();
    let start = Utc::now() + Duration::days(1);
    let mut builder = CourseBuilder::new(COURSE).with_course_start(start);
    let root = builder.root_key();
    builder.add(&root, BlockType::Html, "intro");
    world.publish(builder.build());
    world.enroll("u2", COURSE, EnrollmentMode::Audit);

    let err = world
        .coordinator
        .view(&request("u2"), &block("intro", "html"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CoordinatorError::Denied(DenyReason::NotStarted { start })
    );

    // Staff bypass the start date.
    let view = world
        .coordinator
        .view(&request("u2").as_staff(), &block("intro", "html"))
        .await;
    assert!(view.is_ok());
}

#[tokio::test]
async fn unknown_blocks_and_courses_deny_not_found() {
    let world = standard_world();
    world.enroll("u1", COURSE, EnrollmentMode::Audit);

    let err = world
        .coordinator
        .view(&request("u1"), &block("ghost", "html"))
        .await
        .unwrap_err();
    assert_eq!(err, CoordinatorError::Denied(DenyReason::NotFound));

    let err = world
        .coordinator
        .view(
            &request("u1"),
            "block-v1:X+Other+2024+type@html+block@intro",
        )
        .await
        .unwrap_err();
    assert_eq!(err, CoordinatorError::Denied(DenyReason::NotFound));

    // A malformed key is a parse error, not a denial.
    let err = world
        .coordinator
        .view(&request("u1"), "not-a-key")
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::Key(_)));
}

#[tokio::test]
async fn unenrolled_learners_are_denied() {
    let world = standard_world();

    let err = world
        .coordinator
        .view(&request("stranger"), &block("intro", "html"))
        .await
        .unwrap_err();
    assert_eq!(err, CoordinatorError::Denied(DenyReason::NotEnrolled));
}

#[tokio::test]
async fn correct_mc_submission_and_identical_resubmit() {
    let world = standard_world();
    world.enroll("u3", COURSE, EnrollmentMode::Audit);
    let req = request("u3");

    let outcome = world
        .coordinator
        .submit(&req, &block("q1", "problem"), submission(&[("r1", "a")]))
        .await
        .unwrap();

    assert_eq!(outcome.result.score, Score::new(1.0, 1.0));
    assert!(outcome.result.is_perfect());
    assert_eq!(outcome.state.attempts, 1);
    assert!(!outcome.unchanged);

    // The same payload again is a no-op: same result, attempts unchanged.
    let again = world
        .coordinator
        .submit(&req, &block("q1", "problem"), submission(&[("r1", "a")]))
        .await
        .unwrap();
    assert!(again.unchanged);
    assert_eq!(again.result, outcome.result);
    assert_eq!(again.state.attempts, 1);

    // A different payload grades again and counts an attempt.
    let wrong = world
        .coordinator
        .submit(&req, &block("q1", "problem"), submission(&[("r1", "b")]))
        .await
        .unwrap();
    assert_eq!(wrong.result.score, Score::new(0.0, 1.0));
    assert_eq!(wrong.state.attempts, 2);
}

#[tokio::test]
async fn numerical_tolerance_accepts_and_rejects() {
    let world = standard_world();
    world.enroll("u4", COURSE, EnrollmentMode::Audit);
    let req = request("u4");

    let close = world
        .coordinator
        .submit(&req, &block("q2", "problem"), submission(&[("x", "3.145")]))
        .await
        .unwrap();
    assert_eq!(close.result.score, Score::new(1.0, 1.0));

    let far = world
        .coordinator
        .submit(&req, &block("q2", "problem"), submission(&[("x", "3.16")]))
        .await
        .unwrap();
    assert_eq!(far.result.score, Score::new(0.0, 1.0));
}

#[tokio::test]
async fn submit_observes_read_your_writes() {
    let world = standard_world();
    world.enroll("u5", COURSE, EnrollmentMode::Audit);
    let req = request("u5");

    world
        .coordinator
        .submit(&req, &block("q1", "problem"), submission(&[("r1", "a")]))
        .await
        .unwrap();

    let view = world
        .coordinator
        .view(&req, &block("q1", "problem"))
        .await
        .unwrap();
    let state = view.state.expect("state recorded by submit");
    assert_eq!(state.score, Some(Score::new(1.0, 1.0)));
    assert_eq!(state.attempts, 1);

    // The render model echoes the graded submission.
    let ViewPayload::Problem(model) = view.payload else {
        panic!("expected problem payload");
    };
    assert_eq!(model.responses[0].current_value.as_deref(), Some("a"));
    assert!(model.responses[0].correctness.unwrap().is_correct());
}

#[tokio::test]
async fn attempt_budget_is_enforced_exactly() {
    let world = World::default();
    let mut builder = CourseBuilder::new(COURSE);
    let root = builder.root_key();
    builder.add_with_content(
        &root,
        BlockType::Problem,
        "limited",
        BlockFields {
            max_attempts: Some(2),
            ..BlockFields::default()
        },
        BlockContent::Problem {
            definition: mc_problem_json(),
        },
    );
    world.publish(builder.build());
    world.enroll("u6", COURSE, EnrollmentMode::Audit);
    let req = request("u6");

    for answer in ["b", "a"] {
        world
            .coordinator
            .submit(
                &req,
                &block("limited", "problem"),
                submission(&[("r1", answer)]),
            )
            .await
            .unwrap();
    }

    let err = world
        .coordinator
        .submit(
            &req,
            &block("limited", "problem"),
            submission(&[("r1", "b")]),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CoordinatorError::Denied(DenyReason::AttemptsExhausted { used: 2, max: 2 })
    );

    // The denied attempt wrote nothing: attempts still 2.
    let view = world
        .coordinator
        .view(&req, &block("limited", "problem"))
        .await
        .unwrap();
    assert_eq!(view.state.unwrap().attempts, 2);
}

#[tokio::test]
async fn partition_filter_hides_and_denies() {
    use coursekit_store::traits::GroupAssignmentStore;

    let world = World::default();

    let mut config = CourseConfig::default();
    config.user_partitions.push(UserPartition::new(
        50,
        "cohort",
        vec![Group::new(1, "A"), Group::new(2, "B")],
    ));

    let mut builder = CourseBuilder::new(COURSE).with_config(config);
    let root = builder.root_key();
    let chapter = builder.add(&root, BlockType::Chapter, "week1");
    builder.add_block(
        &chapter,
        BlockType::Sequential,
        "s1",
        BlockFields {
            group_access: GroupAccess::new().restrict(PartitionId(50), vec![GroupId(1)]),
            ..BlockFields::default()
        },
    );
    builder.add(&chapter, BlockType::Sequential, "s2");
    world.publish(builder.build());
    world.enroll("u7", COURSE, EnrollmentMode::Audit);
    let req = request("u7");

    // Pin the learner into group B so the fixture is deterministic.
    let learner: coursekit::LearnerId = "u7".parse().unwrap();
    let course: coursekit::CourseKey = COURSE.parse().unwrap();
    world
        .assignments
        .replace(&learner, &course, PartitionId(50), GroupId(2))
        .await
        .unwrap();

    let view = world
        .coordinator
        .view(&req, &block("week1", "chapter"))
        .await
        .unwrap();
    let children: Vec<String> = view
        .children
        .iter()
        .map(|key| key.block_id().to_owned())
        .collect();
    assert_eq!(children, vec!["s2"]);

    let err = world
        .coordinator
        .view(&req, &block("s1", "sequential"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CoordinatorError::Denied(DenyReason::PartitionRestricted {
            partition: PartitionId(50)
        })
    );

    // Group A sees both subsections.
    world
        .assignments
        .replace(&learner, &course, PartitionId(50), GroupId(1))
        .await
        .unwrap();
    let view = world
        .coordinator
        .view(&req, &block("week1", "chapter"))
        .await
        .unwrap();
    assert_eq!(view.children.len(), 2);
}

#[tokio::test]
async fn repeated_views_assign_partitions_once() {
    let world = World::default();

    let mut config = CourseConfig::default();
    config.user_partitions.push(UserPartition::new(
        50,
        "cohort",
        vec![Group::new(1, "A"), Group::new(2, "B")],
    ));
    let mut builder = CourseBuilder::new(COURSE).with_config(config);
    let root = builder.root_key();
    builder.add(&root, BlockType::Html, "intro");
    world.publish(builder.build());
    world.enroll("u8", COURSE, EnrollmentMode::Audit);
    let req = request("u8");

    let first = world
        .coordinator
        .view(&req, &block("intro", "html"))
        .await
        .unwrap();
    for _ in 0..3 {
        let again = world
            .coordinator
            .view(&req, &block("intro", "html"))
            .await
            .unwrap();
        assert_eq!(again, first);
    }

    let assigned = world
        .sink
        .events()
        .into_iter()
        .filter(|event| matches!(event, TrackingEvent::PartitionAssigned { .. }))
        .count();
    assert_eq!(assigned, 1);
}

#[tokio::test]
async fn prerequisite_gates_until_completed() {
    let world = World::default();
    let mut builder = CourseBuilder::new(COURSE);
    let root = builder.root_key();
    let chapter = builder.add(&root, BlockType::Chapter, "week1");
    let intro = builder.add(&chapter, BlockType::Sequential, "intro");
    builder.add(&intro, BlockType::Vertical, "u-intro");
    let exam = builder.add_block(
        &chapter,
        BlockType::Sequential,
        "exam",
        BlockFields {
            prerequisites: vec![intro.clone()],
            ..BlockFields::default()
        },
    );
    builder.add(&exam, BlockType::Vertical, "u-exam");
    world.publish(builder.build());
    world.enroll("u9", COURSE, EnrollmentMode::Audit);
    let req = request("u9");

    let err = world
        .coordinator
        .view(&req, &block("exam", "sequential"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CoordinatorError::Denied(DenyReason::PrerequisiteIncomplete {
            prerequisite: intro.clone()
        })
    );

    // Content nested in the gated subsection is gated too.
    let err = world
        .coordinator
        .view(&req, &block("u-exam", "vertical"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::Denied(DenyReason::PrerequisiteIncomplete { .. })
    ));

    world
        .coordinator
        .mark_complete(&req, &block("intro", "sequential"))
        .await
        .unwrap();

    assert!(world
        .coordinator
        .view(&req, &block("exam", "sequential"))
        .await
        .is_ok());
}

#[tokio::test]
async fn sequence_lists_units_with_completion() {
    let world = standard_world();
    world.enroll("u10", COURSE, EnrollmentMode::Audit);
    let req = request("u10");

    let sequence = world
        .coordinator
        .sequence(&req, COURSE, "week1", "hw1")
        .await
        .unwrap();
    assert_eq!(sequence.units.len(), 1);
    assert!(!sequence.units[0].complete);

    world
        .coordinator
        .mark_complete(&req, &block("u1", "vertical"))
        .await
        .unwrap();

    let sequence = world
        .coordinator
        .sequence(&req, COURSE, "week1", "hw1")
        .await
        .unwrap();
    assert!(sequence.units[0].complete);

    // Unknown section ids are NotFound.
    let err = world
        .coordinator
        .sequence(&req, COURSE, "week9", "hw1")
        .await
        .unwrap_err();
    assert_eq!(err, CoordinatorError::Denied(DenyReason::NotFound));
}

#[tokio::test]
async fn outline_respects_depth_and_visibility() {
    let world = standard_world();
    world.enroll("u11", COURSE, EnrollmentMode::Audit);
    let req = request("u11");

    let outline = world
        .coordinator
        .course_outline(&req, COURSE, -1)
        .await
        .unwrap();
    assert_eq!(outline.block_type, BlockType::Course);
    assert_eq!(outline.children.len(), 1);
    let chapter = &outline.children[0];
    assert_eq!(chapter.children.len(), 2);

    let shallow = world
        .coordinator
        .course_outline(&req, COURSE, 1)
        .await
        .unwrap();
    assert_eq!(shallow.children.len(), 1);
    assert!(shallow.children[0].children.is_empty());
}

#[tokio::test]
async fn progress_rolls_scores_into_a_course_grade() {
    let world = standard_world();
    world.enroll("u12", COURSE, EnrollmentMode::Audit);
    let req = request("u12");

    // Nothing graded yet: zero score, not passed.
    let progress = world.coordinator.progress(&req, COURSE).await.unwrap();
    assert_eq!(progress.grade.percent, 0.0);
    assert!(!progress.grade.passed);

    // One of two problems correct; min_count 2 keeps the denominator at 2.
    world
        .coordinator
        .submit(&req, &block("q1", "problem"), submission(&[("r1", "a")]))
        .await
        .unwrap();

    let progress = world.coordinator.progress(&req, COURSE).await.unwrap();
    assert!((progress.grade.percent - 0.5).abs() < 1e-9);
    assert!(progress.grade.passed);

    // Both correct: full marks.
    world
        .coordinator
        .submit(&req, &block("q2", "problem"), submission(&[("x", "3.14")]))
        .await
        .unwrap();

    let progress = world.coordinator.progress(&req, COURSE).await.unwrap();
    assert!((progress.grade.percent - 1.0).abs() < 1e-9);
    assert_eq!(progress.grade.letter.as_deref(), Some("Pass"));
}

#[tokio::test]
async fn submit_emits_tracking_events() {
    let world = standard_world();
    world.enroll("u13", COURSE, EnrollmentMode::Audit);
    let req = request("u13");

    world
        .coordinator
        .submit(&req, &block("q1", "problem"), submission(&[("r1", "a")]))
        .await
        .unwrap();

    let events = world.sink.events();
    assert!(events
        .iter()
        .any(|event| matches!(event, TrackingEvent::ProblemGraded { score, .. } if score.earned == 1.0)));
    assert!(events
        .iter()
        .any(|event| matches!(event, TrackingEvent::GradesUpdated { passed: true, .. })));
}

#[tokio::test]
async fn blank_submissions_never_grade_correct() {
    let world = standard_world();
    world.enroll("u14", COURSE, EnrollmentMode::Audit);
    let req = request("u14");

    let outcome = world
        .coordinator
        .submit(&req, &block("q2", "problem"), submission(&[("x", "   ")]))
        .await
        .unwrap();
    assert_eq!(outcome.result.score, Score::new(0.0, 1.0));
}

#[tokio::test]
async fn submitting_to_a_non_problem_block_is_invalid() {
    let world = standard_world();
    world.enroll("u15", COURSE, EnrollmentMode::Audit);

    let err = world
        .coordinator
        .submit(
            &request("u15"),
            &block("intro", "html"),
            submission(&[("r1", "a")]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::InvalidSubmission(_)));
}

#[tokio::test]
async fn expired_deadlines_surface_as_store_unavailable() {
    use std::time::{Duration as StdDuration, Instant};

    use coursekit::Coordinator;
    use coursekit_store::memory::{
        MemoryAssignmentStore, MemoryEnrollmentStore, MemoryStateStore,
    };
    use coursekit_store::test_utils::SlowBlockStore;

    let world = standard_world();
    world.enroll("u16", COURSE, EnrollmentMode::Audit);

    // A block store that takes far longer than the request allows.
    let slow = SlowBlockStore::new(world.blocks.clone(), StdDuration::from_secs(30));
    let coordinator = Coordinator::new(
        slow,
        MemoryStateStore::default(),
        MemoryEnrollmentStore::new(),
        MemoryAssignmentStore::new(),
        coursekit::Settings::default(),
    );

    let req = request("u16").with_deadline(Instant::now() + StdDuration::from_millis(20));
    let err = coordinator
        .view(&req, &block("intro", "html"))
        .await
        .unwrap_err();
    assert_eq!(err, CoordinatorError::StoreUnavailable);
}

#[tokio::test]
async fn publish_replaces_the_visible_tree() {
    let world = standard_world();
    world.enroll("u17", COURSE, EnrollmentMode::Audit);
    let req = request("u17");

    assert!(world
        .coordinator
        .view(&req, &block("intro", "html"))
        .await
        .is_ok());

    // Republish without the intro page; the old block is gone.
    let mut builder = CourseBuilder::new(COURSE);
    let root = builder.root_key();
    builder.add(&root, BlockType::Html, "welcome");
    world.publish(builder.build());

    // The in-flight request keeps its consistent snapshot of the course;
    // the next request sees the new tree.
    assert!(world
        .coordinator
        .view(&req, &block("intro", "html"))
        .await
        .is_ok());

    let fresh = request("u17");
    let err = world
        .coordinator
        .view(&fresh, &block("intro", "html"))
        .await
        .unwrap_err();
    assert_eq!(err, CoordinatorError::Denied(DenyReason::NotFound));
    assert!(world
        .coordinator
        .view(&fresh, &block("welcome", "html"))
        .await
        .is_ok());
}
