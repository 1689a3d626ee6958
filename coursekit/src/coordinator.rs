// SPDX-License-Identifier: MIT OR Apache-2.0

//! The courseware coordinator.
//!
//! The one entry point the host talks to: given a learner and a key it
//! composes the block store, partition service, access engine, grader and
//! aggregator into view, submit, sequence, outline and progress operations.
//! The coordinator holds no per-learner state of its own; everything is
//! resolved per request and every store call is raced against the request
//! deadline.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use coursekit_access::partition::PartitionError;
use coursekit_access::{
    AccessDecision, Action, DenyReason, LearnerContext, PartitionService, check_access,
};
use coursekit_core::block::{BlockContent, BlockType};
use coursekit_core::events::{TrackingEvent, TrackingSink};
use coursekit_core::keys::{CourseKey, UsageKey};
use coursekit_core::learner::LearnerId;
use coursekit_core::settings::Settings;
use coursekit_core::tree::BlockTree;
use coursekit_grader::{ProblemDefinition, Sandbox, Submission, grade, prepare, render};
use coursekit_grades::{CourseGrade, GradedBlock, aggregate};
use coursekit_store::overlay::LearnerView;
use coursekit_store::state::StateDraft;
use coursekit_store::traits::{
    BlockStore, EnrollmentStore, GroupAssignmentStore, LearnerStateStore,
};
use coursekit_store::{LearnerBlockState, TreeCache};
use tracing::{debug, info};

use crate::error::{CoordinatorError, store_error};
use crate::events::TracingSink;
use crate::models::{
    OutlineNode, ProblemState, ProgressModel, SequenceModel, StateSnapshot, SubmitOutcome,
    UnitModel, ViewModel, ViewPayload, payload_for,
};

/// Per-request caller context: who is asking, with what capabilities, and
/// until when the request may keep the stores busy.
///
/// Owns the request-scoped tree cache: operations served from the same
/// context share one tree fetch per course. Contexts never outlive their
/// request and are never shared between requests.
#[derive(Debug)]
pub struct RequestContext {
    pub learner_id: LearnerId,
    pub staff: bool,
    pub country: Option<String>,
    pub deadline: Option<std::time::Instant>,
    trees: tokio::sync::Mutex<TreeCache>,
}

impl RequestContext {
    pub fn new(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            staff: false,
            country: None,
            deadline: None,
            trees: tokio::sync::Mutex::new(TreeCache::new()),
        }
    }

    pub fn as_staff(mut self) -> Self {
        self.staff = true;
        self
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_owned());
        self
    }

    pub fn with_deadline(mut self, deadline: std::time::Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// The orchestrator exposed to the HTTP layer.
pub struct Coordinator<B, S, E, A>
where
    A: GroupAssignmentStore,
{
    blocks: B,
    state: S,
    enrollments: E,
    partitions: PartitionService<A>,
    settings: Settings,
    sandbox: Sandbox,
    sink: Arc<dyn TrackingSink>,
}

impl<B, S, E, A> Coordinator<B, S, E, A>
where
    B: BlockStore,
    S: LearnerStateStore,
    E: EnrollmentStore,
    A: GroupAssignmentStore,
{
    pub fn new(blocks: B, state: S, enrollments: E, assignments: A, settings: Settings) -> Self {
        let sink: Arc<dyn TrackingSink> = Arc::new(TracingSink);
        let sandbox = Sandbox::from_budgets(settings.sandbox_cpu_ms, settings.sandbox_mem_bytes);
        let partitions =
            PartitionService::new(assignments, settings.partition_seed, sink.clone());

        Self {
            blocks,
            state,
            enrollments,
            partitions,
            settings,
            sandbox,
            sink,
        }
    }

    /// Route tracking events somewhere other than the log.
    pub fn with_sink(mut self, sink: Arc<dyn TrackingSink>) -> Self {
        self.partitions = self.partitions.with_sink(sink.clone());
        self.sink = sink;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Compose access check, block fetch and state snapshot for render.
    ///
    /// Side-effect free apart from lazy partition-group assignment.
    pub async fn view(
        &self,
        req: &RequestContext,
        usage_key: &str,
    ) -> Result<ViewModel, CoordinatorError> {
        let usage_key: UsageKey = usage_key.parse()?;
        let now = Utc::now();

        let tree = self.course_tree(req, usage_key.course_key()).await?;
        let (ctx, prior) = self.learner_context(req, &tree, Some(&usage_key)).await?;

        self.require_access(&tree, &usage_key, &ctx, Action::Load, now)?;
        let block = tree
            .get(&usage_key)
            .ok_or(CoordinatorError::Denied(DenyReason::NotFound))?;

        let view = LearnerView {
            staff: ctx.staff,
            groups: ctx.groups.clone(),
        };
        let children = coursekit_store::visible_children(&tree, &usage_key, &view, now)
            .into_iter()
            .map(|child| child.usage_key.clone())
            .collect();

        let payload = match &block.content {
            BlockContent::Problem { definition } => {
                let definition = ProblemDefinition::from_json(definition)
                    .map_err(|err| CoordinatorError::Content(err.to_string()))?;
                let seed = self.problem_seed(&req.learner_id, &usage_key);
                let prepared = prepare(&definition, seed);

                let problem_state = prior
                    .as_ref()
                    .and_then(|record| ProblemState::from_value(&record.state));
                let model = render(
                    &prepared,
                    problem_state.as_ref().map(|s| &s.last_submission),
                    problem_state.as_ref().and_then(|s| s.last_result.as_ref()),
                );
                ViewPayload::Problem(model)
            }
            other => payload_for(other),
        };

        Ok(ViewModel {
            usage_key: usage_key.clone(),
            block_type: usage_key.block_type().clone(),
            display_name: block.display_name.clone(),
            children,
            payload,
            state: prior.as_ref().map(StateSnapshot::from),
        })
    }

    /// Grade a submission and record the outcome.
    ///
    /// The write is atomic per `(learner, block)`; an identical resubmission
    /// of the previous payload is a no-op that returns the recorded result
    /// without incrementing `attempts`.
    pub async fn submit(
        &self,
        req: &RequestContext,
        usage_key: &str,
        submission: Submission,
    ) -> Result<SubmitOutcome, CoordinatorError> {
        let usage_key: UsageKey = usage_key.parse()?;
        let now = Utc::now();

        if usage_key.block_type() != &BlockType::Problem {
            return Err(CoordinatorError::InvalidSubmission(format!(
                "block {} is not a problem",
                usage_key
            )));
        }

        let tree = self.course_tree(req, usage_key.course_key()).await?;
        let (ctx, prior) = self.learner_context(req, &tree, Some(&usage_key)).await?;

        self.require_access(&tree, &usage_key, &ctx, Action::Interact, now)?;
        let block = tree
            .get(&usage_key)
            .ok_or(CoordinatorError::Denied(DenyReason::NotFound))?;

        let BlockContent::Problem { definition } = &block.content else {
            return Err(CoordinatorError::InvalidSubmission(format!(
                "block {} carries no problem definition",
                usage_key
            )));
        };
        let definition = ProblemDefinition::from_json(definition)
            .map_err(|err| CoordinatorError::Content(err.to_string()))?;

        // No-op resubmission: same payload as the last graded attempt.
        if let Some(prior_record) = &prior {
            if let Some(problem_state) = ProblemState::from_value(&prior_record.state) {
                if problem_state.last_submission == submission {
                    if let Some(result) = problem_state.last_result {
                        debug!(block = %usage_key, "identical resubmission, returning recorded result");
                        return Ok(SubmitOutcome {
                            usage_key,
                            result,
                            state: StateSnapshot::from(prior_record),
                            unchanged: true,
                        });
                    }
                }
            }
        }

        let seed = self.problem_seed(&req.learner_id, &usage_key);
        let prepared = prepare(&definition, seed);
        let result = grade(&prepared, &submission, self.sandbox);

        let new_state = ProblemState {
            seed,
            last_submission: submission,
            last_result: Some(result.clone()),
        };
        let score = result.score;
        let written = self
            .bounded(req, async {
                self.state
                    .update(&req.learner_id, &usage_key, move |prior| {
                        let mut draft = StateDraft::from_prior(prior);
                        draft.state = new_state.to_value();
                        draft.score = Some(score);
                        draft.attempts += 1;
                        draft.done = true;
                        draft
                    })
                    .await
            })
            .await?
            .map_err(store_error)?;

        info!(
            learner = %req.learner_id,
            block = %usage_key,
            earned = score.earned,
            possible = score.possible,
            attempts = written.attempts,
            "graded submission"
        );
        self.sink.emit(TrackingEvent::ProblemGraded {
            learner_id: req.learner_id.clone(),
            usage_key: usage_key.clone(),
            score,
            attempts: written.attempts,
        });

        // Roll the new score up into the course grade. The write lock is
        // released by now; aggregation runs outside it.
        let course_grade = self.course_grade(req, &tree).await?;
        self.sink.emit(TrackingEvent::GradesUpdated {
            learner_id: req.learner_id.clone(),
            course_key: tree.course_key().clone(),
            percent: course_grade.percent,
            passed: course_grade.passed,
        });

        Ok(SubmitOutcome {
            usage_key,
            result,
            state: StateSnapshot::from(&written),
            unchanged: false,
        })
    }

    /// The ordered, learner-visible units of a subsection with completion
    /// flags.
    pub async fn sequence(
        &self,
        req: &RequestContext,
        course_key: &str,
        section: &str,
        subsection: &str,
    ) -> Result<SequenceModel, CoordinatorError> {
        let course_key: CourseKey = course_key.parse()?;
        let now = Utc::now();

        let tree = self.course_tree(req, &course_key).await?;

        // Resolve section/subsection ids along the tree.
        let root = tree.root_key().clone();
        let section_block = tree
            .children_of(&root)
            .into_iter()
            .find(|block| block.usage_key.block_id() == section)
            .ok_or(CoordinatorError::Denied(DenyReason::NotFound))?;
        let subsection_block = tree
            .children_of(&section_block.usage_key)
            .into_iter()
            .find(|block| block.usage_key.block_id() == subsection)
            .ok_or(CoordinatorError::Denied(DenyReason::NotFound))?;
        let subsection_key = subsection_block.usage_key.clone();

        let (ctx, _) = self.learner_context(req, &tree, None).await?;
        self.require_access(&tree, &subsection_key, &ctx, Action::Load, now)?;

        let view = LearnerView {
            staff: ctx.staff,
            groups: ctx.groups.clone(),
        };
        let units: Vec<_> =
            coursekit_store::visible_children(&tree, &subsection_key, &view, now);

        let unit_keys: Vec<UsageKey> =
            units.iter().map(|unit| unit.usage_key.clone()).collect();
        let states = self
            .bounded(req, self.state.get_many(&req.learner_id, &unit_keys))
            .await?
            .map_err(store_error)?;

        Ok(SequenceModel {
            subsection: subsection_key,
            display_name: subsection_block.display_name.clone(),
            units: units
                .into_iter()
                .map(|unit| UnitModel {
                    usage_key: unit.usage_key.clone(),
                    display_name: unit.display_name.clone(),
                    complete: states
                        .get(&unit.usage_key)
                        .map(|state| state.done)
                        .unwrap_or(false),
                })
                .collect(),
        })
    }

    /// The learner-visible course tree, `depth` levels deep (`-1` for the
    /// whole tree).
    pub async fn course_outline(
        &self,
        req: &RequestContext,
        course_key: &str,
        depth: i32,
    ) -> Result<OutlineNode, CoordinatorError> {
        let course_key: CourseKey = course_key.parse()?;
        let now = Utc::now();

        let tree = self.course_tree(req, &course_key).await?;
        let (ctx, _) = self.learner_context(req, &tree, None).await?;

        let root = tree.root_key().clone();
        self.require_access(&tree, &root, &ctx, Action::Load, now)?;

        let view = LearnerView {
            staff: ctx.staff,
            groups: ctx.groups.clone(),
        };
        Ok(outline_node(&tree, &root, &view, now, depth)
            .expect("access check passed, the root is visible"))
    }

    /// Category scores, course score and pass/fail for a learner.
    pub async fn progress(
        &self,
        req: &RequestContext,
        course_key: &str,
    ) -> Result<ProgressModel, CoordinatorError> {
        let course_key: CourseKey = course_key.parse()?;
        let now = Utc::now();

        let tree = self.course_tree(req, &course_key).await?;
        let (ctx, _) = self.learner_context(req, &tree, None).await?;

        let root = tree.root_key().clone();
        self.require_access(&tree, &root, &ctx, Action::Load, now)?;

        let grade = self.course_grade(req, &tree).await?;
        Ok(ProgressModel { course_key, grade })
    }

    /// Record completion of a block the learner can see.
    pub async fn mark_complete(
        &self,
        req: &RequestContext,
        usage_key: &str,
    ) -> Result<StateSnapshot, CoordinatorError> {
        let usage_key: UsageKey = usage_key.parse()?;
        let now = Utc::now();

        let tree = self.course_tree(req, usage_key.course_key()).await?;
        let (ctx, _) = self.learner_context(req, &tree, None).await?;
        self.require_access(&tree, &usage_key, &ctx, Action::Load, now)?;

        let written = self
            .bounded(req, self.state.mark_done(&req.learner_id, &usage_key))
            .await?
            .map_err(store_error)?;
        Ok(StateSnapshot::from(&written))
    }

    // ------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------

    /// Race a store future against the request deadline.
    async fn bounded<T, F>(&self, req: &RequestContext, fut: F) -> Result<T, CoordinatorError>
    where
        F: Future<Output = T>,
    {
        match req.deadline {
            None => Ok(fut.await),
            Some(deadline) => {
                tokio::time::timeout_at(tokio::time::Instant::from_std(deadline), fut)
                    .await
                    .map_err(|_| CoordinatorError::StoreUnavailable)
            }
        }
    }

    async fn course_tree(
        &self,
        req: &RequestContext,
        course_key: &CourseKey,
    ) -> Result<Arc<BlockTree>, CoordinatorError> {
        let mut trees = req.trees.lock().await;
        self.bounded(req, trees.course(&self.blocks, course_key))
            .await?
            .map_err(store_error)?
            .ok_or(CoordinatorError::Denied(DenyReason::NotFound))
    }

    /// Resolve stores into the learner context the access rules consume.
    ///
    /// Returns the prior state of `target` too when one is given, so
    /// callers get attempts and grading state out of the same round trips.
    async fn learner_context(
        &self,
        req: &RequestContext,
        tree: &BlockTree,
        target: Option<&UsageKey>,
    ) -> Result<(LearnerContext, Option<LearnerBlockState>), CoordinatorError> {
        let enrollment = self
            .bounded(
                req,
                self.enrollments.enrollment(&req.learner_id, tree.course_key()),
            )
            .await?
            .map_err(store_error)?;

        let groups = self
            .bounded(req, self.partitions.resolve_groups(&req.learner_id, tree))
            .await?
            .map_err(partition_error)?;

        // Completion state of every subsection, for prerequisite checks,
        // plus the target block's own record, in one round trip.
        let mut keys: Vec<UsageKey> = tree
            .blocks()
            .filter(|block| block.block_type() == &BlockType::Sequential)
            .map(|block| block.usage_key.clone())
            .collect();
        if let Some(target) = target {
            keys.push(target.clone());
        }
        let mut states = self
            .bounded(req, self.state.get_many(&req.learner_id, &keys))
            .await?
            .map_err(store_error)?;

        let prior = target.and_then(|target| states.remove(target));
        let completed: HashSet<UsageKey> = states
            .into_iter()
            .filter(|(_, state)| state.done)
            .map(|(key, _)| key)
            .collect();

        let ctx = LearnerContext {
            learner_id: req.learner_id.clone(),
            staff: req.staff,
            country: req.country.clone(),
            enrollment,
            groups,
            completed,
            attempts_used: prior.as_ref().map(|state| state.attempts).unwrap_or(0),
        };
        Ok((ctx, prior))
    }

    fn require_access(
        &self,
        tree: &BlockTree,
        usage_key: &UsageKey,
        ctx: &LearnerContext,
        action: Action,
        now: DateTime<Utc>,
    ) -> Result<(), CoordinatorError> {
        match check_access(tree, usage_key, ctx, action, now) {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(reason) => Err(CoordinatorError::Denied(reason)),
        }
    }

    /// Aggregate the learner's graded blocks into a course grade.
    async fn course_grade(
        &self,
        req: &RequestContext,
        tree: &BlockTree,
    ) -> Result<CourseGrade, CoordinatorError> {
        let graded = graded_problems(tree);
        let keys: Vec<UsageKey> = graded.keys().cloned().collect();
        let states = self
            .bounded(req, self.state.get_many(&req.learner_id, &keys))
            .await?
            .map_err(store_error)?;

        let blocks: Vec<GradedBlock> = states
            .into_iter()
            .filter_map(|(usage_key, state)| {
                let score = state.score?;
                let category = graded.get(&usage_key)?.clone();
                Some(GradedBlock {
                    usage_key,
                    category,
                    score,
                })
            })
            .collect();

        Ok(aggregate(&tree.config().grading_policy, &blocks))
    }

    /// Stable per-(learner, block) seed for problem randomization, derived
    /// from the configured entropy.
    fn problem_seed(&self, learner_id: &LearnerId, usage_key: &UsageKey) -> u64 {
        // FNV-1a over the seed bytes and the identifying tuple.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        let usage_key_str = usage_key.to_string();
        let bytes = self
            .settings
            .partition_seed
            .as_bytes()
            .iter()
            .copied()
            .chain(learner_id.as_str().bytes())
            .chain([0u8])
            .chain(usage_key_str.bytes());
        for byte in bytes {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
        }
        hash
    }
}

/// Problem blocks that feed the course grade, with their assignment
/// category: every problem under a graded subsection that declares one.
fn graded_problems(tree: &BlockTree) -> HashMap<UsageKey, String> {
    let mut out = HashMap::new();
    for block in tree.blocks() {
        if block.block_type() != &BlockType::Sequential || !block.fields.graded {
            continue;
        }
        let Some(category) = &block.fields.format else {
            continue;
        };
        for descendant in tree.walk(&block.usage_key, -1) {
            if descendant.block_type() == &BlockType::Problem {
                out.insert(descendant.usage_key.clone(), category.clone());
            }
        }
    }
    out
}

fn outline_node(
    tree: &BlockTree,
    from: &UsageKey,
    view: &LearnerView,
    now: DateTime<Utc>,
    depth: i32,
) -> Option<OutlineNode> {
    let block = tree.get(from)?;
    if !coursekit_store::is_visible(tree, block, view, now) {
        return None;
    }

    let children = if depth == 0 {
        Vec::new()
    } else {
        let next = if depth < 0 { depth } else { depth - 1 };
        block
            .children
            .iter()
            .filter_map(|child| outline_node(tree, child, view, now, next))
            .collect()
    };

    Some(OutlineNode {
        usage_key: block.usage_key.clone(),
        block_type: block.block_type().clone(),
        display_name: block.display_name.clone(),
        children,
    })
}

fn partition_error<E>(err: PartitionError<E>) -> CoordinatorError
where
    E: Into<coursekit_store::StoreError> + std::fmt::Display,
{
    match err {
        PartitionError::Store(err) => store_error(err),
        other => CoordinatorError::Content(other.to_string()),
    }
}
