// SPDX-License-Identifier: MIT OR Apache-2.0

//! The partition service: stable group assignment within course partitions.
//!
//! Assignment is deterministic-random on first access — drawn from a ChaCha
//! stream seeded by the configured partition entropy and the
//! `(learner, course, partition)` tuple — then persisted under a uniqueness
//! constraint. A request that loses the constraint race discards its pick
//! and adopts the winner, so repeated calls always agree.

use std::collections::BTreeMap;
use std::sync::Arc;

use coursekit_core::events::{TrackingEvent, TrackingSink};
use coursekit_core::keys::CourseKey;
use coursekit_core::learner::LearnerId;
use coursekit_core::partition::{GroupId, PartitionId, UserPartition};
use coursekit_core::settings::PartitionSeed;
use coursekit_core::tree::BlockTree;
use coursekit_store::traits::GroupAssignmentStore;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PartitionError<E> {
    #[error("no partition {0} declared on the course")]
    NoSuchPartition(PartitionId),

    #[error("partition {0} has no groups to assign")]
    EmptyPartition(PartitionId),

    #[error(transparent)]
    Store(E),
}

/// Assigns and resolves partition groups against a persistent store.
pub struct PartitionService<A> {
    assignments: A,
    seed: PartitionSeed,
    sink: Arc<dyn TrackingSink>,
}

impl<A> PartitionService<A>
where
    A: GroupAssignmentStore,
{
    pub fn new(assignments: A, seed: PartitionSeed, sink: Arc<dyn TrackingSink>) -> Self {
        Self {
            assignments,
            seed,
            sink,
        }
    }

    /// Replace the tracking sink.
    pub fn with_sink(mut self, sink: Arc<dyn TrackingSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The partitions declared on a course.
    pub fn list_partitions<'a>(&self, tree: &'a BlockTree) -> &'a [UserPartition] {
        &tree.config().user_partitions
    }

    /// The learner's stable group in one partition, assigning on first
    /// access.
    ///
    /// When a persisted assignment points at a group that has since
    /// disappeared from the partition definition, the learner is reassigned
    /// deterministically among the surviving groups and the replacement is
    /// persisted.
    pub async fn group_for(
        &self,
        learner_id: &LearnerId,
        tree: &BlockTree,
        partition_id: PartitionId,
    ) -> Result<GroupId, PartitionError<A::Error>> {
        let partition = tree
            .config()
            .partition(partition_id)
            .ok_or(PartitionError::NoSuchPartition(partition_id))?;
        let course_key = tree.course_key();

        if let Some(stored) = self
            .assignments
            .assignment(learner_id, course_key, partition_id)
            .await
            .map_err(PartitionError::Store)?
        {
            if partition.contains_group(stored) {
                return Ok(stored);
            }
            return self
                .reassign(learner_id, course_key, partition, stored)
                .await;
        }

        let chosen = self.choose(learner_id, course_key, partition, b"assign")?;
        let winner = self
            .assignments
            .insert_if_absent(learner_id, course_key, partition_id, chosen)
            .await
            .map_err(PartitionError::Store)?;

        if winner == chosen {
            debug!(
                learner = %learner_id,
                course = %course_key,
                partition = %partition_id,
                group = %winner,
                "assigned partition group"
            );
            self.sink.emit(TrackingEvent::PartitionAssigned {
                learner_id: learner_id.clone(),
                course_key: course_key.clone(),
                partition_id,
                group_id: winner,
            });
        }

        Ok(winner)
    }

    /// Resolve the learner's group in every partition the course declares.
    /// Used to build the overlay view ahead of filtering and access checks.
    pub async fn resolve_groups(
        &self,
        learner_id: &LearnerId,
        tree: &BlockTree,
    ) -> Result<BTreeMap<PartitionId, GroupId>, PartitionError<A::Error>> {
        let mut groups = BTreeMap::new();
        for partition in &tree.config().user_partitions {
            let group = self.group_for(learner_id, tree, partition.id).await?;
            groups.insert(partition.id, group);
        }
        Ok(groups)
    }

    async fn reassign(
        &self,
        learner_id: &LearnerId,
        course_key: &CourseKey,
        partition: &UserPartition,
        stale: GroupId,
    ) -> Result<GroupId, PartitionError<A::Error>> {
        let replacement = self.choose(learner_id, course_key, partition, b"reassign")?;
        self.assignments
            .replace(learner_id, course_key, partition.id, replacement)
            .await
            .map_err(PartitionError::Store)?;

        debug!(
            learner = %learner_id,
            course = %course_key,
            partition = %partition.id,
            from = %stale,
            to = %replacement,
            "reassigned partition group"
        );
        self.sink.emit(TrackingEvent::PartitionReassigned {
            learner_id: learner_id.clone(),
            course_key: course_key.clone(),
            partition_id: partition.id,
            from_group: stale,
            to_group: replacement,
        });

        Ok(replacement)
    }

    /// Deterministic uniform choice among the partition's groups.
    fn choose(
        &self,
        learner_id: &LearnerId,
        course_key: &CourseKey,
        partition: &UserPartition,
        salt: &[u8],
    ) -> Result<GroupId, PartitionError<A::Error>> {
        if partition.groups.is_empty() {
            return Err(PartitionError::EmptyPartition(partition.id));
        }

        let mut seed = *self.seed.as_bytes();
        let tuple = format!("{}|{}|{}", learner_id, course_key, partition.id);
        for (i, byte) in tuple.bytes().chain(salt.iter().copied()).enumerate() {
            let slot = i % seed.len();
            seed[slot] = seed[slot].rotate_left(3) ^ byte;
        }

        let mut rng = ChaCha8Rng::from_seed(seed);
        let index = rng.random_range(0..partition.groups.len());
        Ok(partition.groups[index].id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use coursekit_core::course::CourseConfig;
    use coursekit_core::events::{RecordingSink, TrackingEvent};
    use coursekit_core::learner::LearnerId;
    use coursekit_core::partition::{Group, PartitionId, UserPartition};
    use coursekit_core::settings::{PartitionSeed, SEED_LEN};
    use coursekit_core::test_utils::CourseBuilder;
    use coursekit_core::tree::BlockTree;
    use coursekit_store::memory::MemoryAssignmentStore;
    use coursekit_store::traits::GroupAssignmentStore;

    use super::{PartitionError, PartitionService};

    fn course_with_partition(groups: Vec<Group>) -> BlockTree {
        let mut config = CourseConfig::default();
        config
            .user_partitions
            .push(UserPartition::new(50, "cohort", groups));
        CourseBuilder::new("course-v1:Org+Course+2024")
            .with_config(config)
            .build()
    }

    fn service(
        store: MemoryAssignmentStore,
        sink: &RecordingSink,
    ) -> PartitionService<MemoryAssignmentStore> {
        PartitionService::new(
            store,
            PartitionSeed::from_bytes([7; SEED_LEN]),
            Arc::new(sink.clone()),
        )
    }

    #[tokio::test]
    async fn assignment_is_stable_and_emitted_once() {
        let tree = course_with_partition(vec![Group::new(1, "A"), Group::new(2, "B")]);
        let sink = RecordingSink::new();
        let service = service(MemoryAssignmentStore::new(), &sink);
        let learner: LearnerId = "learner-1".parse().unwrap();

        let first = service
            .group_for(&learner, &tree, PartitionId(50))
            .await
            .unwrap();
        for _ in 0..5 {
            let again = service
                .group_for(&learner, &tree, PartitionId(50))
                .await
                .unwrap();
            assert_eq!(again, first);
        }

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            TrackingEvent::PartitionAssigned { group_id, .. } if *group_id == first
        ));
    }

    #[tokio::test]
    async fn losing_the_insert_race_adopts_the_winner() {
        let tree = course_with_partition(vec![Group::new(1, "A"), Group::new(2, "B")]);
        let sink = RecordingSink::new();
        let store = MemoryAssignmentStore::new();
        let service = service(store.clone(), &sink);
        let learner: LearnerId = "learner-1".parse().unwrap();

        // Another request persisted group 2 first.
        store
            .insert_if_absent(
                &learner,
                tree.course_key(),
                PartitionId(50),
                coursekit_core::partition::GroupId(2),
            )
            .await
            .unwrap();

        let group = service
            .group_for(&learner, &tree, PartitionId(50))
            .await
            .unwrap();
        assert_eq!(group, coursekit_core::partition::GroupId(2));
        // The loser does not emit an assignment event.
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn vanished_group_triggers_deterministic_reassignment() {
        let sink = RecordingSink::new();
        let store = MemoryAssignmentStore::new();
        let learner: LearnerId = "learner-1".parse().unwrap();

        // Assign against a partition whose group 9 later disappears.
        let before = course_with_partition(vec![Group::new(9, "old")]);
        let service_before = service(store.clone(), &sink);
        let stale = service_before
            .group_for(&learner, &before, PartitionId(50))
            .await
            .unwrap();
        assert_eq!(stale, coursekit_core::partition::GroupId(9));

        let after = course_with_partition(vec![Group::new(1, "A"), Group::new(2, "B")]);
        let service_after = service(store.clone(), &sink);
        let replacement = service_after
            .group_for(&learner, &after, PartitionId(50))
            .await
            .unwrap();
        assert_ne!(replacement, stale);

        // Reassignment happened once; subsequent reads return the stored
        // replacement without another event.
        let again = service_after
            .group_for(&learner, &after, PartitionId(50))
            .await
            .unwrap();
        assert_eq!(again, replacement);

        let reassignments = sink
            .events()
            .into_iter()
            .filter(|event| matches!(event, TrackingEvent::PartitionReassigned { .. }))
            .count();
        assert_eq!(reassignments, 1);
    }

    #[tokio::test]
    async fn lists_declared_partitions() {
        let tree = course_with_partition(vec![Group::new(1, "A")]);
        let sink = RecordingSink::new();
        let service = service(MemoryAssignmentStore::new(), &sink);

        let partitions = service.list_partitions(&tree);
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].id, PartitionId(50));
        assert_eq!(partitions[0].name, "cohort");
    }

    #[tokio::test]
    async fn unknown_partition_is_an_error() {
        let tree = course_with_partition(vec![Group::new(1, "A")]);
        let sink = RecordingSink::new();
        let service = service(MemoryAssignmentStore::new(), &sink);
        let learner: LearnerId = "learner-1".parse().unwrap();

        let result = service.group_for(&learner, &tree, PartitionId(99)).await;
        assert!(matches!(
            result,
            Err(PartitionError::NoSuchPartition(PartitionId(99)))
        ));
    }

    #[tokio::test]
    async fn different_learners_spread_across_groups() {
        let tree = course_with_partition(vec![
            Group::new(1, "A"),
            Group::new(2, "B"),
            Group::new(3, "C"),
            Group::new(4, "D"),
        ]);
        let sink = RecordingSink::new();
        let service = service(MemoryAssignmentStore::new(), &sink);

        let mut seen = std::collections::HashSet::new();
        for i in 0..40 {
            let learner: LearnerId = format!("learner-{}", i).parse().unwrap();
            let group = service
                .group_for(&learner, &tree, PartitionId(50))
                .await
                .unwrap();
            seen.insert(group);
        }
        // Uniform choice over 40 learners is all but certain to hit more
        // than one of four groups.
        assert!(seen.len() > 1);
    }
}
