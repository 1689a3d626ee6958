// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory partition-group assignments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use coursekit_core::keys::CourseKey;
use coursekit_core::learner::LearnerId;
use coursekit_core::partition::{GroupId, PartitionId};

use crate::traits::{GroupAssignmentStore, StoreError};

type AssignmentKey = (LearnerId, CourseKey, PartitionId);

#[derive(Default)]
pub struct InnerAssignmentStore {
    assignments: HashMap<AssignmentKey, GroupId>,
}

/// An in-memory group assignment store.
///
/// The map entry is the uniqueness constraint: `insert_if_absent` returns
/// the stored winner when a concurrent call landed first, which is exactly
/// the behaviour the partition service builds its at-most-one guarantee on.
#[derive(Clone, Default)]
pub struct MemoryAssignmentStore {
    inner: Arc<RwLock<InnerAssignmentStore>>,
}

impl MemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain a read-lock on the store.
    pub fn read_store(&self) -> RwLockReadGuard<'_, InnerAssignmentStore> {
        self.inner
            .read()
            .expect("acquire shared read access on store")
    }

    /// Obtain a write-lock on the store.
    pub fn write_store(&self) -> RwLockWriteGuard<'_, InnerAssignmentStore> {
        self.inner
            .write()
            .expect("acquire exclusive write access on store")
    }
}

impl GroupAssignmentStore for MemoryAssignmentStore {
    type Error = StoreError;

    async fn assignment(
        &self,
        learner_id: &LearnerId,
        course_key: &CourseKey,
        partition_id: PartitionId,
    ) -> Result<Option<GroupId>, Self::Error> {
        Ok(self
            .read_store()
            .assignments
            .get(&(learner_id.clone(), course_key.clone(), partition_id))
            .copied())
    }

    async fn insert_if_absent(
        &self,
        learner_id: &LearnerId,
        course_key: &CourseKey,
        partition_id: PartitionId,
        group_id: GroupId,
    ) -> Result<GroupId, Self::Error> {
        let mut store = self.write_store();
        let stored = store
            .assignments
            .entry((learner_id.clone(), course_key.clone(), partition_id))
            .or_insert(group_id);
        Ok(*stored)
    }

    async fn replace(
        &self,
        learner_id: &LearnerId,
        course_key: &CourseKey,
        partition_id: PartitionId,
        group_id: GroupId,
    ) -> Result<(), Self::Error> {
        self.write_store()
            .assignments
            .insert((learner_id.clone(), course_key.clone(), partition_id), group_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use coursekit_core::keys::CourseKey;
    use coursekit_core::learner::LearnerId;
    use coursekit_core::partition::{GroupId, PartitionId};

    use crate::traits::GroupAssignmentStore;

    use super::MemoryAssignmentStore;

    #[tokio::test]
    async fn first_insert_wins() {
        let store = MemoryAssignmentStore::new();
        let learner: LearnerId = "learner-1".parse().unwrap();
        let course: CourseKey = "course-v1:Org+Course+2024".parse().unwrap();
        let partition = PartitionId(50);

        let winner = store
            .insert_if_absent(&learner, &course, partition, GroupId(1))
            .await
            .unwrap();
        assert_eq!(winner, GroupId(1));

        // A losing concurrent insert gets the winner back.
        let loser = store
            .insert_if_absent(&learner, &course, partition, GroupId(2))
            .await
            .unwrap();
        assert_eq!(loser, GroupId(1));

        assert_eq!(
            store.assignment(&learner, &course, partition).await.unwrap(),
            Some(GroupId(1))
        );
    }

    #[tokio::test]
    async fn replace_overwrites() {
        let store = MemoryAssignmentStore::new();
        let learner: LearnerId = "learner-1".parse().unwrap();
        let course: CourseKey = "course-v1:Org+Course+2024".parse().unwrap();
        let partition = PartitionId(50);

        store
            .insert_if_absent(&learner, &course, partition, GroupId(1))
            .await
            .unwrap();
        store
            .replace(&learner, &course, partition, GroupId(2))
            .await
            .unwrap();

        assert_eq!(
            store.assignment(&learner, &course, partition).await.unwrap(),
            Some(GroupId(2))
        );
    }
}
