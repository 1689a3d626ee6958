// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory learner state with optimistic concurrency.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use coursekit_core::keys::UsageKey;
use coursekit_core::learner::LearnerId;
use tracing::warn;

use crate::state::{LearnerBlockState, StateDraft};
use crate::traits::{LearnerStateStore, StoreError};

type StateKey = (LearnerId, UsageKey);

#[derive(Default)]
pub struct InnerStateStore {
    records: HashMap<StateKey, LearnerBlockState>,
}

impl InnerStateStore {
    /// Number of state records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bump a record's version out-of-band. Test hook for provoking
    /// optimistic-lock conflicts.
    pub fn touch(&mut self, learner_id: &LearnerId, usage_key: &UsageKey) {
        if let Some(record) = self
            .records
            .get_mut(&(learner_id.clone(), usage_key.clone()))
        {
            record.version += 1;
        }
    }
}

/// In-memory learner state store.
///
/// `update` uses an optimistic version check: the prior record is
/// snapshotted, the pure update function runs outside any lock, and the
/// write applies only when the version is unchanged. Conflicted writes
/// re-run the function, up to the configured retry budget.
#[derive(Clone)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<InnerStateStore>>,
    write_retry: u32,
}

impl MemoryStateStore {
    /// `write_retry` is the `state.write_retry` setting: retries after the
    /// first attempt before a conflict surfaces.
    pub fn new(write_retry: u32) -> Self {
        Self {
            inner: Arc::new(RwLock::new(InnerStateStore::default())),
            write_retry,
        }
    }

    /// Obtain a read-lock on the store.
    pub fn read_store(&self) -> RwLockReadGuard<'_, InnerStateStore> {
        self.inner
            .read()
            .expect("acquire shared read access on store")
    }

    /// Obtain a write-lock on the store.
    pub fn write_store(&self) -> RwLockWriteGuard<'_, InnerStateStore> {
        self.inner
            .write()
            .expect("acquire exclusive write access on store")
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new(3)
    }
}

impl LearnerStateStore for MemoryStateStore {
    type Error = StoreError;

    async fn get(
        &self,
        learner_id: &LearnerId,
        usage_key: &UsageKey,
    ) -> Result<Option<LearnerBlockState>, Self::Error> {
        Ok(self
            .read_store()
            .records
            .get(&(learner_id.clone(), usage_key.clone()))
            .cloned())
    }

    async fn get_many(
        &self,
        learner_id: &LearnerId,
        usage_keys: &[UsageKey],
    ) -> Result<HashMap<UsageKey, LearnerBlockState>, Self::Error> {
        let store = self.read_store();
        let mut out = HashMap::new();
        for usage_key in usage_keys {
            if let Some(record) = store.records.get(&(learner_id.clone(), usage_key.clone())) {
                out.insert(usage_key.clone(), record.clone());
            }
        }
        Ok(out)
    }

    async fn update<F>(
        &self,
        learner_id: &LearnerId,
        usage_key: &UsageKey,
        f: F,
    ) -> Result<LearnerBlockState, Self::Error>
    where
        F: Fn(Option<&LearnerBlockState>) -> StateDraft + Send + Sync,
    {
        let key: StateKey = (learner_id.clone(), usage_key.clone());

        for attempt in 0..=self.write_retry {
            // Snapshot outside the write lock; the update function must not
            // run under it.
            let prior = self.read_store().records.get(&key).cloned();
            let expected_version = prior.as_ref().map(|record| record.version);

            let draft = f(prior.as_ref());

            let mut store = self.write_store();
            let current_version = store.records.get(&key).map(|record| record.version);
            if current_version != expected_version {
                drop(store);
                warn!(
                    learner = %learner_id,
                    block = %usage_key,
                    attempt,
                    "optimistic write conflict, retrying"
                );
                continue;
            }

            let record = LearnerBlockState {
                state: draft.state,
                score: draft.score,
                attempts: draft.attempts,
                done: draft.done,
                version: expected_version.map(|v| v + 1).unwrap_or(0),
                updated_at: Utc::now(),
            };
            store.records.insert(key, record.clone());
            return Ok(record);
        }

        Err(StoreError::Conflict)
    }
}
