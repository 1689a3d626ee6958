// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory published-course repository.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use coursekit_core::block::Block;
use coursekit_core::keys::{CourseKey, UsageKey};
use coursekit_core::tree::{BlockTree, RawTree, TreeError};
use tracing::debug;

use crate::traits::{BlockStore, StoreError};

type PublishHook = Box<dyn Fn(&CourseKey) + Send + Sync>;

#[derive(Default)]
pub struct InnerBlockStore {
    courses: HashMap<CourseKey, Arc<BlockTree>>,
    /// Bumped on every publish; longer-lived caches compare generations.
    generation: u64,
}

impl InnerBlockStore {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// An in-memory block store holding published course trees.
///
/// Publishing swaps the whole tree atomically and notifies subscribed
/// caches; readers holding an `Arc` to the previous tree keep a consistent
/// snapshot for the rest of their request.
#[derive(Clone)]
pub struct MemoryBlockStore {
    inner: Arc<RwLock<InnerBlockStore>>,
    hooks: Arc<RwLock<Vec<PublishHook>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(InnerBlockStore::default())),
            hooks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Obtain a read-lock on the store.
    pub fn read_store(&self) -> RwLockReadGuard<'_, InnerBlockStore> {
        self.inner
            .read()
            .expect("acquire shared read access on store")
    }

    /// Obtain a write-lock on the store.
    pub fn write_store(&self) -> RwLockWriteGuard<'_, InnerBlockStore> {
        self.inner
            .write()
            .expect("acquire exclusive write access on store")
    }

    /// Validate and publish a serialized tree, replacing any previous
    /// version of the course.
    pub fn publish(&self, raw: RawTree) -> Result<(), TreeError> {
        let tree = BlockTree::try_from(raw)?;
        let course_key = tree.course_key().clone();

        {
            let mut store = self.write_store();
            store.courses.insert(course_key.clone(), Arc::new(tree));
            store.generation += 1;
        }
        debug!(course = %course_key, "published course tree");

        let hooks = self.hooks.read().expect("acquire read access on hooks");
        for hook in hooks.iter() {
            hook(&course_key);
        }
        Ok(())
    }

    /// Remove a course, as when it is unpublished. Subscribed caches are
    /// notified like on publish.
    pub fn retract(&self, course_key: &CourseKey) {
        self.write_store().courses.remove(course_key);
        let hooks = self.hooks.read().expect("acquire read access on hooks");
        for hook in hooks.iter() {
            hook(course_key);
        }
    }

    /// Register a hook fired with the course key on every publish and
    /// retract. Longer-lived caches subscribe here.
    pub fn on_publish(&self, hook: impl Fn(&CourseKey) + Send + Sync + 'static) {
        self.hooks
            .write()
            .expect("acquire write access on hooks")
            .push(Box::new(hook));
    }
}

impl Default for MemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore for MemoryBlockStore {
    type Error = StoreError;

    async fn get_course(
        &self,
        course_key: &CourseKey,
    ) -> Result<Option<Arc<BlockTree>>, Self::Error> {
        Ok(self.read_store().courses.get(course_key).cloned())
    }

    async fn get_block(&self, usage_key: &UsageKey) -> Result<Option<Block>, Self::Error> {
        let store = self.read_store();
        Ok(store
            .courses
            .get(usage_key.course_key())
            .and_then(|tree| tree.get(usage_key))
            .cloned())
    }
}
