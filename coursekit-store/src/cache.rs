// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request-scoped course-tree cache.
//!
//! The coordinator walks several paths through the same course while
//! serving one request; without a cache every path re-fetches the tree.
//! The cache stores the untransformed tree only — learner overlays are
//! applied on read — so the key is just the course. It is owned by a single
//! request and never crosses request boundaries; publish invalidation is
//! the block store's own concern.

use std::collections::HashMap;
use std::sync::Arc;

use coursekit_core::keys::CourseKey;
use coursekit_core::tree::BlockTree;

use crate::traits::BlockStore;

/// Per-request memo of fetched course trees. Negative results are cached
/// too: a course that was absent at the start of a request stays absent for
/// its duration.
#[derive(Debug, Default)]
pub struct TreeCache {
    trees: HashMap<CourseKey, Option<Arc<BlockTree>>>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The course tree, fetched through `store` on first use.
    pub async fn course<S: BlockStore>(
        &mut self,
        store: &S,
        course_key: &CourseKey,
    ) -> Result<Option<Arc<BlockTree>>, S::Error> {
        if let Some(cached) = self.trees.get(course_key) {
            return Ok(cached.clone());
        }
        let fetched = store.get_course(course_key).await?;
        self.trees.insert(course_key.clone(), fetched.clone());
        Ok(fetched)
    }

    /// Number of courses memoised so far.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
