// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store wrappers for exercising failure paths in tests.

use std::sync::Arc;
use std::time::Duration;

use coursekit_core::block::Block;
use coursekit_core::keys::{CourseKey, UsageKey};
use coursekit_core::tree::BlockTree;

use crate::traits::BlockStore;

/// Delays every call to the wrapped block store. Used to drive deadline and
/// timeout behaviour in coordinator tests.
pub struct SlowBlockStore<S> {
    inner: S,
    delay: Duration,
}

impl<S> SlowBlockStore<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl<S: BlockStore> BlockStore for SlowBlockStore<S> {
    type Error = S::Error;

    async fn get_course(
        &self,
        course_key: &CourseKey,
    ) -> Result<Option<Arc<BlockTree>>, Self::Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_course(course_key).await
    }

    async fn get_block(&self, usage_key: &UsageKey) -> Result<Option<Block>, Self::Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_block(usage_key).await
    }
}
