// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory reference implementations of the store interfaces.
//!
//! Each store wraps its table in `Arc<RwLock<_>>` so clones share state
//! across tasks, with `read_store`/`write_store` accessors for tests that
//! need to poke at the raw table.

mod assignments;
mod blocks;
mod enrollments;
mod state;

pub use assignments::MemoryAssignmentStore;
pub use blocks::MemoryBlockStore;
pub use enrollments::MemoryEnrollmentStore;
pub use state::MemoryStateStore;
