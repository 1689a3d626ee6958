// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-learner filtering over immutable course trees.
//!
//! The block store only ever hands out the untransformed tree; what a given
//! learner sees is computed here as a pure function of the tree and a
//! resolved learner view. Caches therefore never need to include learner
//! identity in their keys.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use coursekit_core::block::Block;
use coursekit_core::keys::UsageKey;
use coursekit_core::partition::{GroupId, PartitionId};
use coursekit_core::tree::BlockTree;

/// A learner's resolved standing for overlay purposes: staff capability and
/// the group assignments relevant to the course.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LearnerView {
    pub staff: bool,
    pub groups: BTreeMap<PartitionId, GroupId>,
}

impl LearnerView {
    pub fn staff() -> Self {
        Self {
            staff: true,
            groups: BTreeMap::new(),
        }
    }

    pub fn with_group(mut self, partition: PartitionId, group: GroupId) -> Self {
        self.groups.insert(partition, group);
        self
    }

    /// Whether the learner's assignments satisfy a block's own
    /// partition-group restriction.
    fn passes_group_access(&self, block: &Block) -> bool {
        block
            .fields
            .group_access
            .partitions()
            .all(|(partition, allowed)| match self.groups.get(partition) {
                Some(group) => allowed.contains(group),
                // No assignment for a restricted partition hides the block;
                // assignment is resolved lazily before filtering, so this
                // only happens for partitions that no longer exist.
                None => false,
            })
    }
}

/// The learner-visible ordered children of a block.
///
/// Applies, in order: partition-group restrictions, the staff-only flag and
/// release dates (both inherited state is already accounted for, since a
/// hidden parent is never traversed to begin with). Original order of the
/// surviving children is preserved.
pub fn visible_children<'a>(
    tree: &'a BlockTree,
    parent: &UsageKey,
    view: &LearnerView,
    now: DateTime<Utc>,
) -> Vec<&'a Block> {
    tree.children_of(parent)
        .into_iter()
        .filter(|block| is_visible(tree, block, view, now))
        .collect()
}

/// Whether a single block survives the learner overlay. Only the block's own
/// predicates are consulted; caller-side traversal handles ancestors.
pub fn is_visible(
    tree: &BlockTree,
    block: &Block,
    view: &LearnerView,
    now: DateTime<Utc>,
) -> bool {
    if view.staff {
        return true;
    }
    if block.fields.staff_only {
        return false;
    }
    if !view.passes_group_access(block) {
        return false;
    }
    Block::is_released(tree.effective_start(&block.usage_key), now)
}

/// The learner-visible subtree, pre-order, bounded by `depth` (`-1` for the
/// whole tree). Children of hidden blocks are not traversed.
pub fn visible_subtree<'a>(
    tree: &'a BlockTree,
    from: &UsageKey,
    view: &LearnerView,
    now: DateTime<Utc>,
    depth: i32,
) -> Vec<&'a Block> {
    let mut out = Vec::new();
    if let Some(block) = tree.get(from) {
        if is_visible(tree, block, view, now) {
            collect_visible(tree, block, view, now, depth, &mut out);
        }
    }
    out
}

fn collect_visible<'a>(
    tree: &'a BlockTree,
    block: &'a Block,
    view: &LearnerView,
    now: DateTime<Utc>,
    depth: i32,
    out: &mut Vec<&'a Block>,
) {
    out.push(block);
    if depth == 0 {
        return;
    }
    let next = if depth < 0 { depth } else { depth - 1 };
    for child in visible_children(tree, &block.usage_key, view, now) {
        collect_visible(tree, child, view, now, next, out);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use coursekit_core::block::{BlockFields, BlockType, GroupAccess};
    use coursekit_core::partition::{GroupId, PartitionId};
    use coursekit_core::test_utils::CourseBuilder;

    use super::{LearnerView, visible_children, visible_subtree};

    #[test]
    fn partition_restrictions_drop_children() {
        let mut builder = CourseBuilder::new("course-v1:Org+Course+2024");
        let root = builder.root_key();
        let chapter = builder.add(&root, BlockType::Chapter, "week1");

        let restricted_fields = BlockFields {
            group_access: GroupAccess::new().restrict(PartitionId(50), vec![GroupId(1)]),
            ..BlockFields::default()
        };
        builder.add_block(&chapter, BlockType::Sequential, "s1", restricted_fields);
        builder.add(&chapter, BlockType::Sequential, "s2");
        let tree = builder.build();

        let now = Utc::now();

        let in_group_a = LearnerView::default().with_group(PartitionId(50), GroupId(1));
        let seen: Vec<_> = visible_children(&tree, &chapter, &in_group_a, now)
            .iter()
            .map(|b| b.usage_key.block_id().to_owned())
            .collect();
        assert_eq!(seen, vec!["s1", "s2"]);

        let in_group_b = LearnerView::default().with_group(PartitionId(50), GroupId(2));
        let seen: Vec<_> = visible_children(&tree, &chapter, &in_group_b, now)
            .iter()
            .map(|b| b.usage_key.block_id().to_owned())
            .collect();
        assert_eq!(seen, vec!["s2"]);
    }

    #[test]
    fn staff_only_and_unreleased_blocks_hidden_from_learners() {
        let mut builder = CourseBuilder::new("course-v1:Org+Course+2024");
        let root = builder.root_key();
        let chapter = builder.add(&root, BlockType::Chapter, "week1");

        builder.add_block(
            &chapter,
            BlockType::Vertical,
            "hidden",
            BlockFields {
                staff_only: true,
                ..BlockFields::default()
            },
        );
        builder.add_block(
            &chapter,
            BlockType::Vertical,
            "future",
            BlockFields {
                start: Some(Utc::now() + Duration::days(7)),
                ..BlockFields::default()
            },
        );
        builder.add(&chapter, BlockType::Vertical, "open");
        let tree = builder.build();

        let now = Utc::now();
        let learner = LearnerView::default();
        let seen: Vec<_> = visible_children(&tree, &chapter, &learner, now)
            .iter()
            .map(|b| b.usage_key.block_id().to_owned())
            .collect();
        assert_eq!(seen, vec!["open"]);

        // Staff see everything.
        let staff = LearnerView::staff();
        assert_eq!(visible_children(&tree, &chapter, &staff, now).len(), 3);
    }

    #[test]
    fn hidden_parents_hide_their_subtrees() {
        let mut builder = CourseBuilder::new("course-v1:Org+Course+2024");
        let root = builder.root_key();
        let chapter = builder.add(&root, BlockType::Chapter, "week1");
        let hidden = builder.add_block(
            &chapter,
            BlockType::Sequential,
            "hidden",
            BlockFields {
                staff_only: true,
                ..BlockFields::default()
            },
        );
        builder.add(&hidden, BlockType::Vertical, "inside");
        let tree = builder.build();

        let learner = LearnerView::default();
        let seen = visible_subtree(&tree, &root, &learner, Utc::now(), -1);
        let ids: Vec<_> = seen.iter().map(|b| b.usage_key.block_id()).collect();
        assert_eq!(ids, vec!["course", "week1"]);
    }
}
