// SPDX-License-Identifier: MIT OR Apache-2.0

//! Immutable published course trees.
//!
//! A [`BlockTree`] is validated once on load and never mutated afterwards.
//! Per-learner filtering is a pure function over the tree applied at read
//! time; caches hold the untransformed tree.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::{Block, BlockType};
use crate::course::CourseConfig;
use crate::keys::{CourseKey, UsageKey};

/// Error types raised when loading a serialized tree.
#[derive(Error, Debug, PartialEq)]
pub enum TreeError {
    #[error("course tree has no root block")]
    MissingRoot,

    #[error("course tree declares more than one course block")]
    DuplicateRoot,

    #[error("block {0} belongs to course {1}, not this tree's course")]
    ForeignBlock(UsageKey, CourseKey),

    #[error("block {0} declared twice")]
    DuplicateBlock(UsageKey),

    #[error("block {parent} references missing child {child}")]
    MissingChild { parent: UsageKey, child: UsageKey },

    #[error("block {child} has more than one parent")]
    MultipleParents { child: UsageKey },

    #[error("course tree contains a cycle")]
    Cycle,

    #[error("block {0} is unreachable from the root")]
    Unreachable(UsageKey),

    #[error("leaf block {0} declares children")]
    LeafWithChildren(UsageKey),
}

/// A validated, immutable course tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTree", into = "RawTree")]
pub struct BlockTree {
    course_key: CourseKey,
    config: CourseConfig,
    root: UsageKey,
    blocks: HashMap<UsageKey, Block>,
    parents: HashMap<UsageKey, UsageKey>,
}

/// The serialized shape a tree is published as: course settings plus a flat
/// block list. Structure is validated on conversion into [`BlockTree`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawTree {
    pub course_key: CourseKey,
    #[serde(default)]
    pub config: CourseConfig,
    pub blocks: Vec<Block>,
}

impl BlockTree {
    /// Validate and index a published block list.
    ///
    /// Rejects trees without a single `course` root, references to absent
    /// blocks, blocks with multiple parents, cycles, unreachable blocks and
    /// problem blocks with children.
    pub fn new(
        course_key: CourseKey,
        config: CourseConfig,
        blocks: Vec<Block>,
    ) -> Result<Self, TreeError> {
        let mut indexed: HashMap<UsageKey, Block> = HashMap::with_capacity(blocks.len());
        let mut root = None;

        for block in blocks {
            if block.usage_key.course_key() != &course_key {
                return Err(TreeError::ForeignBlock(
                    block.usage_key.clone(),
                    block.usage_key.course_key().clone(),
                ));
            }
            if block.block_type() == &BlockType::Course {
                if root.is_some() {
                    return Err(TreeError::DuplicateRoot);
                }
                root = Some(block.usage_key.clone());
            }
            if !block.block_type().is_container() && !block.children.is_empty() {
                return Err(TreeError::LeafWithChildren(block.usage_key.clone()));
            }
            if let Some(previous) = indexed.insert(block.usage_key.clone(), block) {
                return Err(TreeError::DuplicateBlock(previous.usage_key));
            }
        }

        let root = root.ok_or(TreeError::MissingRoot)?;

        // Index parents and check child references in one pass.
        let mut parents: HashMap<UsageKey, UsageKey> = HashMap::new();
        for block in indexed.values() {
            for child in &block.children {
                if !indexed.contains_key(child) {
                    return Err(TreeError::MissingChild {
                        parent: block.usage_key.clone(),
                        child: child.clone(),
                    });
                }
                if parents
                    .insert(child.clone(), block.usage_key.clone())
                    .is_some()
                {
                    return Err(TreeError::MultipleParents {
                        child: child.clone(),
                    });
                }
            }
        }

        // Cycle check over an integer graph; usage keys are mapped to dense
        // indices first.
        let index_of: HashMap<&UsageKey, usize> =
            indexed.keys().enumerate().map(|(i, k)| (k, i)).collect();
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for block in indexed.values() {
            let from = index_of[&block.usage_key];
            graph.add_node(from);
            for child in &block.children {
                graph.add_edge(from, index_of[child], ());
            }
        }
        if is_cyclic_directed(&graph) {
            return Err(TreeError::Cycle);
        }

        // Every non-root block must hang off the root.
        for key in indexed.keys() {
            if key == &root {
                continue;
            }
            let mut current = key;
            loop {
                match parents.get(current) {
                    Some(parent) if parent == &root => break,
                    Some(parent) => current = parent,
                    None => return Err(TreeError::Unreachable(key.clone())),
                }
            }
        }

        Ok(Self {
            course_key,
            config,
            root,
            blocks: indexed,
            parents,
        })
    }

    pub fn course_key(&self) -> &CourseKey {
        &self.course_key
    }

    pub fn config(&self) -> &CourseConfig {
        &self.config
    }

    pub fn root_key(&self) -> &UsageKey {
        &self.root
    }

    pub fn root(&self) -> &Block {
        &self.blocks[&self.root]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, key: &UsageKey) -> Option<&Block> {
        self.blocks.get(key)
    }

    pub fn contains(&self, key: &UsageKey) -> bool {
        self.blocks.contains_key(key)
    }

    /// Ordered children of a block. Unknown keys yield an empty slice.
    pub fn children_of(&self, key: &UsageKey) -> Vec<&Block> {
        match self.blocks.get(key) {
            Some(block) => block
                .children
                .iter()
                .filter_map(|child| self.blocks.get(child))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn parent_of(&self, key: &UsageKey) -> Option<&Block> {
        self.parents.get(key).and_then(|parent| self.blocks.get(parent))
    }

    /// Ancestors from the block's parent up to the root.
    pub fn ancestors_of<'a>(&'a self, key: &UsageKey) -> Vec<&'a Block> {
        let mut out = Vec::new();
        let mut current = key.clone();
        while let Some(parent) = self.parents.get(&current) {
            if let Some(block) = self.blocks.get(parent) {
                out.push(block);
            }
            current = parent.clone();
        }
        out
    }

    /// The release date effective for a block: its own, or the nearest
    /// ancestor's, or the course start.
    pub fn effective_start(&self, key: &UsageKey) -> Option<DateTime<Utc>> {
        if let Some(block) = self.blocks.get(key) {
            if let Some(start) = block.fields.start {
                return Some(start);
            }
        }
        for ancestor in self.ancestors_of(key) {
            if let Some(start) = ancestor.fields.start {
                return Some(start);
            }
        }
        self.config.start
    }

    /// Whether the block or any of its ancestors is staff-only.
    pub fn effective_staff_only(&self, key: &UsageKey) -> bool {
        self.blocks
            .get(key)
            .map(|block| block.fields.staff_only)
            .unwrap_or(false)
            || self.ancestors_of(key).iter().any(|b| b.fields.staff_only)
    }

    /// Pre-order depth-first walk from a block, bounded by `depth` levels of
    /// children (`0` = the block only, `-1` = unbounded).
    pub fn walk<'a>(&'a self, from: &UsageKey, depth: i32) -> Vec<&'a Block> {
        let mut out = Vec::new();
        if let Some(block) = self.blocks.get(from) {
            self.walk_into(block, depth, &mut out);
        }
        out
    }

    fn walk_into<'a>(&'a self, block: &'a Block, depth: i32, out: &mut Vec<&'a Block>) {
        out.push(block);
        if depth == 0 {
            return;
        }
        let next = if depth < 0 { depth } else { depth - 1 };
        for child in &block.children {
            if let Some(child) = self.blocks.get(child) {
                self.walk_into(child, next, out);
            }
        }
    }

    /// All blocks, in no particular order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }
}

impl TryFrom<RawTree> for BlockTree {
    type Error = TreeError;

    fn try_from(raw: RawTree) -> Result<Self, Self::Error> {
        BlockTree::new(raw.course_key, raw.config, raw.blocks)
    }
}

impl From<BlockTree> for RawTree {
    fn from(tree: BlockTree) -> Self {
        // Emit blocks in pre-order so serialisation is stable.
        let root = tree.root.clone();
        let blocks = tree.walk(&root, -1).into_iter().cloned().collect();
        RawTree {
            course_key: tree.course_key,
            config: tree.config,
            blocks,
        }
    }
}
