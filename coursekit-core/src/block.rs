// SPDX-License-Identifier: MIT OR Apache-2.0

//! The block data model: nodes of the published course tree.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keys::UsageKey;
use crate::partition::{GroupId, PartitionId};

/// The closed set of block types the core understands.
///
/// Block types outside this set are carried as `Unknown` and rendered as an
/// opaque payload; they still participate in tree traversal and access
/// checks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Course,
    Chapter,
    Sequential,
    Vertical,
    Problem,
    Video,
    Html,
    #[serde(untagged)]
    Unknown(String),
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Course => "course",
            BlockType::Chapter => "chapter",
            BlockType::Sequential => "sequential",
            BlockType::Vertical => "vertical",
            BlockType::Problem => "problem",
            BlockType::Video => "video",
            BlockType::Html => "html",
            BlockType::Unknown(other) => other,
        }
    }

    /// Container blocks have children; leaves never do.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            BlockType::Course | BlockType::Chapter | BlockType::Sequential | BlockType::Vertical
        )
    }
}

impl From<&str> for BlockType {
    fn from(value: &str) -> Self {
        match value {
            "course" => BlockType::Course,
            "chapter" => BlockType::Chapter,
            "sequential" => BlockType::Sequential,
            "vertical" => BlockType::Vertical,
            "problem" => BlockType::Problem,
            "video" => BlockType::Video,
            "html" => BlockType::Html,
            other => BlockType::Unknown(other.to_owned()),
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Partition-group restrictions declared on a block.
///
/// Maps a partition to the groups allowed to see the block. A learner passes
/// when, for every listed partition, their assigned group appears in the
/// allowed set. An empty group list locks everybody out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAccess(BTreeMap<PartitionId, Vec<GroupId>>);

impl GroupAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restrict(mut self, partition: PartitionId, groups: Vec<GroupId>) -> Self {
        self.0.insert(partition, groups);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn partitions(&self) -> impl Iterator<Item = (&PartitionId, &[GroupId])> {
        self.0.iter().map(|(id, groups)| (id, groups.as_slice()))
    }

    /// Whether a group assignment satisfies the restriction on one partition.
    pub fn allows(&self, partition: PartitionId, group: GroupId) -> bool {
        match self.0.get(&partition) {
            Some(allowed) => allowed.contains(&group),
            None => true,
        }
    }
}

/// Typed per-block settings, inherited down the tree where noted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockFields {
    /// Release date; the block is invisible to non-staff before it.
    /// Inherited by children that declare none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,

    /// Submission due date for graded content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,

    /// Whether scores on this subtree count towards the course grade.
    #[serde(default)]
    pub graded: bool,

    /// Assignment category this block's score is filed under, e.g.
    /// "Homework". Only meaningful when `graded` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Maximum number of graded attempts; `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    /// Visible to course staff only.
    #[serde(default)]
    pub staff_only: bool,

    /// Enrollment modes allowed to interact with this block. Empty means any
    /// active enrollment suffices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_modes: Vec<crate::enrollment::EnrollmentMode>,

    /// Partition-group restriction.
    #[serde(default, skip_serializing_if = "GroupAccess::is_empty")]
    pub group_access: GroupAccess,

    /// Usage keys of subsections that must be complete before this one is
    /// accessible.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<UsageKey>,
}

/// Content payload of a block, by block type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BlockContent {
    /// Course root settings live in [`crate::course::CourseConfig`], carried
    /// on the tree rather than the payload.
    Course,
    Container,
    Html {
        html: String,
    },
    Video {
        /// Upstream source URL or asset reference.
        source: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_secs: Option<u32>,
    },
    /// Problem definitions are owned by the grader; the block store treats
    /// them as opaque JSON.
    Problem {
        definition: serde_json::Value,
    },
    /// Payload of block types outside the closed set.
    Unknown {
        data: serde_json::Value,
    },
}

/// A node in the course tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub usage_key: UsageKey,
    pub display_name: String,
    #[serde(default)]
    pub fields: BlockFields,
    pub content: BlockContent,
    /// Ordered children. Leaves have none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<UsageKey>,
}

impl Block {
    pub fn block_type(&self) -> &BlockType {
        self.usage_key.block_type()
    }

    /// Whether the block has been released at `now`, given the release date
    /// effective for it (own or inherited).
    pub fn is_released(effective_start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match effective_start {
            Some(start) => start <= now,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockType, GroupAccess};
    use crate::partition::{GroupId, PartitionId};

    #[test]
    fn block_type_round_trips_through_strings() {
        for raw in ["course", "chapter", "sequential", "vertical", "problem", "video", "html"] {
            let block_type = BlockType::from(raw);
            assert_eq!(block_type.as_str(), raw);
        }

        let custom = BlockType::from("word_cloud");
        assert_eq!(custom, BlockType::Unknown("word_cloud".to_owned()));
        assert_eq!(custom.as_str(), "word_cloud");
    }

    #[test]
    fn block_type_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&BlockType::Sequential).unwrap();
        assert_eq!(json, "\"sequential\"");
        let back: BlockType = serde_json::from_str("\"word_cloud\"").unwrap();
        assert_eq!(back, BlockType::Unknown("word_cloud".to_owned()));
    }

    #[test]
    fn group_access_checks_membership_per_partition() {
        let access = GroupAccess::new().restrict(PartitionId(50), vec![GroupId(1), GroupId(2)]);

        assert!(access.allows(PartitionId(50), GroupId(1)));
        assert!(!access.allows(PartitionId(50), GroupId(3)));
        // Partitions without a restriction do not constrain anybody.
        assert!(access.allows(PartitionId(99), GroupId(7)));
    }

    #[test]
    fn empty_allowed_list_locks_everybody_out() {
        let access = GroupAccess::new().restrict(PartitionId(50), vec![]);
        assert!(!access.allows(PartitionId(50), GroupId(1)));
    }
}
