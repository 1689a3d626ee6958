// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-partition declarations: learner segmentation schemes and their
//! groups.
//!
//! Partitions are declared on a course and are stable for its lifetime.
//! Groups may be added over time but existing group ids are never renumbered;
//! the partition service relies on this when persisting assignments.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a partition, unique within a course.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionId(pub u32);

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a group, unique within its partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One bucket of a partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

impl Group {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id: GroupId(id),
            name: name.to_owned(),
        }
    }
}

/// A declared learner-segmentation scheme.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPartition {
    pub id: PartitionId,
    pub name: String,
    pub groups: Vec<Group>,
}

impl UserPartition {
    pub fn new(id: u32, name: &str, groups: Vec<Group>) -> Self {
        Self {
            id: PartitionId(id),
            name: name.to_owned(),
            groups,
        }
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn contains_group(&self, id: GroupId) -> bool {
        self.group(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{Group, GroupId, UserPartition};

    #[test]
    fn group_lookup() {
        let partition = UserPartition::new(
            50,
            "cohort",
            vec![Group::new(1, "A"), Group::new(2, "B")],
        );

        assert!(partition.contains_group(GroupId(1)));
        assert_eq!(partition.group(GroupId(2)).unwrap().name, "B");
        assert!(!partition.contains_group(GroupId(3)));
    }
}
