// SPDX-License-Identifier: MIT OR Apache-2.0

//! Course-level configuration carried on the published tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::partition::{PartitionId, UserPartition};
use crate::policy::GradingPolicy;

/// Country embargo configuration for a course.
///
/// `Blacklist` denies the listed countries; `Whitelist` denies everything
/// else. Countries are ISO 3166-1 alpha-2 codes, upper-case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "countries", rename_all = "lowercase")]
pub enum EmbargoConfig {
    Blacklist(Vec<String>),
    Whitelist(Vec<String>),
}

impl EmbargoConfig {
    /// Whether a learner resolved to `country` may access the course.
    /// Learners with no resolvable country are only blocked in whitelist
    /// mode.
    pub fn allows(&self, country: Option<&str>) -> bool {
        match (self, country) {
            (EmbargoConfig::Blacklist(denied), Some(country)) => {
                !denied.iter().any(|c| c == country)
            }
            (EmbargoConfig::Blacklist(_), None) => true,
            (EmbargoConfig::Whitelist(allowed), Some(country)) => {
                allowed.iter().any(|c| c == country)
            }
            (EmbargoConfig::Whitelist(_), None) => false,
        }
    }
}

/// Settings declared on the course root.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseConfig {
    /// Course start; the whole tree is unreleased before it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,

    /// Course end; interaction stops after it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,

    /// IANA zone name used to present course dates; the settings default
    /// applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Declared user partitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_partitions: Vec<UserPartition>,

    #[serde(default)]
    pub grading_policy: GradingPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embargo: Option<EmbargoConfig>,
}

impl CourseConfig {
    pub fn partition(&self, id: PartitionId) -> Option<&UserPartition> {
        self.user_partitions.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::EmbargoConfig;

    #[test]
    fn blacklist_denies_listed_countries() {
        let embargo = EmbargoConfig::Blacklist(vec!["KP".to_owned(), "IR".to_owned()]);
        assert!(!embargo.allows(Some("KP")));
        assert!(embargo.allows(Some("NL")));
        assert!(embargo.allows(None));
    }

    #[test]
    fn whitelist_denies_everything_else() {
        let embargo = EmbargoConfig::Whitelist(vec!["US".to_owned()]);
        assert!(embargo.allows(Some("US")));
        assert!(!embargo.allows(Some("NL")));
        assert!(!embargo.allows(None));
    }
}
