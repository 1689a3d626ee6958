// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enrollments and enrollment modes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keys::CourseKey;
use crate::learner::LearnerId;

/// The commercial/academic tier a learner holds for a course.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnrollmentMode {
    Audit,
    Honor,
    Verified,
    Professional,
    NoIdProfessional,
    Masters,
    Credit,
}

impl EnrollmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentMode::Audit => "audit",
            EnrollmentMode::Honor => "honor",
            EnrollmentMode::Verified => "verified",
            EnrollmentMode::Professional => "professional",
            EnrollmentMode::NoIdProfessional => "no-id-professional",
            EnrollmentMode::Masters => "masters",
            EnrollmentMode::Credit => "credit",
        }
    }

    /// Modes a learner pays for. Content gated on a paid mode accepts any of
    /// these.
    pub fn is_paid(&self) -> bool {
        !matches!(self, EnrollmentMode::Audit | EnrollmentMode::Honor)
    }
}

impl std::fmt::Display for EnrollmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An active or withdrawn course enrollment. At most one enrollment exists
/// per `(learner, course)`; deactivation flips `active` rather than deleting
/// the row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub learner_id: LearnerId,
    pub course_key: CourseKey,
    pub mode: EnrollmentMode,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
