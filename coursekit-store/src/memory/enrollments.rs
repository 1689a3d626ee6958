// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory enrollment records.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use coursekit_core::enrollment::{Enrollment, EnrollmentMode};
use coursekit_core::keys::CourseKey;
use coursekit_core::learner::LearnerId;

use crate::traits::{EnrollmentStore, StoreError};

#[derive(Default)]
pub struct InnerEnrollmentStore {
    // Keyed per (learner, course): at most one enrollment per pair.
    enrollments: HashMap<(LearnerId, CourseKey), Enrollment>,
}

/// An in-memory enrollment store.
#[derive(Clone, Default)]
pub struct MemoryEnrollmentStore {
    inner: Arc<RwLock<InnerEnrollmentStore>>,
}

impl MemoryEnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain a read-lock on the store.
    pub fn read_store(&self) -> RwLockReadGuard<'_, InnerEnrollmentStore> {
        self.inner
            .read()
            .expect("acquire shared read access on store")
    }

    /// Obtain a write-lock on the store.
    pub fn write_store(&self) -> RwLockWriteGuard<'_, InnerEnrollmentStore> {
        self.inner
            .write()
            .expect("acquire exclusive write access on store")
    }

    /// Create or replace an enrollment.
    pub fn enroll(&self, learner_id: &LearnerId, course_key: &CourseKey, mode: EnrollmentMode) {
        let enrollment = Enrollment {
            learner_id: learner_id.clone(),
            course_key: course_key.clone(),
            mode,
            active: true,
            created_at: Utc::now(),
        };
        self.write_store()
            .enrollments
            .insert((learner_id.clone(), course_key.clone()), enrollment);
    }

    /// Deactivate an enrollment, keeping the record.
    pub fn unenroll(&self, learner_id: &LearnerId, course_key: &CourseKey) {
        if let Some(enrollment) = self
            .write_store()
            .enrollments
            .get_mut(&(learner_id.clone(), course_key.clone()))
        {
            enrollment.active = false;
        }
    }
}

impl EnrollmentStore for MemoryEnrollmentStore {
    type Error = StoreError;

    async fn enrollment(
        &self,
        learner_id: &LearnerId,
        course_key: &CourseKey,
    ) -> Result<Option<Enrollment>, Self::Error> {
        Ok(self
            .read_store()
            .enrollments
            .get(&(learner_id.clone(), course_key.clone()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use coursekit_core::enrollment::EnrollmentMode;
    use coursekit_core::keys::CourseKey;
    use coursekit_core::learner::LearnerId;

    use crate::traits::EnrollmentStore;

    use super::MemoryEnrollmentStore;

    #[tokio::test]
    async fn enroll_then_unenroll() {
        let store = MemoryEnrollmentStore::new();
        let learner: LearnerId = "learner-1".parse().unwrap();
        let course: CourseKey = "course-v1:Org+Course+2024".parse().unwrap();

        assert!(store.enrollment(&learner, &course).await.unwrap().is_none());

        store.enroll(&learner, &course, EnrollmentMode::Audit);
        let enrollment = store.enrollment(&learner, &course).await.unwrap().unwrap();
        assert!(enrollment.active);
        assert_eq!(enrollment.mode, EnrollmentMode::Audit);

        store.unenroll(&learner, &course);
        let enrollment = store.enrollment(&learner, &course).await.unwrap().unwrap();
        assert!(!enrollment.active);

        // Re-enrolling in a different mode replaces the single record.
        store.enroll(&learner, &course, EnrollmentMode::Verified);
        let enrollment = store.enrollment(&learner, &course).await.unwrap().unwrap();
        assert!(enrollment.active);
        assert_eq!(enrollment.mode, EnrollmentMode::Verified);
    }
}
