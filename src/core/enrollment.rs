use crate::core::persistence::PortalStore;
use crate::core::registry::Registry;
use crate::domain::ports::Storage;
use crate::utils::error::PortalError;
use std::fmt;
use thiserror::Error;

/// The resolved `(course_id, section)` pair an operation acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub course_id: String,
    pub section: String,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} section {}", self.course_id, self.section)
    }
}

/// Recoverable outcomes of enroll/unenroll. None of these terminate the
/// process; the caller decides the user-facing messaging. `SaveFailed` is the
/// one non-logical case: the change is applied in memory but the disk write
/// failed, so memory and disk may now disagree.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("student {0} not found")]
    StudentNotFound(String),

    #[error("no sections exist for course {0}")]
    CourseNotFound(String),

    #[error("student {student_id} is already enrolled in {course_id} section {section}")]
    AlreadyEnrolled {
        student_id: String,
        course_id: String,
        section: String,
    },

    #[error("course {course_id} section {section} not found")]
    SectionNotFound { course_id: String, section: String },

    #[error("no available sections found for course {0}")]
    NoAvailableSection(String),

    #[error("course {course_id} section {section} is full")]
    CourseFull { course_id: String, section: String },

    #[error("student {student_id} is not enrolled in course {course_id}")]
    NotEnrolled {
        student_id: String,
        course_id: String,
    },

    #[error("{placement} updated in memory but saving to disk failed: {source}")]
    SaveFailed {
        placement: Placement,
        #[source]
        source: PortalError,
    },
}

/// The single authority for mutating the student-course relationship. Every
/// roster change goes through the course-section entity operations and is
/// mirrored in the student's enrolled-course set before the store persists
/// both collections.
pub struct EnrollmentCoordinator<'a, S: Storage> {
    registry: &'a mut Registry,
    store: &'a PortalStore<S>,
}

impl<'a, S: Storage> EnrollmentCoordinator<'a, S> {
    pub fn new(registry: &'a mut Registry, store: &'a PortalStore<S>) -> Self {
        Self { registry, store }
    }

    /// Enrolls a student in a course. With an explicit `section` the student
    /// goes exactly there; otherwise the first section with an open seat (in
    /// load order) is chosen. A student holds at most one section per course
    /// id, so a duplicate attempt fails before any target is considered.
    pub fn enroll(
        &mut self,
        student_id: &str,
        course_id: &str,
        section: Option<&str>,
    ) -> Result<Placement, EnrollmentError> {
        if self.registry.find_student(student_id).is_none() {
            return Err(EnrollmentError::StudentNotFound(student_id.to_string()));
        }
        if self.registry.sections_of(course_id).next().is_none() {
            return Err(EnrollmentError::CourseNotFound(course_id.to_string()));
        }

        if let Some(existing) = self
            .registry
            .find_student_enrolled_section(student_id, course_id)
        {
            return Err(EnrollmentError::AlreadyEnrolled {
                student_id: student_id.to_string(),
                course_id: course_id.to_string(),
                section: existing.section.clone(),
            });
        }

        let target_section = match section {
            Some(requested) => {
                let Some(course) = self.registry.course_by_key(course_id, requested) else {
                    return Err(EnrollmentError::SectionNotFound {
                        course_id: course_id.to_string(),
                        section: requested.to_string(),
                    });
                };
                course.section.clone()
            }
            None => match self.registry.sections_of(course_id).find(|c| !c.is_full()) {
                Some(course) => course.section.clone(),
                None => {
                    return Err(EnrollmentError::NoAvailableSection(course_id.to_string()));
                }
            },
        };

        // The roster insert is the fallible half of the dual write, so it
        // goes first; the enrolled-courses insert below cannot fail.
        let roster_added = {
            let Some(course) = self.registry.course_by_key_mut(course_id, &target_section) else {
                return Err(EnrollmentError::SectionNotFound {
                    course_id: course_id.to_string(),
                    section: target_section,
                });
            };
            if course.is_full() {
                return Err(EnrollmentError::CourseFull {
                    course_id: course_id.to_string(),
                    section: target_section,
                });
            }
            course.add_student(student_id)
        };
        if !roster_added {
            return Err(EnrollmentError::CourseFull {
                course_id: course_id.to_string(),
                section: target_section,
            });
        }

        match self.registry.find_student_mut(student_id) {
            Some(student) => {
                if !student.is_enrolled_in(course_id) {
                    student.enrolled_courses.push(course_id.to_string());
                }
            }
            None => {
                // Roll the roster half back rather than leave the two
                // collections disagreeing.
                if let Some(course) = self.registry.course_by_key_mut(course_id, &target_section) {
                    course.remove_student(student_id);
                }
                return Err(EnrollmentError::StudentNotFound(student_id.to_string()));
            }
        }

        let placement = Placement {
            course_id: course_id.to_string(),
            section: target_section,
        };
        tracing::info!("enrolled {} in {}", student_id, placement);
        self.persist(placement)
    }

    /// Removes a student from whichever section of `course_id` holds them.
    /// The vacated seat is immediately available to the next enroll call.
    pub fn unenroll(
        &mut self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Placement, EnrollmentError> {
        if self.registry.find_student(student_id).is_none() {
            return Err(EnrollmentError::StudentNotFound(student_id.to_string()));
        }
        if self.registry.sections_of(course_id).next().is_none() {
            return Err(EnrollmentError::CourseNotFound(course_id.to_string()));
        }

        let section = match self
            .registry
            .find_student_enrolled_section(student_id, course_id)
        {
            Some(course) => course.section.clone(),
            None => {
                return Err(EnrollmentError::NotEnrolled {
                    student_id: student_id.to_string(),
                    course_id: course_id.to_string(),
                });
            }
        };

        let removed = self
            .registry
            .course_by_key_mut(course_id, &section)
            .map(|course| course.remove_student(student_id))
            .unwrap_or(false);
        if !removed {
            return Err(EnrollmentError::NotEnrolled {
                student_id: student_id.to_string(),
                course_id: course_id.to_string(),
            });
        }

        if let Some(student) = self.registry.find_student_mut(student_id) {
            student.enrolled_courses.retain(|c| c != course_id);
        }

        let placement = Placement {
            course_id: course_id.to_string(),
            section,
        };
        tracing::info!("unenrolled {} from {}", student_id, placement);
        self.persist(placement)
    }

    /// Persists both collections. On failure the in-memory change stands and
    /// the caller gets the distinct `SaveFailed` outcome.
    fn persist(&self, placement: Placement) -> Result<Placement, EnrollmentError> {
        match self.store.save_registry(self.registry) {
            Ok(()) => Ok(placement),
            Err(source) => {
                tracing::error!(
                    "in-memory state for {} changed but persisting failed: {}; \
                     disk and memory may now disagree",
                    placement,
                    source
                );
                Err(EnrollmentError::SaveFailed { placement, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::testing::MemoryStorage;
    use crate::domain::model::CourseSection;
    use crate::domain::user::{Account, Student, User};
    use crate::utils::error::Result as PortalResult;

    fn student(n: u32) -> User {
        let id = format!("STU{:03}", n);
        User::Student(Student::new(
            Account::new(
                &format!("student{}", n),
                "pass123",
                &format!("Student {}", n),
                &format!("student{}@portal.edu", n),
                &id,
            ),
            &id,
        ))
    }

    /// CS101 with two sections (A capacity 1, B capacity 2) and MATH101-A.
    fn registry() -> Registry {
        Registry::from_parts(
            vec![student(1), student(2), student(3)],
            vec![
                CourseSection::new("CS101", "Intro", "teacher1", 1, "A"),
                CourseSection::new("CS101", "Intro", "teacher2", 2, "B"),
                CourseSection::new("MATH101", "Calculus I", "teacher3", 2, "A"),
            ],
        )
    }

    fn store() -> PortalStore<MemoryStorage> {
        PortalStore::new(MemoryStorage::new(), 30)
    }

    fn assert_consistent(registry: &Registry, student_id: &str, course_id: &str, enrolled: bool) {
        let student = registry.find_student(student_id).unwrap();
        assert_eq!(student.is_enrolled_in(course_id), enrolled);
        assert_eq!(
            registry
                .find_student_enrolled_section(student_id, course_id)
                .is_some(),
            enrolled
        );
    }

    #[test]
    fn test_enroll_auto_selects_first_open_section() {
        let mut registry = registry();
        let store = store();
        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);

        let placement = coordinator.enroll("STU001", "CS101", None).unwrap();
        assert_eq!(placement.section, "A");

        // Section A is now full; the next auto-enroll spills into B.
        let placement = coordinator.enroll("STU002", "CS101", None).unwrap();
        assert_eq!(placement.section, "B");

        assert_consistent(&registry, "STU001", "CS101", true);
        assert_consistent(&registry, "STU002", "CS101", true);
    }

    #[test]
    fn test_enroll_explicit_section() {
        let mut registry = registry();
        let store = store();
        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);

        let placement = coordinator.enroll("STU001", "CS101", Some("B")).unwrap();
        assert_eq!(placement.section, "B");
        assert!(registry.course_by_key("CS101", "A").unwrap().enrolled_students.is_empty());
    }

    #[test]
    fn test_enroll_unknown_student_or_course() {
        let mut registry = registry();
        let store = store();
        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);

        assert!(matches!(
            coordinator.enroll("STU999", "CS101", None),
            Err(EnrollmentError::StudentNotFound(_))
        ));
        assert!(matches!(
            coordinator.enroll("STU001", "ART101", None),
            Err(EnrollmentError::CourseNotFound(_))
        ));
    }

    #[test]
    fn test_enroll_section_not_found() {
        let mut registry = registry();
        let store = store();
        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);

        assert!(matches!(
            coordinator.enroll("STU001", "CS101", Some("Z")),
            Err(EnrollmentError::SectionNotFound { .. })
        ));
        assert_consistent(&registry, "STU001", "CS101", false);
    }

    #[test]
    fn test_enroll_full_section_explicit_vs_auto() {
        let mut registry = registry();
        let store = store();
        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);
        coordinator.enroll("STU001", "CS101", Some("A")).unwrap();

        // Explicitly asking for the full section fails; auto-select finds B.
        assert!(matches!(
            coordinator.enroll("STU002", "CS101", Some("A")),
            Err(EnrollmentError::CourseFull { .. })
        ));
        let placement = coordinator.enroll("STU002", "CS101", None).unwrap();
        assert_eq!(placement.section, "B");
    }

    #[test]
    fn test_enroll_no_available_section() {
        let mut registry = registry();
        let store = store();
        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);
        coordinator.enroll("STU001", "CS101", None).unwrap();
        coordinator.enroll("STU002", "CS101", None).unwrap();
        coordinator.enroll("STU003", "CS101", None).unwrap();

        // All three seats across both sections are taken.
        let mut registry2 = Registry::from_parts(
            vec![student(4)],
            registry.courses().to_vec(),
        );
        let mut coordinator = EnrollmentCoordinator::new(&mut registry2, &store);
        assert!(matches!(
            coordinator.enroll("STU004", "CS101", None),
            Err(EnrollmentError::NoAvailableSection(_))
        ));
    }

    #[test]
    fn test_duplicate_enrollment_is_rejected_per_course_id() {
        let mut registry = registry();
        let store = store();
        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);
        coordinator.enroll("STU001", "CS101", Some("A")).unwrap();

        // Even a different section with open seats is refused.
        assert!(matches!(
            coordinator.enroll("STU001", "CS101", Some("B")),
            Err(EnrollmentError::AlreadyEnrolled { section, .. }) if section == "A"
        ));
    }

    #[test]
    fn test_enroll_twice_is_idempotent_failure() {
        let mut registry = registry();
        let store = store();
        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);
        coordinator.enroll("STU001", "MATH101", None).unwrap();

        let roster_before = registry.course_by_key("MATH101", "A").unwrap().enrolled_students.clone();
        let courses_before = registry.find_student("STU001").unwrap().enrolled_courses.clone();

        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);
        assert!(matches!(
            coordinator.enroll("STU001", "MATH101", None),
            Err(EnrollmentError::AlreadyEnrolled { .. })
        ));

        assert_eq!(
            registry.course_by_key("MATH101", "A").unwrap().enrolled_students,
            roster_before
        );
        assert_eq!(
            registry.find_student("STU001").unwrap().enrolled_courses,
            courses_before
        );
    }

    #[test]
    fn test_unenroll_restores_pre_enroll_state() {
        let mut registry = registry();
        let store = store();

        let roster_before = registry.course_by_key("CS101", "B").unwrap().enrolled_students.clone();
        let courses_before = registry.find_student("STU001").unwrap().enrolled_courses.clone();

        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);
        coordinator.enroll("STU001", "CS101", Some("B")).unwrap();
        let placement = coordinator.unenroll("STU001", "CS101").unwrap();
        assert_eq!(placement.section, "B");

        assert_eq!(
            registry.course_by_key("CS101", "B").unwrap().enrolled_students,
            roster_before
        );
        assert_eq!(
            registry.find_student("STU001").unwrap().enrolled_courses,
            courses_before
        );
        assert!(registry.find_student_enrolled_section("STU001", "CS101").is_none());
    }

    #[test]
    fn test_unenroll_not_enrolled() {
        let mut registry = registry();
        let store = store();
        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);

        assert!(matches!(
            coordinator.unenroll("STU001", "CS101"),
            Err(EnrollmentError::NotEnrolled { .. })
        ));
    }

    #[test]
    fn test_unenroll_frees_the_seat() {
        let mut registry = registry();
        let store = store();
        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);
        coordinator.enroll("STU001", "CS101", Some("A")).unwrap();
        coordinator.unenroll("STU001", "CS101").unwrap();

        let placement = coordinator.enroll("STU002", "CS101", Some("A")).unwrap();
        assert_eq!(placement.section, "A");
    }

    #[test]
    fn test_capacity_invariant_holds_under_pressure() {
        let mut registry = registry();
        let store = store();
        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);

        for n in 1..=3 {
            let _ = coordinator.enroll(&format!("STU{:03}", n), "CS101", None);
        }
        for course in registry.courses() {
            assert!(course.enrollment_count() <= course.capacity);
            let mut seen = std::collections::HashSet::new();
            for id in &course.enrolled_students {
                assert!(seen.insert(id), "duplicate roster entry {}", id);
            }
        }
    }

    #[test]
    fn test_enrollment_survives_reload() {
        let mut registry = registry();
        let store = store();
        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);
        coordinator.enroll("STU001", "CS101", None).unwrap();

        let reloaded = store.load_registry().unwrap();
        assert_consistent(&reloaded, "STU001", "CS101", true);
    }

    /// Storage that accepts nothing, for exercising the save-failure path.
    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn read_file(&self, path: &str) -> PortalResult<Vec<u8>> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, path).into())
        }
        fn write_file(&self, _path: &str, _data: &[u8]) -> PortalResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "disk full").into())
        }
        fn exists(&self, _path: &str) -> bool {
            false
        }
        fn list_files(&self, _dir: &str) -> PortalResult<Vec<String>> {
            Ok(Vec::new())
        }
        fn remove_file(&self, _path: &str) -> PortalResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_save_failure_is_surfaced_but_memory_keeps_the_change() {
        let mut registry = registry();
        let store = PortalStore::new(BrokenStorage, 30);
        let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);

        let result = coordinator.enroll("STU001", "CS101", None);
        match result {
            Err(EnrollmentError::SaveFailed { placement, .. }) => {
                assert_eq!(placement.course_id, "CS101");
                assert_eq!(placement.section, "A");
            }
            other => panic!("expected SaveFailed, got {:?}", other.map(|p| p.to_string())),
        }
        assert_consistent(&registry, "STU001", "CS101", true);
    }
}
