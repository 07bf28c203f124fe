use crate::core::registry::Registry;
use std::collections::HashSet;
use std::fmt;

/// One detected mismatch between the course rosters and the students'
/// enrolled-course sets, or a broken section invariant.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsistencyIssue {
    RosterOverCapacity {
        course_id: String,
        section: String,
        enrolled: usize,
        capacity: usize,
    },
    DuplicateRosterEntry {
        course_id: String,
        section: String,
        student_id: String,
    },
    /// Student is on a roster but the course id is missing from their
    /// enrolled-course set.
    MissingEnrollmentEntry {
        student_id: String,
        course_id: String,
        section: String,
    },
    /// Student's enrolled-course set names a course no roster places them in.
    DanglingEnrollmentEntry {
        student_id: String,
        course_id: String,
    },
    MultipleSectionEnrollment {
        student_id: String,
        course_id: String,
        sections: Vec<String>,
    },
    /// Roster entry that resolves to no student record.
    UnknownRosterEntry {
        course_id: String,
        section: String,
        student_id: String,
    },
}

impl fmt::Display for ConsistencyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyIssue::RosterOverCapacity {
                course_id,
                section,
                enrolled,
                capacity,
            } => write!(
                f,
                "{}-{} roster holds {} students but capacity is {}",
                course_id, section, enrolled, capacity
            ),
            ConsistencyIssue::DuplicateRosterEntry {
                course_id,
                section,
                student_id,
            } => write!(
                f,
                "{}-{} lists student {} more than once",
                course_id, section, student_id
            ),
            ConsistencyIssue::MissingEnrollmentEntry {
                student_id,
                course_id,
                section,
            } => write!(
                f,
                "student {} is on the {}-{} roster but {} is not in their enrolled courses",
                student_id, course_id, section, course_id
            ),
            ConsistencyIssue::DanglingEnrollmentEntry {
                student_id,
                course_id,
            } => write!(
                f,
                "student {} lists {} but no section roster contains them",
                student_id, course_id
            ),
            ConsistencyIssue::MultipleSectionEnrollment {
                student_id,
                course_id,
                sections,
            } => write!(
                f,
                "student {} appears in sections {} of course {}",
                student_id,
                sections.join(", "),
                course_id
            ),
            ConsistencyIssue::UnknownRosterEntry {
                course_id,
                section,
                student_id,
            } => write!(
                f,
                "{}-{} roster entry {} matches no student record",
                course_id, section, student_id
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct ConsistencyReport {
    pub issues: Vec<ConsistencyIssue>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Logs every issue at warn level. Repair is deliberately not attempted:
    /// neither side of the denormalized relationship is authoritative, so
    /// mismatches are surfaced for an operator to resolve.
    pub fn log(&self) {
        for issue in &self.issues {
            tracing::warn!("consistency: {}", issue);
        }
    }
}

/// Full scan of both sides of the student-course relationship. Runs on every
/// load; read-only.
pub fn audit(registry: &Registry) -> ConsistencyReport {
    let mut report = ConsistencyReport::default();

    for course in registry.courses() {
        if course.enrollment_count() > course.capacity {
            report.issues.push(ConsistencyIssue::RosterOverCapacity {
                course_id: course.course_id.clone(),
                section: course.section.clone(),
                enrolled: course.enrollment_count(),
                capacity: course.capacity,
            });
        }

        let mut seen = HashSet::new();
        for student_id in &course.enrolled_students {
            if !seen.insert(student_id) {
                report.issues.push(ConsistencyIssue::DuplicateRosterEntry {
                    course_id: course.course_id.clone(),
                    section: course.section.clone(),
                    student_id: student_id.clone(),
                });
                continue;
            }

            match registry.find_student(student_id) {
                None => report.issues.push(ConsistencyIssue::UnknownRosterEntry {
                    course_id: course.course_id.clone(),
                    section: course.section.clone(),
                    student_id: student_id.clone(),
                }),
                Some(student) => {
                    if !student.is_enrolled_in(&course.course_id) {
                        report.issues.push(ConsistencyIssue::MissingEnrollmentEntry {
                            student_id: student_id.clone(),
                            course_id: course.course_id.clone(),
                            section: course.section.clone(),
                        });
                    }
                }
            }
        }
    }

    for student in registry.students() {
        for course_id in &student.enrolled_courses {
            let sections: Vec<String> = registry
                .sections_of(course_id)
                .filter(|c| c.is_student_enrolled(&student.student_id))
                .map(|c| c.section.clone())
                .collect();

            match sections.len() {
                0 => report.issues.push(ConsistencyIssue::DanglingEnrollmentEntry {
                    student_id: student.student_id.clone(),
                    course_id: course_id.clone(),
                }),
                1 => {}
                _ => report.issues.push(ConsistencyIssue::MultipleSectionEnrollment {
                    student_id: student.student_id.clone(),
                    course_id: course_id.clone(),
                    sections,
                }),
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::CourseSection;
    use crate::domain::user::{Account, Student, User};

    fn student(id: &str) -> User {
        User::Student(Student::new(
            Account::new(id, "pass123", id, &format!("{}@portal.edu", id), id),
            id,
        ))
    }

    fn consistent_registry() -> Registry {
        let mut user = student("STU001");
        user.as_student_mut()
            .unwrap()
            .enrolled_courses
            .push("CS101".to_string());
        let mut course = CourseSection::new("CS101", "Intro", "teacher1", 2, "A");
        course.add_student("STU001");
        Registry::from_parts(vec![user, student("STU002")], vec![course])
    }

    #[test]
    fn test_clean_registry_passes() {
        let report = audit(&consistent_registry());
        assert!(report.is_clean(), "unexpected issues: {:?}", report.issues);
    }

    #[test]
    fn test_empty_registry_passes() {
        assert!(audit(&Registry::empty()).is_clean());
    }

    #[test]
    fn test_detects_over_capacity_and_duplicates() {
        let mut course = CourseSection::new("CS101", "Intro", "teacher1", 1, "A");
        // Bypass the entity operations to fabricate corruption.
        course.enrolled_students = vec!["STU001".into(), "STU001".into()];
        let mut user = student("STU001");
        user.as_student_mut()
            .unwrap()
            .enrolled_courses
            .push("CS101".to_string());
        let registry = Registry::from_parts(vec![user], vec![course]);

        let report = audit(&registry);
        assert!(report
            .issues
            .iter()
            .any(|i| matches!(i, ConsistencyIssue::RosterOverCapacity { enrolled: 2, capacity: 1, .. })));
        assert!(report
            .issues
            .iter()
            .any(|i| matches!(i, ConsistencyIssue::DuplicateRosterEntry { .. })));
    }

    #[test]
    fn test_detects_missing_enrollment_entry() {
        let mut course = CourseSection::new("CS101", "Intro", "teacher1", 2, "A");
        course.add_student("STU001");
        let registry = Registry::from_parts(vec![student("STU001")], vec![course]);

        let report = audit(&registry);
        assert_eq!(report.issues.len(), 1);
        assert!(matches!(
            &report.issues[0],
            ConsistencyIssue::MissingEnrollmentEntry { student_id, .. } if student_id == "STU001"
        ));
    }

    #[test]
    fn test_detects_dangling_enrollment_entry() {
        let mut user = student("STU001");
        user.as_student_mut()
            .unwrap()
            .enrolled_courses
            .push("CS101".to_string());
        let registry = Registry::from_parts(
            vec![user],
            vec![CourseSection::new("CS101", "Intro", "teacher1", 2, "A")],
        );

        let report = audit(&registry);
        assert!(matches!(
            &report.issues[0],
            ConsistencyIssue::DanglingEnrollmentEntry { course_id, .. } if course_id == "CS101"
        ));
    }

    #[test]
    fn test_detects_multiple_section_enrollment() {
        let mut section_a = CourseSection::new("CS101", "Intro", "teacher1", 2, "A");
        let mut section_b = CourseSection::new("CS101", "Intro", "teacher2", 2, "B");
        section_a.add_student("STU001");
        section_b.add_student("STU001");
        let mut user = student("STU001");
        user.as_student_mut()
            .unwrap()
            .enrolled_courses
            .push("CS101".to_string());
        let registry = Registry::from_parts(vec![user], vec![section_a, section_b]);

        let report = audit(&registry);
        assert!(report.issues.iter().any(|i| matches!(
            i,
            ConsistencyIssue::MultipleSectionEnrollment { sections, .. } if sections == &vec!["A".to_string(), "B".to_string()]
        )));
    }

    #[test]
    fn test_detects_unknown_roster_entry() {
        let mut course = CourseSection::new("CS101", "Intro", "teacher1", 2, "A");
        course.add_student("STU999");
        let registry = Registry::from_parts(vec![student("STU001")], vec![course]);

        let report = audit(&registry);
        assert!(matches!(
            &report.issues[0],
            ConsistencyIssue::UnknownRosterEntry { student_id, .. } if student_id == "STU999"
        ));
    }
}
