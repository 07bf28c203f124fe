use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CAPACITY: usize = 30;
pub const DEFAULT_SECTION: &str = "A";

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_section() -> String {
    DEFAULT_SECTION.to_string()
}

fn default_created_date() -> DateTime<Utc> {
    Utc::now()
}

/// One offering of a course. Identity is the composite `(course_id, section)`
/// key; the roster keeps enrollment order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSection {
    pub course_id: String,
    pub course_name: String,
    pub instructor: String,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_section")]
    pub section: String,
    #[serde(default)]
    pub enrolled_students: Vec<String>,
    #[serde(default = "default_created_date")]
    pub created_date: DateTime<Utc>,
}

impl CourseSection {
    pub fn new(
        course_id: &str,
        course_name: &str,
        instructor: &str,
        capacity: usize,
        section: &str,
    ) -> Self {
        Self {
            course_id: course_id.to_string(),
            course_name: course_name.to_string(),
            instructor: instructor.to_string(),
            capacity,
            section: section.to_string(),
            enrolled_students: Vec::new(),
            created_date: Utc::now(),
        }
    }

    /// Composite lookup key, e.g. `"CS101-A"`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.course_id, self.section)
    }

    /// Appends a student to the roster. Refuses (returning false) when the
    /// section is full or the student is already on the roster.
    pub fn add_student(&mut self, student_id: &str) -> bool {
        if self.is_full() {
            return false;
        }
        if self.is_student_enrolled(student_id) {
            return false;
        }
        self.enrolled_students.push(student_id.to_string());
        true
    }

    /// Removes a student from the roster, returning whether they were on it.
    pub fn remove_student(&mut self, student_id: &str) -> bool {
        let before = self.enrolled_students.len();
        self.enrolled_students.retain(|id| id != student_id);
        self.enrolled_students.len() < before
    }

    pub fn is_full(&self) -> bool {
        self.enrolled_students.len() >= self.capacity
    }

    pub fn available_spots(&self) -> usize {
        self.capacity.saturating_sub(self.enrolled_students.len())
    }

    pub fn enrollment_count(&self) -> usize {
        self.enrolled_students.len()
    }

    pub fn is_student_enrolled(&self, student_id: &str) -> bool {
        self.enrolled_students.iter().any(|id| id == student_id)
    }
}

impl fmt::Display for CourseSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) - Section {}",
            self.course_name, self.course_id, self.section
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(capacity: usize) -> CourseSection {
        CourseSection::new("CS101", "Introduction to Programming", "teacher1", capacity, "A")
    }

    #[test]
    fn test_add_student_respects_capacity() {
        let mut course = section(2);
        assert!(course.add_student("STU001"));
        assert!(course.add_student("STU002"));
        assert!(course.is_full());
        assert!(!course.add_student("STU003"));
        assert_eq!(course.enrollment_count(), 2);
    }

    #[test]
    fn test_add_student_rejects_duplicate() {
        let mut course = section(5);
        assert!(course.add_student("STU001"));
        assert!(!course.add_student("STU001"));
        assert_eq!(course.enrollment_count(), 1);
    }

    #[test]
    fn test_remove_student() {
        let mut course = section(5);
        course.add_student("STU001");
        assert!(course.remove_student("STU001"));
        assert!(!course.remove_student("STU001"));
        assert_eq!(course.enrollment_count(), 0);
    }

    #[test]
    fn test_roster_keeps_enrollment_order() {
        let mut course = section(5);
        course.add_student("STU003");
        course.add_student("STU001");
        course.add_student("STU002");
        assert_eq!(course.enrolled_students, vec!["STU003", "STU001", "STU002"]);
    }

    #[test]
    fn test_available_spots() {
        let mut course = section(3);
        assert_eq!(course.available_spots(), 3);
        course.add_student("STU001");
        assert_eq!(course.available_spots(), 2);
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let course: CourseSection = serde_json::from_str(
            r#"{"course_id": "CS101", "course_name": "Intro", "instructor": "teacher1"}"#,
        )
        .unwrap();
        assert_eq!(course.capacity, DEFAULT_CAPACITY);
        assert_eq!(course.section, "A");
        assert!(course.enrolled_students.is_empty());
    }

    #[test]
    fn test_key() {
        let course = CourseSection::new("CS101", "Intro", "teacher1", 30, "B");
        assert_eq!(course.key(), "CS101-B");
    }
}
