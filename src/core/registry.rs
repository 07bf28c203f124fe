use crate::domain::model::CourseSection;
use crate::domain::payroll::SalarySlip;
use crate::domain::user::{Account, Admin, Student, Teacher, User};
use crate::utils::error::{PortalError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// In-memory owner of the user and course-section collections. All lookups
/// scan in load order; mutation of the student-course relationship goes
/// through the enrollment coordinator, never through the collections
/// directly.
#[derive(Debug, Default)]
pub struct Registry {
    users: Vec<User>,
    courses: Vec<CourseSection>,
}

#[derive(Debug, Clone)]
pub struct SystemStatistics {
    pub total_users: usize,
    pub total_students: usize,
    pub total_teachers: usize,
    pub total_admins: usize,
    pub total_course_sections: usize,
    pub total_enrollments: usize,
    pub timestamp: DateTime<Utc>,
}

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_parts(users: Vec<User>, courses: Vec<CourseSection>) -> Self {
        Self { users, courses }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn courses(&self) -> &[CourseSection] {
        &self.courses
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }

    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.users.iter().filter_map(User::as_student)
    }

    pub fn teachers(&self) -> impl Iterator<Item = &Teacher> {
        self.users.iter().filter_map(User::as_teacher)
    }

    pub fn teachers_mut(&mut self) -> impl Iterator<Item = &mut Teacher> {
        self.users.iter_mut().filter_map(User::as_teacher_mut)
    }

    pub fn admins(&self) -> impl Iterator<Item = &Admin> {
        self.users.iter().filter_map(User::as_admin)
    }

    pub fn find_user_by_username(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.account().username == username)
    }

    pub fn find_student(&self, student_id: &str) -> Option<&Student> {
        self.students().find(|s| s.student_id == student_id)
    }

    pub fn find_student_mut(&mut self, student_id: &str) -> Option<&mut Student> {
        self.users
            .iter_mut()
            .filter_map(User::as_student_mut)
            .find(|s| s.student_id == student_id)
    }

    pub fn course_by_key(&self, course_id: &str, section: &str) -> Option<&CourseSection> {
        self.courses
            .iter()
            .find(|c| c.course_id == course_id && c.section == section)
    }

    pub fn course_by_key_mut(&mut self, course_id: &str, section: &str) -> Option<&mut CourseSection> {
        self.courses
            .iter_mut()
            .find(|c| c.course_id == course_id && c.section == section)
    }

    /// All sections of a course in load order; may be empty.
    pub fn sections_of<'a, 'b>(
        &'a self,
        course_id: &'b str,
    ) -> impl Iterator<Item = &'a CourseSection> + 'b
    where
        'a: 'b,
    {
        self.courses.iter().filter(move |c| c.course_id == course_id)
    }

    /// The section of `course_id` whose roster contains the student. At most
    /// one should exist; if the collections have drifted and several match,
    /// the first in load order wins and the condition is logged.
    pub fn find_student_enrolled_section(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Option<&CourseSection> {
        let mut matches = self
            .sections_of(course_id)
            .filter(|c| c.is_student_enrolled(student_id));

        let first = matches.next()?;
        let extra: Vec<&str> = matches.map(|c| c.section.as_str()).collect();
        if !extra.is_empty() {
            tracing::warn!(
                "student {} appears in multiple sections of {} ({} and {}); using section {}",
                student_id,
                course_id,
                first.section,
                extra.join(", "),
                first.section
            );
        }
        Some(first)
    }

    pub fn available_courses(&self) -> impl Iterator<Item = &CourseSection> {
        self.courses.iter().filter(|c| !c.is_full())
    }

    pub fn add_user(&mut self, user: User) -> Result<()> {
        let username = &user.account().username;
        if self.find_user_by_username(username).is_some() {
            return Err(PortalError::Duplicate {
                kind: "user",
                id: username.clone(),
            });
        }
        self.users.push(user);
        Ok(())
    }

    /// Removes a user by their identity id. A deleted student is also
    /// scrubbed from every course roster so no dangling roster entry remains.
    pub fn delete_user(&mut self, user_id: &str) -> Result<User> {
        let position = self
            .users
            .iter()
            .position(|u| u.account().user_id == user_id || u.role_id() == user_id)
            .ok_or_else(|| PortalError::NotFound {
                kind: "user",
                id: user_id.to_string(),
            })?;

        let user = self.users.remove(position);
        if let Some(student) = user.as_student() {
            for course in &mut self.courses {
                course.remove_student(&student.student_id);
            }
        }
        Ok(user)
    }

    pub fn add_course(&mut self, course: CourseSection) -> Result<()> {
        if self.course_by_key(&course.course_id, &course.section).is_some() {
            return Err(PortalError::Duplicate {
                kind: "course section",
                id: course.key(),
            });
        }
        self.courses.push(course);
        Ok(())
    }

    /// Next free generated id for a role prefix, e.g. `next_user_id("STU")`
    /// after STU001..STU015 returns `"STU016"`.
    pub fn next_user_id(&self, prefix: &str) -> String {
        let max = self
            .users
            .iter()
            .filter_map(|u| u.role_id().strip_prefix(prefix))
            .filter_map(|suffix| suffix.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("{}{:03}", prefix, max + 1)
    }

    pub fn statistics(&self) -> SystemStatistics {
        SystemStatistics {
            total_users: self.users.len(),
            total_students: self.students().count(),
            total_teachers: self.teachers().count(),
            total_admins: self.admins().count(),
            total_course_sections: self.courses.len(),
            total_enrollments: self.courses.iter().map(CourseSection::enrollment_count).sum(),
            timestamp: Utc::now(),
        }
    }

    /// Builds the default data set: one admin, fifteen students (the first
    /// five with sample academic records), fifteen teachers with one sample
    /// slip each, seven single-section courses, and the seed enrollments.
    pub fn seed_default() -> Self {
        let mut registry = Self::empty();

        let admin_account = Account::new(
            "admin",
            "admin123",
            "System Administrator",
            "admin@portal.edu",
            "ADM001",
        );
        registry.users.push(User::Admin(Admin::new(admin_account, "ADM001")));

        for i in 1..=15 {
            let student_id = format!("STU{:03}", i);
            let account = Account::new(
                &format!("student{}", i),
                "pass123",
                &format!("Student {}", i),
                &format!("student{}@portal.edu", i),
                &student_id,
            );
            let mut student = Student::new(account, &student_id);

            if i <= 5 {
                let mut grades = BTreeMap::new();
                grades.insert("CS101".to_string(), "A".to_string());
                grades.insert("MATH101".to_string(), "B+".to_string());
                grades.insert("ENG101".to_string(), "A-".to_string());
                student.add_semester_record("Fall 2023", grades, 3.67);

                let mut grades = BTreeMap::new();
                grades.insert("CS102".to_string(), "A-".to_string());
                grades.insert("MATH102".to_string(), "A".to_string());
                grades.insert("PHYS101".to_string(), "B".to_string());
                student.add_semester_record("Spring 2024", grades, 3.78);
            }

            registry.users.push(User::Student(student));
        }

        let departments = [
            "Computer Science",
            "Mathematics",
            "Physics",
            "English",
            "Business",
        ];
        let office_buildings = [
            "Science Building",
            "Math Building",
            "Physics Lab",
            "Liberal Arts",
            "Business Center",
        ];

        for i in 1..=15usize {
            let teacher_id = format!("TCH{:03}", i);
            let dept_index = (i - 1) % departments.len();
            let account = Account::new(
                &format!("teacher{}", i),
                "teach123",
                &format!("Professor {}", i),
                &format!("teacher{}@portal.edu", i),
                &teacher_id,
            );
            let mut teacher = Teacher::new(account, &teacher_id);
            teacher.department = departments[dept_index].to_string();
            teacher.qualification = "PhD".to_string();
            teacher.salary = 75000.0 + (i as f64) * 1000.0;
            teacher
                .contact_info
                .insert("office_room".to_string(), format!("Room {}", 100 + i));
            teacher.contact_info.insert(
                "office_building".to_string(),
                office_buildings[dept_index].to_string(),
            );
            teacher
                .contact_info
                .insert("office_hours".to_string(), "Mon-Wed 2-4 PM".to_string());

            let mut allowances = BTreeMap::new();
            allowances.insert("Housing".to_string(), 10000.0);
            allowances.insert("Transport".to_string(), 5000.0);
            let mut deductions = BTreeMap::new();
            deductions.insert("Tax".to_string(), 8000.0);
            deductions.insert("Insurance".to_string(), 2000.0);
            let slip_id = format!("PAY{}{}", teacher_id, Utc::now().format("%Y%m"));
            teacher.add_salary_slip(SalarySlip::new(
                &slip_id,
                &teacher_id,
                "January",
                2024,
                teacher.salary,
                allowances,
                deductions,
            ));

            registry.users.push(User::Teacher(teacher));
        }

        let courses = [
            ("CS101", "Introduction to Programming", "teacher1", 30),
            ("CS102", "Data Structures", "teacher1", 25),
            ("MATH101", "Calculus I", "teacher2", 40),
            ("MATH102", "Calculus II", "teacher2", 35),
            ("PHYS101", "Physics I", "teacher3", 30),
            ("ENG101", "English Composition", "teacher4", 25),
            ("BUS101", "Business Fundamentals", "teacher5", 35),
        ];
        for (course_id, name, instructor, capacity) in courses {
            registry
                .courses
                .push(CourseSection::new(course_id, name, instructor, capacity, "A"));
        }

        let enrollments = [
            ("STU001", ["CS101", "MATH101", "ENG101"]),
            ("STU002", ["CS101", "MATH101", "PHYS101"]),
            ("STU003", ["CS102", "MATH102", "BUS101"]),
            ("STU004", ["CS101", "ENG101", "BUS101"]),
            ("STU005", ["MATH101", "PHYS101", "ENG101"]),
        ];
        for (student_id, course_ids) in enrollments {
            for course_id in course_ids {
                let added = registry
                    .course_by_key_mut(course_id, "A")
                    .map(|c| c.add_student(student_id))
                    .unwrap_or(false);
                if added {
                    if let Some(student) = registry.find_student_mut(student_id) {
                        if !student.is_enrolled_in(course_id) {
                            student.enrolled_courses.push(course_id.to_string());
                        }
                    }
                }
            }
        }

        registry
    }
}
