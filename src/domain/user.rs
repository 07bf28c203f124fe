use crate::domain::payroll::SalarySlip;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// SHA-256 hex digest of a plain-text password.
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

fn default_access_level() -> String {
    "full".to_string()
}

/// Login and identity fields shared by every role. `password` holds the
/// SHA-256 digest, never the plain text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub user_id: String,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub first_login: bool,
}

impl Account {
    pub fn new(username: &str, password: &str, name: &str, email: &str, user_id: &str) -> Self {
        Self {
            username: username.to_string(),
            password: hash_password(password),
            name: name.to_string(),
            email: email.to_string(),
            user_id: user_id.to_string(),
            last_login: None,
            first_login: false,
        }
    }

    pub fn verify_password(&self, password: &str) -> bool {
        self.password == hash_password(password)
    }

    pub fn change_password(&mut self, old_password: &str, new_password: &str) -> bool {
        if !self.verify_password(old_password) {
            return false;
        }
        self.password = hash_password(new_password);
        true
    }

    /// First-login credential reset: no verification of the old password.
    pub fn set_credentials(&mut self, username: &str, password: &str) {
        self.username = username.to_string();
        self.password = hash_password(password);
        self.first_login = false;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemesterRecord {
    pub courses_grades: BTreeMap<String, String>,
    pub cgpa: f64,
    pub date_added: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CgpaEntry {
    pub semester: String,
    pub cgpa: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    #[serde(flatten)]
    pub account: Account,
    pub student_id: String,
    /// Base course ids only; the section placement lives in the course roster.
    #[serde(default)]
    pub enrolled_courses: Vec<String>,
    #[serde(default)]
    pub academic_records: BTreeMap<String, SemesterRecord>,
    #[serde(default)]
    pub cgpa_history: Vec<CgpaEntry>,
}

impl Student {
    pub fn new(account: Account, student_id: &str) -> Self {
        Self {
            account,
            student_id: student_id.to_string(),
            enrolled_courses: Vec::new(),
            academic_records: BTreeMap::new(),
            cgpa_history: Vec::new(),
        }
    }

    pub fn add_semester_record(
        &mut self,
        semester: &str,
        courses_grades: BTreeMap<String, String>,
        cgpa: f64,
    ) {
        let now = Utc::now();
        self.academic_records.insert(
            semester.to_string(),
            SemesterRecord {
                courses_grades,
                cgpa,
                date_added: now,
            },
        );
        self.cgpa_history.push(CgpaEntry {
            semester: semester.to_string(),
            cgpa,
            date: now,
        });
    }

    pub fn current_cgpa(&self) -> f64 {
        self.cgpa_history.last().map(|e| e.cgpa).unwrap_or(0.0)
    }

    pub fn is_enrolled_in(&self, course_id: &str) -> bool {
        self.enrolled_courses.iter().any(|c| c == course_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(flatten)]
    pub account: Account,
    pub teacher_id: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub qualification: String,
    #[serde(default)]
    pub contact_info: BTreeMap<String, String>,
    #[serde(default)]
    pub salary: f64,
    #[serde(default)]
    pub courses_taught: Vec<String>,
    #[serde(default)]
    pub salary_slips: Vec<SalarySlip>,
}

impl Teacher {
    pub fn new(account: Account, teacher_id: &str) -> Self {
        Self {
            account,
            teacher_id: teacher_id.to_string(),
            department: String::new(),
            qualification: String::new(),
            contact_info: BTreeMap::new(),
            salary: 0.0,
            courses_taught: Vec::new(),
            salary_slips: Vec::new(),
        }
    }

    pub fn add_salary_slip(&mut self, slip: SalarySlip) {
        self.salary_slips.push(slip);
    }

    pub fn has_slip_for(&self, month: &str, year: i32) -> bool {
        self.salary_slips
            .iter()
            .any(|s| s.month.eq_ignore_ascii_case(month) && s.year == year)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    #[serde(flatten)]
    pub account: Account,
    pub admin_id: String,
    #[serde(default = "default_access_level")]
    pub access_level: String,
}

impl Admin {
    pub fn new(account: Account, admin_id: &str) -> Self {
        Self {
            account,
            admin_id: admin_id.to_string(),
            access_level: default_access_level(),
        }
    }
}

/// Role union dispatched on the `user_type` discriminant during
/// deserialization. Lowercase tags are accepted on input for compatibility
/// with older data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "user_type")]
pub enum User {
    #[serde(alias = "student")]
    Student(Student),
    #[serde(alias = "teacher")]
    Teacher(Teacher),
    #[serde(alias = "admin")]
    Admin(Admin),
}

impl User {
    pub fn account(&self) -> &Account {
        match self {
            User::Student(s) => &s.account,
            User::Teacher(t) => &t.account,
            User::Admin(a) => &a.account,
        }
    }

    pub fn user_type(&self) -> &'static str {
        match self {
            User::Student(_) => "Student",
            User::Teacher(_) => "Teacher",
            User::Admin(_) => "Admin",
        }
    }

    /// The role-specific identifier (student, teacher, or admin id).
    pub fn role_id(&self) -> &str {
        match self {
            User::Student(s) => &s.student_id,
            User::Teacher(t) => &t.teacher_id,
            User::Admin(a) => &a.admin_id,
        }
    }

    pub fn as_student(&self) -> Option<&Student> {
        match self {
            User::Student(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_student_mut(&mut self) -> Option<&mut Student> {
        match self {
            User::Student(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_teacher(&self) -> Option<&Teacher> {
        match self {
            User::Teacher(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_teacher_mut(&mut self) -> Option<&mut Teacher> {
        match self {
            User::Teacher(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_admin(&self) -> Option<&Admin> {
        match self {
            User::Admin(a) => Some(a),
            _ => None,
        }
    }
}
