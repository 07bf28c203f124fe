use crate::core::registry::{Registry, SystemStatistics};
use crate::domain::model::CourseSection;
use crate::domain::payroll::{month_number, SalarySlip};
use crate::domain::user::User;
use crate::utils::error::{PortalError, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// CSV of every user: identity columns plus a role-specific detail column.
/// Password digests are never exported.
pub fn users_csv(registry: &Registry) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "User ID",
        "Username",
        "Name",
        "Email",
        "User Type",
        "Role ID",
        "Details",
    ])?;

    for user in registry.users() {
        let account = user.account();
        let details = match user {
            User::Student(s) => format!("Enrolled in {} courses", s.enrolled_courses.len()),
            User::Teacher(t) => format!("Dept: {}, Salary: {:.2}", t.department, t.salary),
            User::Admin(a) => format!("Access: {}", a.access_level),
        };
        writer.write_record([
            account.user_id.as_str(),
            account.username.as_str(),
            account.name.as_str(),
            account.email.as_str(),
            user.user_type(),
            user.role_id(),
            details.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| PortalError::IoError(e.into_error()))
}

/// CSV roster across every section of a course.
pub fn roster_csv(registry: &Registry, course_id: &str) -> Result<Vec<u8>> {
    if registry.sections_of(course_id).next().is_none() {
        return Err(PortalError::NotFound {
            kind: "course",
            id: course_id.to_string(),
        });
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Course ID", "Section", "Student ID", "Student Name"])?;

    for section in registry.sections_of(course_id) {
        for student_id in &section.enrolled_students {
            let name = registry
                .find_student(student_id)
                .map(|s| s.account.name.as_str())
                .unwrap_or("<unknown>");
            writer.write_record([
                section.course_id.as_str(),
                section.section.as_str(),
                student_id.as_str(),
                name,
            ])?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| PortalError::IoError(e.into_error()))
}

/// Creates the month's slip for every teacher that does not have one yet,
/// using the standard component schedule. Returns how many were created; the
/// caller persists.
pub fn generate_monthly_slips(registry: &mut Registry, month: &str, year: i32) -> Result<usize> {
    let month_no = month_number(month).ok_or_else(|| PortalError::InvalidValueError {
        field: "month".to_string(),
        value: month.to_string(),
        reason: "Not a month name".to_string(),
    })?;

    let mut created = 0;
    for teacher in registry.teachers_mut() {
        if teacher.has_slip_for(month, year) {
            tracing::debug!(
                "skipping {} {} for {}: slip already exists",
                month,
                year,
                teacher.teacher_id
            );
            continue;
        }

        let slip_id = format!("SS{}{:02}{}", year, month_no, teacher.teacher_id);
        let basic = teacher.salary;

        let mut allowances = BTreeMap::new();
        allowances.insert("Housing Allowance".to_string(), basic * 0.15);
        allowances.insert("Transport Allowance".to_string(), 500.0);
        allowances.insert("Medical Allowance".to_string(), 300.0);

        let mut deductions = BTreeMap::new();
        deductions.insert("Tax".to_string(), basic * 0.12);
        deductions.insert("Insurance".to_string(), 150.0);
        deductions.insert("Pension".to_string(), basic * 0.05);

        let teacher_id = teacher.teacher_id.clone();
        teacher.add_salary_slip(SalarySlip::new(
            &slip_id, &teacher_id, month, year, basic, allowances, deductions,
        ));
        created += 1;
    }

    tracing::info!("generated {} salary slips for {} {}", created, month, year);
    Ok(created)
}

/// The printable slip block.
pub fn render_salary_slip(slip: &SalarySlip) -> String {
    let mut out = String::new();
    let rule = "=".repeat(50);

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "             SALARY SLIP");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Slip ID: {}", slip.slip_id);
    let _ = writeln!(out, "Teacher ID: {}", slip.teacher_id);
    let _ = writeln!(out, "Month/Year: {} {}", slip.month, slip.year);
    let _ = writeln!(out, "Generated: {}", slip.generated_date.format("%Y-%m-%d"));
    let _ = writeln!(out, "{}", rule);

    let _ = writeln!(out, "\nEARNINGS:");
    let _ = writeln!(out, "{:<20}: ${:>12.2}", "Basic Salary", slip.basic_salary);
    for (kind, amount) in &slip.allowances {
        let _ = writeln!(out, "{:<20}: ${:>12.2}", kind, amount);
    }
    let _ = writeln!(out, "{:<20}: ${:>12.2}", "Total Allowances", slip.total_allowances());
    let _ = writeln!(out, "{:<20}: ${:>12.2}", "Gross Salary", slip.gross_salary());

    let _ = writeln!(out, "\nDEDUCTIONS:");
    if slip.deductions.is_empty() {
        let _ = writeln!(out, "No deductions");
    } else {
        for (kind, amount) in &slip.deductions {
            let _ = writeln!(out, "{:<20}: ${:>12.2}", kind, amount);
        }
    }
    let _ = writeln!(out, "{:<20}: ${:>12.2}", "Total Deductions", slip.total_deductions());

    let _ = writeln!(out, "\n{}", rule);
    let _ = writeln!(out, "{:<20}: ${:>12.2}", "NET SALARY", slip.net_salary);
    let _ = writeln!(out, "{}", rule);
    out
}

/// The printable course-information block.
pub fn render_course(course: &CourseSection) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Course ID: {}", course.course_id);
    let _ = writeln!(out, "Course Name: {}", course.course_name);
    let _ = writeln!(out, "Section: {}", course.section);
    let _ = writeln!(out, "Instructor: {}", course.instructor);
    let _ = writeln!(out, "Capacity: {}", course.capacity);
    let _ = writeln!(out, "Enrolled: {}", course.enrollment_count());
    let _ = writeln!(out, "Available Spots: {}", course.available_spots());
    let _ = writeln!(out, "Status: {}", if course.is_full() { "FULL" } else { "OPEN" });
    out
}

pub fn render_statistics(stats: &SystemStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total users: {}", stats.total_users);
    let _ = writeln!(out, "  Students: {}", stats.total_students);
    let _ = writeln!(out, "  Teachers: {}", stats.total_teachers);
    let _ = writeln!(out, "  Admins: {}", stats.total_admins);
    let _ = writeln!(out, "Course sections: {}", stats.total_course_sections);
    let _ = writeln!(out, "Enrollments: {}", stats.total_enrollments);
    let _ = writeln!(out, "As of: {}", stats.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    out
}
