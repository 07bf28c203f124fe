use campus_portal::config::{Cli, Command, Settings};
use campus_portal::core::enrollment::{EnrollmentCoordinator, EnrollmentError};
use campus_portal::core::persistence::PortalStore;
use campus_portal::core::registry::Registry;
use campus_portal::core::{consistency, reports};
use campus_portal::domain::model::CourseSection;
use campus_portal::domain::ports::{ConfigProvider, Storage};
use campus_portal::domain::user::{Account, Student, User};
use campus_portal::utils::validation::{self, Validate};
use campus_portal::utils::logger;
use campus_portal::LocalStorage;
use chrono::Utc;
use clap::Parser;
use std::process;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting campus-portal");

    let settings = match Settings::resolve(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Failed to resolve configuration: {}", e);
            eprintln!("❌ {}", e);
            process::exit(2);
        }
    };
    if let Err(e) = settings.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        process::exit(2);
    }
    if settings.verbose {
        tracing::debug!("Settings: {:?}", settings);
    }

    let storage = LocalStorage::new(settings.data_dir());
    let store = PortalStore::new(storage, settings.backup_retention_days());

    let mut registry = store.load_registry()?;
    tracing::info!(
        "Loaded {} users and {} course sections",
        registry.user_count(),
        registry.course_count()
    );

    // Reconciliation pass on every load: mismatches between rosters and
    // enrolled-course sets are reported, never repaired.
    let startup_report = consistency::audit(&registry);
    startup_report.log();

    match cli.command {
        Command::Init => {
            if registry.user_count() > 0 {
                eprintln!(
                    "❌ Data directory already contains {} users; refusing to overwrite",
                    registry.user_count()
                );
                process::exit(1);
            }
            let seeded = Registry::seed_default();
            store.save_registry(&seeded)?;
            println!(
                "✅ Initialized default data: {} users, {} course sections",
                seeded.user_count(),
                seeded.course_count()
            );
        }

        Command::Enroll {
            student,
            course,
            section,
        } => {
            let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);
            match coordinator.enroll(&student, &course, section.as_deref()) {
                Ok(placement) => println!("✅ Enrolled {} in {}", student, placement),
                Err(e) => fail_enrollment(e),
            }
        }

        Command::Unenroll { student, course } => {
            let mut coordinator = EnrollmentCoordinator::new(&mut registry, &store);
            match coordinator.unenroll(&student, &course) {
                Ok(placement) => println!("✅ Unenrolled {} from {}", student, placement),
                Err(e) => fail_enrollment(e),
            }
        }

        Command::Courses { course, available } => {
            let sections: Vec<&CourseSection> = registry
                .courses()
                .iter()
                .filter(|c| course.as_deref().map_or(true, |id| c.course_id == id))
                .filter(|c| !available || !c.is_full())
                .collect();

            if sections.is_empty() {
                println!("No matching course sections.");
            }
            for section in sections {
                println!("{}", section);
                print!("{}", reports::render_course(section));
                println!();
            }
        }

        Command::Students => {
            for student in registry.students() {
                let courses = if student.enrolled_courses.is_empty() {
                    "none".to_string()
                } else {
                    student.enrolled_courses.join(", ")
                };
                println!(
                    "{} {} <{}> | CGPA {:.2} | courses: {}",
                    student.student_id,
                    student.account.name,
                    student.account.email,
                    student.current_cgpa(),
                    courses
                );
            }
        }

        Command::AddStudent {
            name,
            email,
            username,
            password,
        } => {
            if let Err(e) = validation::validate_non_empty_string("name", &name)
                .and_then(|()| validation::validate_email("email", &email))
                .and_then(|()| validation::validate_username("username", &username))
                .and_then(|()| validation::validate_password("password", &password))
            {
                eprintln!("❌ {}", e);
                process::exit(1);
            }

            let student_id = registry.next_user_id("STU");
            let account = Account::new(&username, &password, &name, &email, &student_id);
            if let Err(e) = registry.add_user(User::Student(Student::new(account, &student_id))) {
                eprintln!("❌ {}", e);
                process::exit(1);
            }
            persist_or_exit(&store, &registry);
            println!("✅ Created student {} ({})", student_id, username);
        }

        Command::AddCourse {
            course,
            name,
            instructor,
            capacity,
            section,
        } => {
            let capacity = capacity.unwrap_or_else(|| settings.default_capacity());
            if let Err(e) = validation::validate_non_empty_string("course", &course)
                .and_then(|()| validation::validate_non_empty_string("name", &name))
                .and_then(|()| validation::validate_non_empty_string("instructor", &instructor))
                .and_then(|()| validation::validate_capacity("capacity", capacity))
            {
                eprintln!("❌ {}", e);
                process::exit(1);
            }

            let new_section = CourseSection::new(&course, &name, &instructor, capacity, &section);
            if let Err(e) = registry.add_course(new_section) {
                eprintln!("❌ {}", e);
                process::exit(1);
            }
            persist_or_exit(&store, &registry);
            println!("✅ Created course section {}-{}", course, section);
        }

        Command::DeleteUser { user_id } => match registry.delete_user(&user_id) {
            Ok(user) => {
                persist_or_exit(&store, &registry);
                println!("✅ Deleted {} {}", user.user_type(), user_id);
            }
            Err(e) => {
                eprintln!("❌ {}", e);
                process::exit(1);
            }
        },

        Command::Audit => {
            if startup_report.is_clean() {
                println!("✅ No consistency issues found.");
            } else {
                println!(
                    "Found {} consistency issue(s):",
                    startup_report.issues.len()
                );
                for issue in &startup_report.issues {
                    println!("  - {}", issue);
                }
                process::exit(1);
            }
        }

        Command::Stats => {
            print!("{}", reports::render_statistics(&registry.statistics()));
        }

        Command::Backup => {
            let copied = store.backup_all()?;
            let removed = store.cleanup_old_backups()?;
            println!(
                "✅ Backed up {} file(s); removed {} expired backup(s)",
                copied, removed
            );
        }

        Command::Restore { kind, stamp } => match store.restore(&kind, &stamp) {
            Ok(()) => println!("✅ Restored {} from backup {}", kind, stamp),
            Err(e) => {
                eprintln!("❌ {}", e);
                process::exit(1);
            }
        },

        Command::Export => {
            let name = store.export_bundle(&registry)?;
            println!("📁 Exported to {}/{}", settings.data_dir(), name);
        }

        Command::ExportUsers { output } => {
            let bytes = reports::users_csv(&registry)?;
            write_report(&store, &settings, output, "users_export", &bytes)?;
        }

        Command::ExportRoster { course, output } => match reports::roster_csv(&registry, &course) {
            Ok(bytes) => {
                let prefix = format!("{}_roster", course);
                write_report(&store, &settings, output, &prefix, &bytes)?;
            }
            Err(e) => {
                eprintln!("❌ {}", e);
                process::exit(1);
            }
        },

        Command::Payroll { month, year } => {
            match reports::generate_monthly_slips(&mut registry, &month, year) {
                Ok(created) => {
                    if created > 0 {
                        persist_or_exit(&store, &registry);
                    }
                    println!("✅ Generated {} salary slip(s) for {} {}", created, month, year);

                    let sample = registry
                        .teachers()
                        .flat_map(|t| t.salary_slips.iter())
                        .find(|s| s.month.eq_ignore_ascii_case(&month) && s.year == year);
                    if let Some(slip) = sample {
                        println!("\nSample slip:");
                        print!("{}", reports::render_salary_slip(slip));
                    }
                }
                Err(e) => {
                    eprintln!("❌ {}", e);
                    process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Logical enrollment failures exit 1; a save failure after an applied
/// in-memory change exits 3 so callers can tell the states may disagree.
fn fail_enrollment(error: EnrollmentError) -> ! {
    eprintln!("❌ {}", error);
    let code = match error {
        EnrollmentError::SaveFailed { .. } => 3,
        _ => 1,
    };
    process::exit(code);
}

fn persist_or_exit<S: Storage>(store: &PortalStore<S>, registry: &Registry) {
    if let Err(e) = store.save_registry(registry) {
        tracing::error!("saving failed after an applied change: {}", e);
        eprintln!("❌ Changes were applied in memory but could not be saved: {}", e);
        process::exit(3);
    }
}

/// Writes CSV bytes either to an explicit path or into the data directory's
/// export folder with a timestamped name.
fn write_report<S: Storage>(
    store: &PortalStore<S>,
    settings: &Settings,
    output: Option<String>,
    prefix: &str,
    bytes: &[u8],
) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, bytes)?;
            println!("📁 Exported to {}", path);
        }
        None => {
            let name = format!("{}_{}.csv", prefix, Utc::now().format("%Y%m%d_%H%M%S"));
            let path = store.save_export(&name, bytes)?;
            println!("📁 Exported to {}/{}", settings.data_dir(), path);
        }
    }
    Ok(())
}
