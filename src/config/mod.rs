pub mod file;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::{Parser, Subcommand};
use self::file::PortalConfig;
use std::path::Path;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_CONFIG_FILE: &str = "portal.toml";
const DEFAULT_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Parser)]
#[command(name = "campus-portal")]
#[command(about = "Educational records console: enrollment, academic records, payroll")]
pub struct Cli {
    #[arg(long, help = "Data directory (overrides portal.toml)")]
    pub data_dir: Option<String>,

    #[arg(long, help = "Path to a portal.toml configuration file")]
    pub config: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Seed the data directory with the default users and courses
    Init,
    /// Enroll a student in a course, optionally into a specific section
    Enroll {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
        #[arg(long)]
        section: Option<String>,
    },
    /// Remove a student from the section they are enrolled in
    Unenroll {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
    },
    /// List course sections
    Courses {
        #[arg(long, help = "Only sections of this course id")]
        course: Option<String>,
        #[arg(long, help = "Only sections with open seats")]
        available: bool,
    },
    /// List students and their enrollments
    Students,
    /// Create a student account
    AddStudent {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create a course section
    AddCourse {
        #[arg(long)]
        course: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        instructor: String,
        #[arg(long, help = "Defaults to the configured default capacity")]
        capacity: Option<usize>,
        #[arg(long, default_value = "A")]
        section: String,
    },
    /// Delete a user by id; students are removed from every roster
    DeleteUser {
        #[arg(long)]
        user_id: String,
    },
    /// Check roster/enrollment consistency and report mismatches
    Audit,
    /// Show system statistics
    Stats,
    /// Back up all data files and prune expired backups
    Backup,
    /// Restore a data file from a backup stamp
    Restore {
        #[arg(long, help = "users or courses")]
        kind: String,
        #[arg(long, help = "Backup stamp, e.g. 20250805_120000")]
        stamp: String,
    },
    /// Export everything as a single JSON bundle
    Export,
    /// Export all users to CSV
    ExportUsers {
        #[arg(long, help = "Write to this path instead of the export directory")]
        output: Option<String>,
    },
    /// Export a course roster to CSV
    ExportRoster {
        #[arg(long)]
        course: String,
        #[arg(long, help = "Write to this path instead of the export directory")]
        output: Option<String>,
    },
    /// Generate monthly salary slips for all teachers
    Payroll {
        #[arg(long)]
        month: String,
        #[arg(long)]
        year: i32,
    },
}

/// Effective configuration after merging CLI flags over the optional TOML
/// file over built-in defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: String,
    pub backup_retention_days: i64,
    pub default_capacity: usize,
    pub verbose: bool,
}

impl Settings {
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file_config = match &cli.config {
            Some(path) => PortalConfig::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                PortalConfig::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => PortalConfig::default(),
        };

        Ok(Self {
            data_dir: cli
                .data_dir
                .clone()
                .or(file_config.storage.data_dir)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            backup_retention_days: file_config
                .storage
                .backup_retention_days
                .unwrap_or(DEFAULT_RETENTION_DAYS),
            default_capacity: file_config
                .enrollment
                .default_capacity
                .unwrap_or(crate::domain::model::DEFAULT_CAPACITY),
            verbose: cli.verbose,
        })
    }
}

impl ConfigProvider for Settings {
    fn data_dir(&self) -> &str {
        &self.data_dir
    }

    fn backup_retention_days(&self) -> i64 {
        self.backup_retention_days
    }

    fn default_capacity(&self) -> usize {
        self.default_capacity
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("data_dir", &self.data_dir)?;
        validation::validate_range("backup_retention_days", self.backup_retention_days, 1, 365)?;
        validation::validate_capacity("default_capacity", self.default_capacity)?;
        Ok(())
    }
}
