use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A monthly salary slip for a teacher. `net_salary` is kept in sync with the
/// component maps and never goes negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalarySlip {
    pub slip_id: String,
    pub teacher_id: String,
    pub month: String,
    pub year: i32,
    pub basic_salary: f64,
    #[serde(default)]
    pub allowances: BTreeMap<String, f64>,
    #[serde(default)]
    pub deductions: BTreeMap<String, f64>,
    pub net_salary: f64,
    pub generated_date: DateTime<Utc>,
}

impl SalarySlip {
    pub fn new(
        slip_id: &str,
        teacher_id: &str,
        month: &str,
        year: i32,
        basic_salary: f64,
        allowances: BTreeMap<String, f64>,
        deductions: BTreeMap<String, f64>,
    ) -> Self {
        let mut slip = Self {
            slip_id: slip_id.to_string(),
            teacher_id: teacher_id.to_string(),
            month: month.to_string(),
            year,
            basic_salary,
            allowances,
            deductions,
            net_salary: 0.0,
            generated_date: Utc::now(),
        };
        slip.recompute();
        slip
    }

    fn recompute(&mut self) {
        let net = self.basic_salary + self.total_allowances() - self.total_deductions();
        self.net_salary = net.max(0.0);
    }

    pub fn total_allowances(&self) -> f64 {
        self.allowances.values().sum()
    }

    pub fn total_deductions(&self) -> f64 {
        self.deductions.values().sum()
    }

    pub fn gross_salary(&self) -> f64 {
        self.basic_salary + self.total_allowances()
    }

    pub fn add_allowance(&mut self, kind: &str, amount: f64) {
        self.allowances.insert(kind.to_string(), amount);
        self.recompute();
    }

    pub fn add_deduction(&mut self, kind: &str, amount: f64) {
        self.deductions.insert(kind.to_string(), amount);
        self.recompute();
    }

    pub fn remove_allowance(&mut self, kind: &str) -> bool {
        let removed = self.allowances.remove(kind).is_some();
        if removed {
            self.recompute();
        }
        removed
    }

    pub fn remove_deduction(&mut self, kind: &str) -> bool {
        let removed = self.deductions.remove(kind).is_some();
        if removed {
            self.recompute();
        }
        removed
    }
}

impl fmt::Display for SalarySlip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Salary Slip {} - {} {} (${:.2})",
            self.slip_id, self.month, self.year, self.net_salary
        )
    }
}

/// 1-based month number for slip ids, or None for an unknown month name.
pub fn month_number(month: &str) -> Option<u32> {
    let n = match month.to_lowercase().as_str() {
        "january" => 1,
        "february" => 2,
        "march" => 3,
        "april" => 4,
        "may" => 5,
        "june" => 6,
        "july" => 7,
        "august" => 8,
        "september" => 9,
        "october" => 10,
        "november" => 11,
        "december" => 12,
        _ => return None,
    };
    Some(n)
}
