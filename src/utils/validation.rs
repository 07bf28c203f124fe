use crate::utils::error::{PortalError, Result};
use regex::Regex;
use std::sync::OnceLock;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const USERNAME_PATTERN: &str = r"^[a-zA-Z0-9_]{3,20}$";

pub const PASSWORD_MIN_LENGTH: usize = 6;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"))
}

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(USERNAME_PATTERN).expect("username pattern is valid"))
}

pub fn validate_email(field_name: &str, email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(PortalError::InvalidValueError {
            field: field_name.to_string(),
            value: email.to_string(),
            reason: "Email cannot be empty".to_string(),
        });
    }

    if !email_regex().is_match(email) {
        return Err(PortalError::InvalidValueError {
            field: field_name.to_string(),
            value: email.to_string(),
            reason: "Invalid email format".to_string(),
        });
    }

    Ok(())
}

pub fn validate_username(field_name: &str, username: &str) -> Result<()> {
    let username = username.trim();

    if username.len() < 3 {
        return Err(PortalError::InvalidValueError {
            field: field_name.to_string(),
            value: username.to_string(),
            reason: "Username must be at least 3 characters long".to_string(),
        });
    }

    if username.len() > 20 {
        return Err(PortalError::InvalidValueError {
            field: field_name.to_string(),
            value: username.to_string(),
            reason: "Username cannot exceed 20 characters".to_string(),
        });
    }

    if !username_regex().is_match(username) {
        return Err(PortalError::InvalidValueError {
            field: field_name.to_string(),
            value: username.to_string(),
            reason: "Username can only contain letters, numbers, and underscores".to_string(),
        });
    }

    if username.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(PortalError::InvalidValueError {
            field: field_name.to_string(),
            value: username.to_string(),
            reason: "Username cannot start with a number".to_string(),
        });
    }

    Ok(())
}

/// Score a password from 0 to 6: length, each character class, and a length
/// bonus, minus one for common patterns.
pub fn password_strength(password: &str) -> u8 {
    let mut score: i8 = 0;

    if password.len() >= PASSWORD_MIN_LENGTH {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_punctuation()) {
        score += 1;
    }
    if password.len() >= 12 {
        score += 1;
    }

    let lowered = password.to_lowercase();
    let common_patterns = ["123", "abc", "password", "admin", "user"];
    if common_patterns.iter().any(|p| lowered.contains(p)) {
        score -= 1;
    }

    score.max(0) as u8
}

pub fn validate_password(field_name: &str, password: &str) -> Result<()> {
    if password.len() < PASSWORD_MIN_LENGTH {
        return Err(PortalError::InvalidValueError {
            field: field_name.to_string(),
            value: "<redacted>".to_string(),
            reason: format!(
                "Password must be at least {} characters long",
                PASSWORD_MIN_LENGTH
            ),
        });
    }

    if password_strength(password) < 3 {
        return Err(PortalError::InvalidValueError {
            field: field_name.to_string(),
            value: "<redacted>".to_string(),
            reason: "Password is too weak; mix upper/lower case, digits, and symbols".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PortalError::InvalidValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_capacity(field_name: &str, capacity: usize) -> Result<()> {
    validate_range(field_name, capacity, 1, 500)
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(PortalError::InvalidValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}
