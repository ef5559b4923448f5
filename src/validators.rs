/// Sign-up input validators
///
/// Length limits follow the account rules: usernames 5-20 characters,
/// passwords 8-16 characters, emails in a practical RFC 5322 subset.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MIN_USERNAME_LENGTH: usize = 5;
const MAX_USERNAME_LENGTH: usize = 20;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 16;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$"
    ).expect("email regex is valid");
}

/// Validates a username and returns it trimmed
pub fn validate_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();
    check_length("username", trimmed, MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH)?;

    if trimmed.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a password; it is returned untouched, whitespace included
pub fn validate_password(password: &str) -> Result<&str, ValidationError> {
    check_length("password", password, MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH)?;
    Ok(password)
}

/// Validates an email address and returns it trimmed
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(trimmed.to_string())
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::EmptyField(field.to_string()));
    }
    if len < min {
        return Err(ValidationError::TooShort(field.to_string(), min));
    }
    if len > max {
        return Err(ValidationError::TooLong(field.to_string(), max));
    }
    Ok(())
}
