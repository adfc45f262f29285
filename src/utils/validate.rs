// src/utils/validate.rs

use std::sync::LazyLock;

use regex::Regex;
use url::Url;
use validator::ValidationError;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+$").expect("username pattern is valid")
});

/// Usernames are restricted to ASCII letters, digits and underscores.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if !USERNAME_RE.is_match(username) {
        return Err(ValidationError::new("invalid_username_chars"));
    }
    Ok(())
}

/// Validates that a string is a correctly formatted http(s) URL.
pub fn validate_url_string(url: &str) -> Result<(), ValidationError> {
    match Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => Ok(()),
        _ => Err(ValidationError::new("invalid_url")),
    }
}

pub fn validate_role(role: &str) -> Result<(), ValidationError> {
    if role != "user" && role != "admin" {
        return Err(ValidationError::new("invalid_role"));
    }
    Ok(())
}

pub fn validate_difficulty(difficulty: &str) -> Result<(), ValidationError> {
    if crate::gamification::Difficulty::parse(difficulty).is_none() {
        return Err(ValidationError::new("invalid_difficulty"));
    }
    Ok(())
}

/// Options must be non-empty, unique and reasonably short.
pub fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.is_empty() {
        return Err(ValidationError::new("options_cannot_be_empty"));
    }
    for (i, opt) in options.iter().enumerate() {
        if opt.trim().is_empty() || opt.len() > 500 {
            return Err(ValidationError::new("invalid_option"));
        }
        if options[..i].iter().any(|o| o.eq_ignore_ascii_case(opt)) {
            return Err(ValidationError::new("duplicate_option"));
        }
    }
    Ok(())
}
