//! Field-level input validation.
//!
//! Every check collects all problems instead of stopping at the first one so
//! the API can report them together.

use serde::{Deserialize, Serialize};

pub const TITLE_MAX_LEN: usize = 100;
pub const CATEGORY_NAME_MAX_LEN: usize = 50;
pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 100;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 100;

/// A single validation problem tied to an input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Accumulates field errors.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Trimmed length must fall in `min..=max` characters.
    pub fn length(&mut self, field: &str, label: &str, value: &str, min: usize, max: usize) {
        let len = value.trim().chars().count();
        if len == 0 && min > 0 {
            self.push(field, format!("{label} is required"));
        } else if len < min {
            self.push(field, format!("{label} must be at least {min} characters"));
        } else if len > max {
            self.push(field, format!("{label} cannot exceed {max} characters"));
        }
    }

    pub fn not_blank(&mut self, field: &str, label: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, format!("{label} is required"));
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if !is_valid_email(value) {
            self.push(field, "Must be a valid email address");
        }
    }

    pub fn password(&mut self, field: &str, value: &str) {
        let len = value.chars().count();
        if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
            self.push(
                field,
                format!(
                    "Password must be between {PASSWORD_MIN_LEN} and {PASSWORD_MAX_LEN} characters"
                ),
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise every collected error.
    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Validate the title of a post.
pub fn post_title(v: &mut Validator, title: &str) {
    v.length("title", "Title", title, 1, TITLE_MAX_LEN);
}

/// Validate the content of a post.
pub fn post_content(v: &mut Validator, content: &str) {
    v.not_blank("content", "Content", content);
}

/// Validate a category name.
pub fn category_name(v: &mut Validator, name: &str) {
    v.length("name", "Name", name, 1, CATEGORY_NAME_MAX_LEN);
}

/// Validate a display name.
pub fn user_name(v: &mut Validator, name: &str) {
    v.length("name", "Name", name, NAME_MIN_LEN, NAME_MAX_LEN);
}

/// One `@`, a non-empty local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    !local.is_empty()
        && !email.contains(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
