use serde::{Deserialize, Serialize};
use validator::Validate;

use super::FormErrors;

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "This field is required."))]
    #[serde(default)]
    pub username: String,
    #[validate(length(min = 1, message = "This field is required."))]
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct SignupForm {
    #[validate(length(
        min = 3,
        max = 150,
        message = "Username must be between 3 and 150 characters."
    ))]
    #[serde(default)]
    pub username: String,
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
}

pub const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";

/// Letters, digits and `@.+-_` only.
fn username_chars_valid(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

impl LoginForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        self.validate().map_err(FormErrors::from)
    }
}

impl SignupForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };
        if !username_chars_valid(&self.username) {
            errors.add("username", INVALID_USERNAME);
        }
        if self.password1 != self.password2 {
            errors.add("password2", PASSWORD_MISMATCH);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
