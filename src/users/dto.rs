use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::repo_types::{NewUser, UserNames};
use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 8;
const MAX_EMAIL_LEN: usize = 320;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> AppResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::validation(format!(
            "{field} should be between {min} and {max} characters"
        )));
    }
    Ok(())
}

fn check_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password should be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(alias = "fname")]
    pub first_name: String,
    #[serde(alias = "lname")]
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> AppResult<NewUser> {
        let names = UpdateUserRequest {
            first_name: self.first_name,
            last_name: self.last_name,
        }
        .validate()?;
        let email = normalize_email(&self.email);
        if !is_valid_email(&email) {
            return Err(AppError::validation("Invalid email"));
        }
        check_password(&self.password)?;
        Ok(NewUser {
            first_name: names.first_name,
            last_name: names.last_name,
            email,
            password: self.password,
        })
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for a profile update; only the names are writable.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(alias = "fname")]
    pub first_name: String,
    #[serde(alias = "lname")]
    pub last_name: String,
}

impl UpdateUserRequest {
    pub fn validate(self) -> AppResult<UserNames> {
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        check_len("First name", &first_name, 3, 32)?;
        check_len("Last name", &last_name, 2, 32)?;
        Ok(UserNames {
            first_name,
            last_name,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(alias = "oldPassword")]
    pub old_password: String,
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.old_password.is_empty() || self.new_password == self.old_password {
            return Err(AppError::validation("Wrong input"));
        }
        check_password(&self.new_password)
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> AppResult<()> {
        check_password(&self.new_password)
    }
}
