//! Synchronous form checks. Each validator evaluates its checks in a fixed order and stops at the first failure.

use crate::catalog::Category;
use chrono_tz::Tz;

pub const MAX_USERNAME_LEN: usize = 20;
pub const MAX_PASSWORD_LEN: usize = 40;
pub const MAX_FILENAME_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// A rejected form. The message is shown to the user next to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Username cannot be empty")]
    UsernameEmpty,
    #[error("Password cannot be empty")]
    PasswordEmpty,
    #[error("Username cannot be longer than 20 characters")]
    UsernameTooLong,
    #[error("Password cannot be longer than 40 characters")]
    PasswordTooLong,
    #[error("Please use lower case username")]
    UsernameNotLowercase,
    #[error("Passwords doesn't match")]
    PasswordsDiffer,
    #[error("Unknown timezone")]
    UnknownTimezone,
    #[error("Filesize cannot be more than 1GB")]
    FileTooLarge,
    #[error("Filename are too long")]
    FilenameTooLong,
    #[error("Description are too long")]
    DescriptionTooLong,
    #[error("Unknown category")]
    UnknownCategory,
}

/// Checks the login form.
pub fn credentials(username: &str, password: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::UsernameEmpty);
    }
    if password.is_empty() {
        return Err(ValidationError::PasswordEmpty);
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ValidationError::UsernameTooLong);
    }
    if password.chars().count() > MAX_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooLong);
    }
    if username.chars().any(char::is_uppercase) {
        return Err(ValidationError::UsernameNotLowercase);
    }
    Ok(())
}

/// Checks the registration form and returns the parsed timezone.
pub fn registration(
    username: &str,
    password: &str,
    password_confirm: &str,
    timezone: &str,
) -> Result<Tz, ValidationError> {
    credentials(username, password)?;
    if password != password_confirm {
        return Err(ValidationError::PasswordsDiffer);
    }
    timezone
        .parse::<Tz>()
        .map_err(|_| ValidationError::UnknownTimezone)
}

/// Checks an uploaded file's metadata and returns its category.
pub fn upload(
    size_bytes: u64,
    max_size_bytes: u64,
    filename: &str,
    description: &str,
    category: &str,
) -> Result<Category, ValidationError> {
    if size_bytes > max_size_bytes {
        return Err(ValidationError::FileTooLarge);
    }
    if filename.chars().count() > MAX_FILENAME_LEN {
        return Err(ValidationError::FilenameTooLong);
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::DescriptionTooLong);
    }
    category
        .parse()
        .map_err(|_| ValidationError::UnknownCategory)
}
