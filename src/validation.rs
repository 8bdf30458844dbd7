// Copyright (c) Photogram Team
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FieldError;
use crate::models::user::AuthType;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").unwrap());

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{9,15}$").unwrap());

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").unwrap());

pub const MAX_CAPTION_LEN: usize = 2200;
pub const MAX_COMMENT_LEN: usize = 1000;
pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_NAME_LEN: usize = 150;
pub const MAX_PASSWORD_LEN: usize = 128;

/// What a free-form identifier string looks like. Email is checked first,
/// then phone, then username (an all-digit username would otherwise shadow
/// phone numbers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Email,
    Phone,
    Username,
}

pub fn classify(input: &str) -> Option<IdentifierKind> {
    if EMAIL_RE.is_match(input) {
        Some(IdentifierKind::Email)
    } else if PHONE_RE.is_match(input) {
        Some(IdentifierKind::Phone)
    } else if USERNAME_RE.is_match(input) {
        Some(IdentifierKind::Username)
    } else {
        None
    }
}

/// Signup accepts an email address or a phone number only.
pub fn detect_auth_type(input: &str) -> Option<AuthType> {
    match classify(input) {
        Some(IdentifierKind::Email) => Some(AuthType::Email),
        Some(IdentifierKind::Phone) => Some(AuthType::Phone),
        _ => None,
    }
}

pub fn is_valid_code(code: &str) -> bool {
    code.len() == 4 && code.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug)]
pub struct ProfileInfo<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

/// Ordered validation of the profile-completion payload. Returns every
/// failure, field-scoped, instead of stopping at the first one.
/// `username_taken` is resolved against the store by the caller.
pub fn validate_profile_info(info: &ProfileInfo<'_>, username_taken: bool) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if info.username.is_empty() || info.username.len() > MAX_USERNAME_LEN {
        errors.push(FieldError::new(
            "username",
            "Username must be between 1 and 150 characters.",
        ));
    } else if !USERNAME_RE.is_match(info.username) {
        errors.push(FieldError::new(
            "username",
            "Username may only contain letters, digits, and . _ - characters.",
        ));
    } else if username_taken {
        errors.push(FieldError::new("username", "Username is already taken."));
    }

    if info.first_name.is_empty()
        || info.first_name.len() > MAX_NAME_LEN
        || !info.first_name.chars().all(char::is_alphabetic)
    {
        errors.push(FieldError::new(
            "first_name",
            "First name must contain only alphabetic characters.",
        ));
    }

    if info.last_name.is_empty()
        || info.last_name.len() > MAX_NAME_LEN
        || !info.last_name.chars().all(char::is_alphabetic)
    {
        errors.push(FieldError::new(
            "last_name",
            "Last name must contain only alphabetic characters.",
        ));
    }

    if info.password.is_empty() || info.password.len() > MAX_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            "Password must be between 1 and 128 characters.",
        ));
    } else if info.password != info.confirm_password {
        errors.push(FieldError::new("password", "Passwords do not match."));
    }

    errors
}

pub fn validate_caption(caption: &str) -> Option<FieldError> {
    if caption.chars().count() > MAX_CAPTION_LEN {
        Some(FieldError::new(
            "caption",
            "Caption must not exceed 2200 characters.",
        ))
    } else {
        None
    }
}

pub fn validate_comment_content(content: &str) -> Option<FieldError> {
    if content.is_empty() {
        Some(FieldError::new("content", "Content must not be empty."))
    } else if content.chars().count() > MAX_COMMENT_LEN {
        Some(FieldError::new(
            "content",
            "Content must not exceed 1000 characters.",
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_email() {
        assert_eq!(classify("valid@example.com"), Some(IdentifierKind::Email));
        assert_eq!(
            classify("user.name+tag@mail.example.org"),
            Some(IdentifierKind::Email)
        );
    }

    #[test]
    fn classifies_phone() {
        assert_eq!(classify("+998901234567"), Some(IdentifierKind::Phone));
        assert_eq!(classify("998901234567"), Some(IdentifierKind::Phone));
    }

    #[test]
    fn classifies_username() {
        assert_eq!(classify("some_user.42"), Some(IdentifierKind::Username));
    }

    #[test]
    fn phone_wins_over_username_for_digit_strings() {
        // All-digit strings match the username pattern too; phone is
        // checked first so they resolve as phone numbers.
        assert_eq!(classify("123456789012"), Some(IdentifierKind::Phone));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(classify("not an identifier!"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn detect_auth_type_rejects_usernames() {
        assert_eq!(detect_auth_type("just_a_username"), None);
        assert_eq!(detect_auth_type("valid@example.com"), Some(AuthType::Email));
        assert_eq!(detect_auth_type("+998901234567"), Some(AuthType::Phone));
    }

    #[test]
    fn code_must_be_four_digits() {
        assert!(is_valid_code("1234"));
        assert!(is_valid_code("0007"));
        assert!(!is_valid_code("123"));
        assert!(!is_valid_code("12345"));
        assert!(!is_valid_code("12a4"));
    }

    fn info<'a>() -> ProfileInfo<'a> {
        ProfileInfo {
            username: "new_valid_user",
            first_name: "John",
            last_name: "Doe",
            password: "StrongPassw0rd!",
            confirm_password: "StrongPassw0rd!",
        }
    }

    #[test]
    fn valid_profile_info_passes() {
        assert!(validate_profile_info(&info(), false).is_empty());
    }

    #[test]
    fn taken_username_is_field_scoped() {
        let errors = validate_profile_info(&info(), true);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "username");
        assert_eq!(errors[0].message, "Username is already taken.");
    }

    #[test]
    fn numeric_first_name_rejected() {
        let mut i = info();
        i.first_name = "Info123";
        let errors = validate_profile_info(&i, false);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "first_name");
    }

    #[test]
    fn password_mismatch_rejected() {
        let mut i = info();
        i.confirm_password = "something-else";
        let errors = validate_profile_info(&i, false);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "password");
    }

    #[test]
    fn multiple_failures_reported_in_field_order() {
        let mut i = info();
        i.first_name = "x1";
        i.confirm_password = "nope";
        let errors = validate_profile_info(&i, true);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["username", "first_name", "password"]);
    }

    #[test]
    fn caption_length_capped() {
        assert!(validate_caption(&"a".repeat(2200)).is_none());
        assert!(validate_caption(&"a".repeat(2201)).is_some());
    }

    #[test]
    fn comment_length_capped() {
        assert!(validate_comment_content(&"a".repeat(1000)).is_none());
        assert!(validate_comment_content(&"a".repeat(1001)).is_some());
        assert!(validate_comment_content("").is_some());
    }
}
