// src/models/user.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::result::AssessmentResult;

/// Subject of session requests made without a token. Guest results are
/// stored under this id.
pub const GUEST_USER_ID: &str = "guestUser";

/// Resolved identity of the caller.
///
/// The admin is a single sentinel identity and is never stored as a `StoredUser`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    User(String),
}

impl Role {
    pub const ADMIN: &'static str = "admin";
    pub const USER: &'static str = "user";

    /// Wire name used in token claims and profiles.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => Self::ADMIN,
            Role::User(_) => Self::USER,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Registered user record, persisted under the users key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub id: String,
    pub name: String,

    /// Unique among stored users.
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,

    /// Argon2 hash. A record without one cannot log in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

/// Public view of a stored user (excludes the password hash).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&StoredUser> for UserResponse {
    fn from(u: &StoredUser) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
        }
    }
}

/// Aggregated profile of the current user, history included.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: &'static str,
    pub assessment_history: Vec<AssessmentResult>,
    pub interests: Vec<String>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password must be at least 6 characters."
    ))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match."))]
    pub confirm_password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInterestsRequest {
    #[validate(length(max = 20), custom(function = validate_interests))]
    pub interests: Vec<String>,
}

fn validate_interests(interests: &[String]) -> Result<(), validator::ValidationError> {
    for interest in interests {
        if interest.trim().is_empty() || interest.len() > 100 {
            return Err(validator::ValidationError::new("invalid_interest"));
        }
    }
    Ok(())
}
