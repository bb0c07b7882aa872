/// Account management system
///
/// Handles account creation, authentication, sessions, and email/password
/// lifecycle operations.

mod manager;

pub use manager::{AccountManager, SessionTokens};

use crate::db::models::Role;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Signup request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    /// Defaults to student; hr/office creation is gated at the endpoint
    #[serde(default)]
    pub role: Option<Role>,
}

/// Signin request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Session response returned on signin / profile selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub account_id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub profile_id: Option<String>,
}

/// Account info (for /auth/me)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub email_verified: bool,
    pub pending_email: Option<String>,
    pub profile_id: Option<String>,
}

/// Change password request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Email change request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmailChangeRequest {
    #[validate(email)]
    pub new_email: String,
}

/// Token-carrying request (verify email, confirm email change)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// Validated session extracted from an access token
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub account_id: String,
    pub session_id: String,
    pub role: Role,
    pub profile_id: Option<String>,
}
