/// Database row models
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Hr,
    Office,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Hr => "hr",
            Role::Office => "office",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "hr" => Ok(Role::Hr),
            "office" => Ok(Role::Office),
            _ => Err(AppError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

/// Account record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub full_name: String,
    pub email_verified: bool,
    pub pending_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub account_id: String,
    pub profile_id: Option<String>,
    pub user_agent: Option<String>,
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Email token record
///
/// `purpose` is one of "verify_email", "change_email", "reset_password".
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EmailToken {
    pub token: String,
    pub account_id: String,
    pub purpose: String,
    pub new_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

/// Office sub-profile record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OfficeProfile {
    pub id: String,
    pub account_id: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub pin_hash: String,
    pub permissions: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scholarship application record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub account_id: String,
    pub course: String,
    pub year_level: i64,
    pub grade_file: Option<String>,
    pub signature_file: Option<String>,
    pub status: String,
    pub office_id: Option<String>,
    pub interview_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Re-application record, links back to the prior application
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReApplication {
    pub id: String,
    pub account_id: String,
    pub previous_application_id: String,
    pub course: String,
    pub year_level: i64,
    pub grade_file: Option<String>,
    pub signature_file: Option<String>,
    pub status: String,
    pub office_id: Option<String>,
    pub interview_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Daily time record entry, one row per trainee per day
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DtrEntry {
    pub id: String,
    pub application_id: String,
    pub entry_date: NaiveDate,
    pub time_in: Option<DateTime<Utc>>,
    pub time_out: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Leave request record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: String,
    pub application_id: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub reason: String,
    pub status: String,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Archived application (full copy plus retention metadata)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ArchivedApplication {
    pub id: String,
    pub source_id: String,
    pub account_id: String,
    pub course: String,
    pub year_level: i64,
    pub grade_file: Option<String>,
    pub signature_file: Option<String>,
    pub status: String,
    pub office_id: Option<String>,
    pub interview_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub semester_label: String,
    pub archived_at: DateTime<Utc>,
    pub delete_after: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Archived re-application
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ArchivedReApplication {
    pub id: String,
    pub source_id: String,
    pub account_id: String,
    pub previous_application_id: String,
    pub course: String,
    pub year_level: i64,
    pub grade_file: Option<String>,
    pub signature_file: Option<String>,
    pub status: String,
    pub office_id: Option<String>,
    pub interview_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub semester_label: String,
    pub archived_at: DateTime<Utc>,
    pub delete_after: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Archived leave request
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ArchivedLeaveRequest {
    pub id: String,
    pub source_id: String,
    pub application_id: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub reason: String,
    pub status: String,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub semester_label: String,
    pub archived_at: DateTime<Utc>,
    pub delete_after: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit log entry, append-only
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub actor_account_id: String,
    pub actor_profile_id: Option<String>,
    pub action: String,
    pub module: String,
    pub before_value: Option<String>,
    pub after_value: Option<String>,
    pub created_at: DateTime<Utc>,
}
