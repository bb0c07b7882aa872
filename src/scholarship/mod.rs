/// Scholarship workflow
///
/// Applications and re-applications move through a single status enum,
/// driven by HR. Deployed trainees accumulate daily time records and may
/// file leave requests against their application.

mod applications;
mod dtr;
mod leave;

pub use applications::ApplicationManager;
pub use dtr::DtrManager;
pub use leave::LeaveManager;

use crate::error::{AppError, AppResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Application status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Shortlisted,
    ForInterview,
    Interviewed,
    Approved,
    Deployed,
    Completed,
    Rejected,
    Withdrawn,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Shortlisted => "shortlisted",
            Status::ForInterview => "for_interview",
            Status::Interviewed => "interviewed",
            Status::Approved => "approved",
            Status::Deployed => "deployed",
            Status::Completed => "completed",
            Status::Rejected => "rejected",
            Status::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "pending" => Ok(Status::Pending),
            "shortlisted" => Ok(Status::Shortlisted),
            "for_interview" => Ok(Status::ForInterview),
            "interviewed" => Ok(Status::Interviewed),
            "approved" => Ok(Status::Approved),
            "deployed" => Ok(Status::Deployed),
            "completed" => Ok(Status::Completed),
            "rejected" => Ok(Status::Rejected),
            "withdrawn" => Ok(Status::Withdrawn),
            _ => Err(AppError::Validation(format!("Invalid status: {}", s))),
        }
    }

    /// Terminal statuses admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Rejected | Status::Withdrawn)
    }

    /// Terminal-negative statuses are subject to archival
    pub fn is_terminal_negative(&self) -> bool {
        matches!(self, Status::Rejected)
    }

    /// Legal forward transitions of the HR workflow
    pub fn can_transition_to(&self, next: Status) -> bool {
        use Status::*;
        match (self, next) {
            (Pending, Shortlisted | ForInterview | Rejected) => true,
            (Shortlisted, ForInterview | Rejected) => true,
            (ForInterview, Interviewed | Rejected) => true,
            (Interviewed, Approved | Rejected) => true,
            (Approved, Deployed | Rejected) => true,
            (Deployed, Completed) => true,
            _ => false,
        }
    }
}

/// Application submission request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationRequest {
    #[validate(length(min = 1, max = 200))]
    pub course: String,
    #[validate(range(min = 1, max = 6))]
    pub year_level: i64,
    pub grade_file: Option<String>,
    pub signature_file: Option<String>,
}

/// Re-application submission request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReApplicationRequest {
    pub previous_application_id: String,
    #[validate(length(min = 1, max = 200))]
    pub course: String,
    #[validate(range(min = 1, max = 6))]
    pub year_level: i64,
    pub grade_file: Option<String>,
    pub signature_file: Option<String>,
}

/// Status change request (HR)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    pub status: Status,
    pub remarks: Option<String>,
}

/// Interview scheduling request (HR)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInterviewRequest {
    pub interview_at: chrono::DateTime<chrono::Utc>,
}

/// Deployment request (HR)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub office_id: String,
}

/// DTR time-in / time-out request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DtrPunchRequest {
    pub application_id: String,
    /// Defaults to today when absent
    pub entry_date: Option<NaiveDate>,
}

/// DTR remarks request (office)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DtrRemarksRequest {
    pub remarks: String,
}

/// Leave filing request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FileLeaveRequest {
    pub application_id: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

/// Leave decision request (office/HR)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveDecisionRequest {
    pub approve: bool,
}
