/// Office sub-profile management
///
/// An office account holds up to five PIN-protected sub-profiles, each
/// with its own permission bitset. Selecting one mints a new session
/// scoped to that profile.

mod profiles;

pub use profiles::{ProfileManager, MAX_PROFILES_PER_ACCOUNT};

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Permission bits for office profiles
pub mod permissions {
    pub const MANAGE_TRAINEES: i64 = 1 << 0;
    pub const REVIEW_DTR: i64 = 1 << 1;
    pub const APPROVE_LEAVE: i64 = 1 << 2;
    pub const EVALUATE: i64 = 1 << 3;
    pub const MANAGE_PROFILES: i64 = 1 << 4;

    pub const ALL: i64 = MANAGE_TRAINEES | REVIEW_DTR | APPROVE_LEAVE | EVALUATE | MANAGE_PROFILES;

    /// True when `granted` carries every bit of `required`
    pub fn has(granted: i64, required: i64) -> bool {
        granted & required == required
    }
}

/// Create profile request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub pin: String,
    pub permissions: Option<i64>,
}

/// Update profile request; absent fields are left unchanged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub pin: Option<String>,
    pub permissions: Option<i64>,
}

/// Select profile request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectProfileRequest {
    pub pin: String,
}

/// Profile view returned by the API (no PIN hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub name: String,
    pub permissions: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<crate::db::models::OfficeProfile> for ProfileView {
    fn from(p: crate::db::models::OfficeProfile) -> Self {
        Self {
            id: p.id,
            name: p.name,
            permissions: p.permissions,
            created_at: p.created_at,
        }
    }
}
