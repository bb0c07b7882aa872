/// Authentication extractors and utilities
use crate::{
    account::ValidatedSession,
    api::middleware::extract_access_token,
    context::AppContext,
    db::models::Role,
    error::AppError,
    office::permissions,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context - extracts and validates session from request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: String,
    pub session: ValidatedSession,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing access token".to_string()))?;

        let session = state.account_manager.validate_access_token(&token).await?;

        let account_id = session.account_id.clone();

        Ok(AuthContext {
            account_id,
            session,
        })
    }
}

/// Optional authenticated context - does not fail if no auth provided
#[derive(Debug, Clone)]
pub struct OptionalAuthContext {
    pub auth: Option<AuthContext>,
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(&parts.headers);

        let auth = if let Some(token) = token {
            match state.account_manager.validate_access_token(&token).await {
                Ok(session) => {
                    let account_id = session.account_id.clone();
                    Some(AuthContext {
                        account_id,
                        session,
                    })
                }
                Err(_) => None,
            }
        } else {
            None
        };

        Ok(OptionalAuthContext { auth })
    }
}

/// Staff authentication context - HR accounts, or office accounts acting
/// through a selected sub-profile.
///
/// HR passes every permission check. Office sessions carry the selected
/// profile's permission bitset and are rejected outright when no profile
/// has been selected yet.
#[derive(Debug, Clone)]
pub struct StaffAuthContext {
    pub account_id: String,
    pub session: ValidatedSession,
    pub role: Role,
    pub permissions: i64,
}

impl StaffAuthContext {
    /// Check a permission bit. HR holds every permission implicitly.
    pub fn can(&self, permission: i64) -> bool {
        match self.role {
            Role::Hr => true,
            Role::Office => permissions::has(self.permissions, permission),
            Role::Student => false,
        }
    }

    pub fn profile_id(&self) -> Option<&str> {
        self.session.profile_id.as_deref()
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for StaffAuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing access token".to_string()))?;

        let session = state.account_manager.validate_access_token(&token).await?;
        let account_id = session.account_id.clone();

        match session.role {
            Role::Hr => Ok(StaffAuthContext {
                account_id,
                session,
                role: Role::Hr,
                permissions: 0,
            }),
            Role::Office => {
                let profile_id = session.profile_id.clone().ok_or_else(|| {
                    AppError::Authorization("No office profile selected".to_string())
                })?;

                let perms = state.profile_manager.get_permissions(&profile_id).await?;

                Ok(StaffAuthContext {
                    account_id,
                    session,
                    role: Role::Office,
                    permissions: perms,
                })
            }
            Role::Student => Err(AppError::Authorization(
                "Staff role required".to_string(),
            )),
        }
    }
}

/// HR authentication context - requires the HR role
#[derive(Debug, Clone)]
pub struct HrAuthContext {
    pub account_id: String,
    pub session: ValidatedSession,
}

#[async_trait]
impl FromRequestParts<AppContext> for HrAuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing access token".to_string()))?;

        let session = state.account_manager.validate_access_token(&token).await?;

        if session.role != Role::Hr {
            tracing::warn!(
                "HrAuthContext: account {} is not HR",
                session.account_id
            );
            return Err(AppError::Authorization("HR role required".to_string()));
        }

        let account_id = session.account_id.clone();

        Ok(HrAuthContext {
            account_id,
            session,
        })
    }
}

/// Macro to require a specific office permission on a staff context
/// Usage: require_permission!(auth, permissions::APPROVE_LEAVE);
#[macro_export]
macro_rules! require_permission {
    ($auth:expr, $required:expr) => {
        if !$auth.can($required) {
            return Err($crate::error::AppError::Authorization(
                "Insufficient profile permissions".to_string(),
            ));
        }
    };
}
