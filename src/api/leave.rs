/// Leave request endpoints
use crate::{
    audit::Actor,
    auth::{AuthContext, StaffAuthContext},
    context::AppContext,
    db::models::{LeaveRequest, Role},
    error::{AppError, AppResult},
    office::permissions,
    require_permission,
    scholarship::{FileLeaveRequest, LeaveDecisionRequest},
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

/// Build leave routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/leaves", post(file_leave))
        .route("/leaves/pending", get(list_pending))
        .route("/leaves/application/:id", get(list_for_application))
        .route("/leaves/:id/decide", post(decide))
}

/// File a leave request (student, own application)
async fn file_leave(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<FileLeaveRequest>,
) -> AppResult<Json<LeaveRequest>> {
    req.validate()?;

    let application = ctx.application_manager.get(&req.application_id).await?;
    if application.account_id != auth.account_id {
        return Err(AppError::Authorization(
            "Application belongs to another account".to_string(),
        ));
    }

    let leave = ctx
        .leave_manager
        .file(&req.application_id, req.date_from, req.date_to, &req.reason)
        .await?;

    Ok(Json(leave))
}

/// List pending leave requests (staff with APPROVE_LEAVE)
async fn list_pending(
    State(ctx): State<AppContext>,
    auth: StaffAuthContext,
) -> AppResult<Json<Vec<LeaveRequest>>> {
    require_permission!(auth, permissions::APPROVE_LEAVE);

    let leaves = ctx.leave_manager.list_pending().await?;

    Ok(Json(leaves))
}

/// List leave requests for an application. Owners see their own; staff
/// with APPROVE_LEAVE see all.
async fn list_for_application(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<LeaveRequest>>> {
    if auth.session.role == Role::Student {
        let application = ctx.application_manager.get(&id).await?;
        if application.account_id != auth.account_id {
            return Err(AppError::Authorization(
                "Application belongs to another account".to_string(),
            ));
        }
    } else if auth.session.role == Role::Office {
        let profile_id = auth.session.profile_id.as_deref().ok_or_else(|| {
            AppError::Authorization("No office profile selected".to_string())
        })?;
        let perms = ctx.profile_manager.get_permissions(profile_id).await?;
        if !permissions::has(perms, permissions::APPROVE_LEAVE) {
            return Err(AppError::Authorization(
                "Insufficient profile permissions".to_string(),
            ));
        }
    }

    let leaves = ctx.leave_manager.list_for_application(&id).await?;

    Ok(Json(leaves))
}

/// Identity a decision is attributed to: the selected office sub-profile
/// when one is active, the account otherwise (HR).
fn decider(auth: &StaffAuthContext) -> &str {
    auth.profile_id().unwrap_or(&auth.account_id)
}

/// Approve or disapprove a pending leave request (staff with APPROVE_LEAVE)
async fn decide(
    State(ctx): State<AppContext>,
    auth: StaffAuthContext,
    Path(id): Path<String>,
    Json(req): Json<LeaveDecisionRequest>,
) -> AppResult<Json<LeaveRequest>> {
    require_permission!(auth, permissions::APPROVE_LEAVE);

    let leave = ctx
        .leave_manager
        .decide(&id, req.approve, decider(&auth))
        .await?;

    ctx.audit_log
        .record(
            &Actor {
                account_id: auth.account_id.clone(),
                profile_id: auth.session.profile_id.clone(),
            },
            "decide_leave",
            "leave",
            Some(&serde_json::json!({ "status": "pending" })),
            Some(&serde_json::json!({ "leaveId": id, "status": leave.status })),
        )
        .await;

    Ok(Json(leave))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::ValidatedSession;

    fn staff(role: Role, profile: Option<&str>) -> StaffAuthContext {
        StaffAuthContext {
            account_id: "acct-1".to_string(),
            session: ValidatedSession {
                account_id: "acct-1".to_string(),
                session_id: "sess-1".to_string(),
                role,
                profile_id: profile.map(str::to_string),
            },
            role,
            permissions: permissions::APPROVE_LEAVE,
        }
    }

    #[test]
    fn test_office_decisions_attributed_to_profile() {
        let office = staff(Role::Office, Some("profile-7"));
        assert_eq!(decider(&office), "profile-7");
    }

    #[test]
    fn test_hr_decisions_attributed_to_account() {
        let hr = staff(Role::Hr, None);
        assert_eq!(decider(&hr), "acct-1");
    }
}
