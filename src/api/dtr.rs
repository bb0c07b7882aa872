/// Daily time record endpoints
use crate::{
    audit::Actor,
    auth::{AuthContext, StaffAuthContext},
    context::AppContext,
    db::models::{DtrEntry, Role},
    error::{AppError, AppResult},
    office::permissions,
    require_permission,
    scholarship::{DtrPunchRequest, DtrRemarksRequest},
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

/// Build DTR routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/dtr/time-in", post(time_in))
        .route("/dtr/time-out", post(time_out))
        .route("/dtr/application/:id", get(list_entries))
        .route("/dtr/entry/:id/remarks", post(add_remarks))
}

/// A student may only punch against their own deployed application
async fn require_owner(
    ctx: &AppContext,
    auth: &AuthContext,
    application_id: &str,
) -> AppResult<()> {
    let application = ctx.application_manager.get(application_id).await?;

    if application.account_id != auth.account_id {
        return Err(AppError::Authorization(
            "Application belongs to another account".to_string(),
        ));
    }

    Ok(())
}

/// Time-in endpoint (student)
async fn time_in(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<DtrPunchRequest>,
) -> AppResult<Json<DtrEntry>> {
    require_owner(&ctx, &auth, &req.application_id).await?;

    let entry_date = req.entry_date.unwrap_or_else(|| Utc::now().date_naive());
    let entry = ctx.dtr_manager.time_in(&req.application_id, entry_date).await?;

    Ok(Json(entry))
}

/// Time-out endpoint (student)
async fn time_out(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<DtrPunchRequest>,
) -> AppResult<Json<DtrEntry>> {
    require_owner(&ctx, &auth, &req.application_id).await?;

    let entry_date = req.entry_date.unwrap_or_else(|| Utc::now().date_naive());
    let entry = ctx.dtr_manager.time_out(&req.application_id, entry_date).await?;

    Ok(Json(entry))
}

/// List entries for an application. Owners see their own; staff with
/// the REVIEW_DTR permission see all.
async fn list_entries(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<DtrEntry>>> {
    if auth.session.role == Role::Student {
        require_owner(&ctx, &auth, &id).await?;
    } else if auth.session.role == Role::Office {
        let profile_id = auth.session.profile_id.as_deref().ok_or_else(|| {
            AppError::Authorization("No office profile selected".to_string())
        })?;
        let perms = ctx.profile_manager.get_permissions(profile_id).await?;
        if !permissions::has(perms, permissions::REVIEW_DTR) {
            return Err(AppError::Authorization(
                "Insufficient profile permissions".to_string(),
            ));
        }
    }

    let entries = ctx.dtr_manager.list_for_application(&id).await?;

    Ok(Json(entries))
}

/// Add remarks to an entry (staff with REVIEW_DTR)
async fn add_remarks(
    State(ctx): State<AppContext>,
    auth: StaffAuthContext,
    Path(id): Path<String>,
    Json(req): Json<DtrRemarksRequest>,
) -> AppResult<Json<DtrEntry>> {
    require_permission!(auth, permissions::REVIEW_DTR);

    let entry = ctx.dtr_manager.add_remarks(&id, &req.remarks).await?;

    ctx.audit_log
        .record(
            &Actor {
                account_id: auth.account_id.clone(),
                profile_id: auth.session.profile_id.clone(),
            },
            "add_remarks",
            "dtr",
            None,
            Some(&serde_json::json!({ "entryId": id, "remarks": req.remarks })),
        )
        .await;

    Ok(Json(entry))
}
