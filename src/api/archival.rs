/// Archival endpoints (HR only)
use crate::{
    archival::ArchivalReport,
    audit::Actor,
    auth::HrAuthContext,
    context::AppContext,
    db::models::{ArchivedApplication, ArchivedLeaveRequest, ArchivedReApplication},
    error::AppResult,
    jobs::tasks,
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

/// Build archival routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/archival/run", post(run))
        .route("/archival/applications", get(list_applications))
        .route("/archival/re-applications", get(list_reapplications))
        .route("/archival/leaves", get(list_leaves))
}

/// Trigger an archival sweep on demand
async fn run(
    State(ctx): State<AppContext>,
    auth: HrAuthContext,
) -> AppResult<Json<ArchivalReport>> {
    let report = tasks::run_archival(&ctx).await?;

    ctx.audit_log
        .record(
            &Actor {
                account_id: auth.account_id.clone(),
                profile_id: None,
            },
            "run_archival",
            "archival",
            None,
            Some(&serde_json::json!({
                "applicationsArchived": report.applications_archived,
                "reApplicationsArchived": report.re_applications_archived,
                "leavesArchived": report.leaves_archived,
                "purged": report.purged,
                "failed": report.failed,
            })),
        )
        .await;

    Ok(Json(report))
}

/// List archived applications
async fn list_applications(
    State(ctx): State<AppContext>,
    _auth: HrAuthContext,
) -> AppResult<Json<Vec<ArchivedApplication>>> {
    Ok(Json(ctx.archival_manager.list_archived_applications().await?))
}

/// List archived re-applications
async fn list_reapplications(
    State(ctx): State<AppContext>,
    _auth: HrAuthContext,
) -> AppResult<Json<Vec<ArchivedReApplication>>> {
    Ok(Json(
        ctx.archival_manager.list_archived_reapplications().await?,
    ))
}

/// List archived leave requests
async fn list_leaves(
    State(ctx): State<AppContext>,
    _auth: HrAuthContext,
) -> AppResult<Json<Vec<ArchivedLeaveRequest>>> {
    Ok(Json(ctx.archival_manager.list_archived_leaves().await?))
}
