/// Application and re-application endpoints
use crate::{
    audit::Actor,
    auth::{AuthContext, HrAuthContext, StaffAuthContext},
    context::AppContext,
    db::models::{Application, ReApplication, Role},
    error::{AppError, AppResult},
    metrics,
    office::permissions,
    require_permission,
    scholarship::{
        DeployRequest, ScheduleInterviewRequest, Status, StatusChangeRequest,
        SubmitApplicationRequest, SubmitReApplicationRequest,
    },
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

/// Build application routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/applications", get(list_applications).post(submit_application))
        .route("/applications/me", get(my_applications))
        .route("/applications/:id", get(get_application))
        .route("/applications/:id/status", post(change_status))
        .route("/applications/:id/interview", post(schedule_interview))
        .route("/applications/:id/deploy", post(deploy))
        .route("/applications/:id/withdraw", post(withdraw))
        .route(
            "/re-applications",
            get(list_reapplications).post(submit_reapplication),
        )
        .route("/re-applications/:id/status", post(change_reapplication_status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    status: Option<String>,
    office_id: Option<String>,
}

fn hr_actor(auth: &HrAuthContext) -> Actor {
    Actor {
        account_id: auth.account_id.clone(),
        profile_id: None,
    }
}

/// Submit an application (student)
async fn submit_application(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<SubmitApplicationRequest>,
) -> AppResult<Json<Application>> {
    if auth.session.role != Role::Student {
        return Err(AppError::Authorization("Student role required".to_string()));
    }
    req.validate()?;

    let application = ctx
        .application_manager
        .submit(
            &auth.account_id,
            &req.course,
            req.year_level,
            req.grade_file.as_deref(),
            req.signature_file.as_deref(),
        )
        .await?;

    Ok(Json(application))
}

/// List applications with optional status and office filters (staff)
async fn list_applications(
    State(ctx): State<AppContext>,
    auth: StaffAuthContext,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Application>>> {
    require_permission!(auth, permissions::MANAGE_TRAINEES);

    let status = query.status.as_deref().map(Status::parse).transpose()?;

    let applications = ctx
        .application_manager
        .list(status, query.office_id.as_deref())
        .await?;

    Ok(Json(applications))
}

/// List the caller's own applications
async fn my_applications(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<Vec<Application>>> {
    let applications = ctx
        .application_manager
        .list_for_account(&auth.account_id)
        .await?;

    Ok(Json(applications))
}

/// Fetch one application. Owners see their own; staff see all.
async fn get_application(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<Application>> {
    let application = ctx.application_manager.get(&id).await?;

    if auth.session.role == Role::Student && application.account_id != auth.account_id {
        return Err(AppError::NotFound("Application not found".to_string()));
    }

    Ok(Json(application))
}

/// Advance the status of an application (HR)
async fn change_status(
    State(ctx): State<AppContext>,
    auth: HrAuthContext,
    Path(id): Path<String>,
    Json(req): Json<StatusChangeRequest>,
) -> AppResult<Json<Application>> {
    let before = ctx.application_manager.get(&id).await?;

    let application = ctx
        .application_manager
        .advance_status(&id, req.status, req.remarks.as_deref())
        .await?;

    metrics::record_status_transition(req.status.as_str());

    ctx.audit_log
        .record(
            &hr_actor(&auth),
            "change_status",
            "application",
            Some(&serde_json::json!({ "status": before.status })),
            Some(&serde_json::json!({ "status": application.status })),
        )
        .await;

    Ok(Json(application))
}

/// Schedule an interview (HR)
async fn schedule_interview(
    State(ctx): State<AppContext>,
    auth: HrAuthContext,
    Path(id): Path<String>,
    Json(req): Json<ScheduleInterviewRequest>,
) -> AppResult<Json<Application>> {
    let application = ctx
        .application_manager
        .schedule_interview(&id, req.interview_at)
        .await?;

    metrics::record_status_transition(Status::ForInterview.as_str());

    ctx.audit_log
        .record(
            &hr_actor(&auth),
            "schedule_interview",
            "application",
            None,
            Some(&serde_json::json!({ "interviewAt": req.interview_at })),
        )
        .await;

    Ok(Json(application))
}

/// Deploy an approved application to an office (HR)
async fn deploy(
    State(ctx): State<AppContext>,
    auth: HrAuthContext,
    Path(id): Path<String>,
    Json(req): Json<DeployRequest>,
) -> AppResult<Json<Application>> {
    let application = ctx.application_manager.deploy(&id, &req.office_id).await?;

    metrics::record_status_transition(Status::Deployed.as_str());

    ctx.audit_log
        .record(
            &hr_actor(&auth),
            "deploy",
            "application",
            None,
            Some(&serde_json::json!({ "officeId": req.office_id })),
        )
        .await;

    Ok(Json(application))
}

/// Withdraw an application (owner)
async fn withdraw(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<Application>> {
    let application = ctx
        .application_manager
        .withdraw(&id, &auth.account_id)
        .await?;

    metrics::record_status_transition(Status::Withdrawn.as_str());

    Ok(Json(application))
}

/// Submit a re-application (student)
async fn submit_reapplication(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<SubmitReApplicationRequest>,
) -> AppResult<Json<ReApplication>> {
    if auth.session.role != Role::Student {
        return Err(AppError::Authorization("Student role required".to_string()));
    }
    req.validate()?;

    let re_application = ctx
        .application_manager
        .submit_reapplication(
            &auth.account_id,
            &req.previous_application_id,
            &req.course,
            req.year_level,
            req.grade_file.as_deref(),
            req.signature_file.as_deref(),
        )
        .await?;

    Ok(Json(re_application))
}

/// List re-applications (staff)
async fn list_reapplications(
    State(ctx): State<AppContext>,
    auth: StaffAuthContext,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<ReApplication>>> {
    require_permission!(auth, permissions::MANAGE_TRAINEES);

    let status = query.status.as_deref().map(Status::parse).transpose()?;

    let re_applications = ctx.application_manager.list_reapplications(status).await?;

    Ok(Json(re_applications))
}

/// Advance the status of a re-application (HR)
async fn change_reapplication_status(
    State(ctx): State<AppContext>,
    auth: HrAuthContext,
    Path(id): Path<String>,
    Json(req): Json<StatusChangeRequest>,
) -> AppResult<Json<ReApplication>> {
    let re_application = ctx
        .application_manager
        .advance_reapplication_status(&id, req.status, req.remarks.as_deref())
        .await?;

    metrics::record_status_transition(req.status.as_str());

    ctx.audit_log
        .record(
            &hr_actor(&auth),
            "change_status",
            "re_application",
            None,
            Some(&serde_json::json!({ "status": re_application.status })),
        )
        .await;

    Ok(Json(re_application))
}
