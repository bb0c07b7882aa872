/// Audit log endpoints (HR only)
use crate::{auth::HrAuthContext, context::AppContext, db::models::AuditLog, error::AppResult};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build audit routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/audit-logs", get(list))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    cursor: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    entries: Vec<AuditLog>,
    cursor: Option<i64>,
}

/// List audit entries newest first, cursored by id
async fn list(
    State(ctx): State<AppContext>,
    _auth: HrAuthContext,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListResponse>> {
    let entries = ctx
        .audit_log
        .list(query.cursor, query.limit.unwrap_or(50))
        .await?;

    let cursor = entries.last().map(|e| e.id);

    Ok(Json(ListResponse { entries, cursor }))
}
