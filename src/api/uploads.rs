/// Requirement upload endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::{AppError, AppResult},
    metrics,
    uploads::UploadKind,
};
use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

/// Build upload routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/uploads/:kind", post(upload))
        .route("/uploads/:kind/:name", get(download))
}

/// Upload a requirement file. The multipart body carries a single
/// `file` field; the stored name is returned for use on submissions.
async fn upload(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(kind): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<serde_json::Value>> {
    let kind = UploadKind::parse(&kind)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .ok_or_else(|| AppError::Upload("Missing file name".to_string()))?
            .to_string();

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Upload(format!("Failed to read upload: {}", e)))?;

        let stored = ctx.upload_store.save(kind, &original_name, &data).await?;

        metrics::record_upload(kind.as_str());

        return Ok(Json(serde_json::json!({ "fileName": stored })));
    }

    Err(AppError::Upload("Missing file field".to_string()))
}

/// Download a stored file
async fn download(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path((kind, name)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let kind = UploadKind::parse(&kind)?;

    let data = ctx.upload_store.read(kind, &name).await?;

    let content_type = match name.rsplit('.').next() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    };

    Ok(([(header::CONTENT_TYPE, content_type)], data))
}
