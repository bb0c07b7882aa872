/// Office sub-profile endpoints
use crate::{
    api::middleware,
    audit::Actor,
    auth::AuthContext,
    context::AppContext,
    db::models::Role,
    error::{AppError, AppResult},
    office::{
        permissions, CreateProfileRequest, ProfileView, SelectProfileRequest,
        UpdateProfileRequest,
    },
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use validator::Validate;

/// Build profile routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/office/profiles", get(list_profiles).post(create_profile))
        .route(
            "/office/profiles/:id",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .route("/office/profiles/:id/select", post(select_profile))
        .route("/office/profiles/deselect", post(deselect_profile))
}

/// Require an office-role session. Mutations on a profile-scoped session
/// additionally need the MANAGE_PROFILES permission.
async fn require_office(ctx: &AppContext, auth: &AuthContext, mutating: bool) -> AppResult<()> {
    if auth.session.role != Role::Office {
        return Err(AppError::Authorization("Office role required".to_string()));
    }

    if mutating {
        if let Some(profile_id) = &auth.session.profile_id {
            let perms = ctx.profile_manager.get_permissions(profile_id).await?;
            if !permissions::has(perms, permissions::MANAGE_PROFILES) {
                return Err(AppError::Authorization(
                    "Insufficient profile permissions".to_string(),
                ));
            }
        }
        // An account-level session (no profile selected) may manage profiles
    }

    Ok(())
}

fn actor(auth: &AuthContext) -> Actor {
    Actor {
        account_id: auth.account_id.clone(),
        profile_id: auth.session.profile_id.clone(),
    }
}

/// List profiles for the authenticated office account
async fn list_profiles(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<Vec<ProfileView>>> {
    require_office(&ctx, &auth, false).await?;

    let profiles = ctx.profile_manager.list_profiles(&auth.account_id).await?;

    Ok(Json(profiles.into_iter().map(ProfileView::from).collect()))
}

/// Create a profile
async fn create_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<CreateProfileRequest>,
) -> AppResult<Json<ProfileView>> {
    require_office(&ctx, &auth, true).await?;
    req.validate()?;

    let profile = ctx
        .profile_manager
        .create_profile(
            &auth.account_id,
            &req.name,
            &req.pin,
            req.permissions.unwrap_or(0),
        )
        .await?;

    ctx.audit_log
        .record(
            &actor(&auth),
            "create_profile",
            "office",
            None,
            Some(&serde_json::json!({ "profileId": profile.id, "name": profile.name })),
        )
        .await;

    Ok(Json(ProfileView::from(profile)))
}

/// Get one profile
async fn get_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<ProfileView>> {
    require_office(&ctx, &auth, false).await?;

    let profile = ctx.profile_manager.get_profile(&auth.account_id, &id).await?;

    Ok(Json(ProfileView::from(profile)))
}

/// Update a profile
async fn update_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileView>> {
    require_office(&ctx, &auth, true).await?;

    let before = ctx.profile_manager.get_profile(&auth.account_id, &id).await?;

    let profile = ctx
        .profile_manager
        .update_profile(
            &auth.account_id,
            &id,
            req.name.as_deref(),
            req.pin.as_deref(),
            req.permissions,
        )
        .await?;

    ctx.audit_log
        .record(
            &actor(&auth),
            "update_profile",
            "office",
            Some(&serde_json::json!({ "name": before.name, "permissions": before.permissions })),
            Some(&serde_json::json!({ "name": profile.name, "permissions": profile.permissions })),
        )
        .await;

    Ok(Json(ProfileView::from(profile)))
}

/// Delete a profile. Sessions scoped to it are dropped.
async fn delete_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_office(&ctx, &auth, true).await?;

    ctx.profile_manager
        .delete_profile(&auth.account_id, &id)
        .await?;

    ctx.audit_log
        .record(
            &actor(&auth),
            "delete_profile",
            "office",
            Some(&serde_json::json!({ "profileId": id })),
            None,
        )
        .await;

    Ok(Json(serde_json::json!({})))
}

/// Select a profile by PIN. Mints a fresh session scoped to the profile
/// and rotates the auth cookies.
async fn select_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<SelectProfileRequest>,
) -> AppResult<(CookieJar, Json<ProfileView>)> {
    require_office(&ctx, &auth, false).await?;

    let profile = ctx
        .profile_manager
        .verify_pin(&auth.account_id, &id, &req.pin)
        .await?;

    let account = ctx.account_manager.get_account(&auth.account_id).await?;

    // The old account-level session stays valid; the client switches to
    // the profile-scoped one via the rotated cookies.
    let tokens = ctx
        .account_manager
        .create_session(
            &account,
            Some(&profile.id),
            headers.get("user-agent").and_then(|v| v.to_str().ok()),
        )
        .await?;

    let jar = jar
        .add(middleware::access_cookie(&ctx.config, &tokens.access_token))
        .add(middleware::refresh_cookie(&ctx.config, &tokens.refresh_token));

    Ok((jar, Json(ProfileView::from(profile))))
}

/// Drop back to an account-level session. No-op when no profile is
/// selected.
async fn deselect_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    jar: CookieJar,
    headers: HeaderMap,
) -> AppResult<(CookieJar, Json<serde_json::Value>)> {
    require_office(&ctx, &auth, false).await?;

    if auth.session.profile_id.is_none() {
        return Ok((jar, Json(serde_json::json!({}))));
    }

    let account = ctx.account_manager.get_account(&auth.account_id).await?;
    let tokens = ctx
        .account_manager
        .create_session(
            &account,
            None,
            headers.get("user-agent").and_then(|v| v.to_str().ok()),
        )
        .await?;

    ctx.account_manager
        .delete_session(&auth.session.session_id)
        .await?;

    let jar = jar
        .add(middleware::access_cookie(&ctx.config, &tokens.access_token))
        .add(middleware::refresh_cookie(&ctx.config, &tokens.refresh_token));

    Ok((jar, Json(serde_json::json!({}))))
}
