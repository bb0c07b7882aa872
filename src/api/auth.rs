/// Account and session endpoints
use crate::{
    account::{
        AccountInfo, ChangePasswordRequest, EmailChangeRequest, SessionResponse, SigninRequest,
        SignupRequest, TokenRequest,
    },
    api::middleware,
    auth::{AuthContext, OptionalAuthContext},
    config::ServerConfig,
    context::AppContext,
    db::models::Role,
    error::{AppError, AppResult},
    metrics,
};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use validator::Validate;

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/signout", post(signout))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(me))
        .route("/auth/change-password", post(change_password))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/request-email-change", post(request_email_change))
        .route("/auth/confirm-email-change", post(confirm_email_change))
}

fn user_agent(headers: &HeaderMap) -> Option<&str> {
    headers.get("user-agent").and_then(|v| v.to_str().ok())
}

/// Resolve the role a signup is allowed to create. Self-service signups
/// are student-only; hr and office accounts need an authenticated HR
/// caller or the bootstrap flag.
fn resolve_signup_role(
    config: &ServerConfig,
    caller: Option<&AuthContext>,
    requested: Option<Role>,
) -> AppResult<Role> {
    let role = requested.unwrap_or(Role::Student);
    if role == Role::Student {
        return Ok(role);
    }

    let caller_is_hr = matches!(caller, Some(auth) if auth.session.role == Role::Hr);
    if caller_is_hr || config.authentication.allow_privileged_signup {
        Ok(role)
    } else {
        Err(AppError::Authorization(
            "Only HR can create hr or office accounts".to_string(),
        ))
    }
}

/// Signup endpoint. Creates the account, sends a verification email when
/// the mailer is configured, and opens an initial session.
async fn signup(
    State(ctx): State<AppContext>,
    caller: OptionalAuthContext,
    jar: CookieJar,
    headers: HeaderMap,
    Json(req): Json<SignupRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    req.validate()?;

    let role = resolve_signup_role(&ctx.config, caller.auth.as_ref(), req.role)?;

    let account = ctx
        .account_manager
        .signup(&req.email, &req.password, &req.full_name, role)
        .await?;

    metrics::record_account_creation(role.as_str());

    if ctx.mailer.is_configured() {
        match ctx
            .account_manager
            .generate_email_verification_token(&account.id)
            .await
        {
            Ok(token) => {
                let base_url = ctx.config.service.app_origin.clone();
                if let Err(e) = ctx
                    .mailer
                    .send_verification_email(&account.email, &account.full_name, &token, &base_url)
                    .await
                {
                    // Signup still succeeds when the mail bounces
                    tracing::warn!("Failed to send verification email: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!("Failed to generate verification token: {}", e);
            }
        }
    }

    let tokens = ctx
        .account_manager
        .create_session(&account, None, user_agent(&headers))
        .await?;

    let jar = jar
        .add(middleware::access_cookie(&ctx.config, &tokens.access_token))
        .add(middleware::refresh_cookie(&ctx.config, &tokens.refresh_token));

    Ok((
        jar,
        Json(SessionResponse {
            account_id: account.id,
            email: account.email,
            full_name: account.full_name,
            role,
            profile_id: None,
        }),
    ))
}

/// Signin endpoint
async fn signin(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(req): Json<SigninRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let (account, tokens) = ctx
        .account_manager
        .signin(&req.email, &req.password, user_agent(&headers))
        .await?;

    let role = crate::db::models::Role::parse(&account.role)?;

    let jar = jar
        .add(middleware::access_cookie(&ctx.config, &tokens.access_token))
        .add(middleware::refresh_cookie(&ctx.config, &tokens.refresh_token));

    Ok((
        jar,
        Json(SessionResponse {
            account_id: account.id,
            email: account.email,
            full_name: account.full_name,
            role,
            profile_id: None,
        }),
    ))
}

/// Signout endpoint. Deletes the session row and clears the cookie pair.
async fn signout(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<serde_json::Value>)> {
    ctx.account_manager
        .delete_session(&auth.session.session_id)
        .await?;

    let (access, refresh) = middleware::clear_auth_cookies(&ctx.config);
    let jar = jar.add(access).add(refresh);

    Ok((jar, Json(serde_json::json!({}))))
}

/// Refresh endpoint. Accepts the refresh token from the cookie or the
/// request body and reissues the access token.
async fn refresh(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    headers: HeaderMap,
    body: Option<Json<TokenRequest>>,
) -> AppResult<(CookieJar, Json<serde_json::Value>)> {
    let refresh_token = middleware::extract_cookie(&headers, middleware::REFRESH_COOKIE)
        .or_else(|| body.map(|Json(req)| req.token))
        .ok_or_else(|| AppError::Authentication("Missing refresh token".to_string()))?;

    let tokens = ctx.account_manager.refresh_session(&refresh_token).await?;

    let jar = jar
        .add(middleware::access_cookie(&ctx.config, &tokens.access_token))
        .add(middleware::refresh_cookie(&ctx.config, &tokens.refresh_token));

    Ok((
        jar,
        Json(serde_json::json!({ "expiresAt": tokens.expires_at })),
    ))
}

/// Current account endpoint
async fn me(State(ctx): State<AppContext>, auth: AuthContext) -> AppResult<Json<AccountInfo>> {
    let account = ctx.account_manager.get_account(&auth.account_id).await?;

    Ok(Json(AccountInfo {
        account_id: account.id,
        email: account.email,
        full_name: account.full_name,
        role: auth.session.role,
        email_verified: account.email_verified,
        pending_email: account.pending_email,
        profile_id: auth.session.profile_id,
    }))
}

/// Change password endpoint. Every session is invalidated, including the
/// caller's, so the cookies are cleared too.
async fn change_password(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    jar: CookieJar,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<(CookieJar, Json<serde_json::Value>)> {
    req.validate()?;

    ctx.account_manager
        .change_password(&auth.account_id, &req.current_password, &req.new_password)
        .await?;

    let (access, refresh) = middleware::clear_auth_cookies(&ctx.config);
    let jar = jar.add(access).add(refresh);

    Ok((jar, Json(serde_json::json!({}))))
}

/// Verify email endpoint
async fn verify_email(
    State(ctx): State<AppContext>,
    Json(req): Json<TokenRequest>,
) -> AppResult<Json<serde_json::Value>> {
    ctx.account_manager.verify_email(&req.token).await?;

    Ok(Json(serde_json::json!({})))
}

/// Request email change endpoint. Stages the new address and mails a
/// confirmation token to it.
async fn request_email_change(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<EmailChangeRequest>,
) -> AppResult<Json<serde_json::Value>> {
    req.validate()?;

    let token = ctx
        .account_manager
        .request_email_change(&auth.account_id, &req.new_email)
        .await?;

    if ctx.mailer.is_configured() {
        let account = ctx.account_manager.get_account(&auth.account_id).await?;
        let base_url = ctx.config.service.app_origin.clone();
        ctx.mailer
            .send_email_change_confirmation(&req.new_email, &account.full_name, &token, &base_url)
            .await?;
    } else {
        tracing::warn!("Email not configured, change token generated but not sent");
    }

    Ok(Json(serde_json::json!({})))
}

/// Confirm email change endpoint
async fn confirm_email_change(
    State(ctx): State<AppContext>,
    Json(req): Json<TokenRequest>,
) -> AppResult<Json<serde_json::Value>> {
    ctx.account_manager.confirm_email_change(&req.token).await?;

    Ok(Json(serde_json::json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::ValidatedSession;
    use crate::config::test_config;

    fn caller(role: Role) -> AuthContext {
        AuthContext {
            account_id: "acct-1".to_string(),
            session: ValidatedSession {
                account_id: "acct-1".to_string(),
                session_id: "sess-1".to_string(),
                role,
                profile_id: None,
            },
        }
    }

    #[test]
    fn test_signup_role_defaults_to_student() {
        let config = test_config();

        assert_eq!(
            resolve_signup_role(&config, None, None).unwrap(),
            Role::Student
        );
        assert_eq!(
            resolve_signup_role(&config, None, Some(Role::Student)).unwrap(),
            Role::Student
        );
    }

    #[test]
    fn test_anonymous_privileged_signup_rejected() {
        let config = test_config();

        for role in [Role::Hr, Role::Office] {
            let result = resolve_signup_role(&config, None, Some(role));
            assert!(matches!(result, Err(AppError::Authorization(_))));
        }

        // A student caller cannot escalate either
        let result = resolve_signup_role(&config, Some(&caller(Role::Student)), Some(Role::Hr));
        assert!(matches!(result, Err(AppError::Authorization(_))));
    }

    #[test]
    fn test_hr_caller_creates_privileged_accounts() {
        let config = test_config();

        assert_eq!(
            resolve_signup_role(&config, Some(&caller(Role::Hr)), Some(Role::Office)).unwrap(),
            Role::Office
        );
    }

    #[test]
    fn test_bootstrap_flag_allows_privileged_signup() {
        let mut config = test_config();
        config.authentication.allow_privileged_signup = true;

        assert_eq!(
            resolve_signup_role(&config, None, Some(Role::Hr)).unwrap(),
            Role::Hr
        );
    }
}
