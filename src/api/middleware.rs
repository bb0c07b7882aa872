/// Authentication middleware and cookie helpers
use crate::config::ServerConfig;
use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use axum_extra::extract::cookie::{Cookie, SameSite};
use std::time::Instant;
use time::Duration as CookieDuration;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| {
            if s.starts_with("Bearer ") {
                Some(s[7..].to_string())
            } else {
                None
            }
        })
}

/// Extract a named cookie value from the Cookie header
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get("cookie")?.to_str().ok()?;
    for pair in header.split(';') {
        let pair = pair.trim();
        if let Some((key, value)) = pair.split_once('=') {
            if key == name {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Extract the access token from either the auth cookie or a bearer header.
/// The cookie wins when both are present.
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    extract_cookie(headers, ACCESS_COOKIE).or_else(|| extract_bearer_token(headers))
}

/// Build the httpOnly access token cookie
pub fn access_cookie(config: &ServerConfig, token: &str) -> Cookie<'static> {
    auth_cookie(
        config,
        ACCESS_COOKIE,
        token.to_string(),
        CookieDuration::minutes(config.authentication.access_ttl_minutes),
    )
}

/// Build the httpOnly refresh token cookie
pub fn refresh_cookie(config: &ServerConfig, token: &str) -> Cookie<'static> {
    auth_cookie(
        config,
        REFRESH_COOKIE,
        token.to_string(),
        CookieDuration::days(config.authentication.session_ttl_days),
    )
}

/// Build expired cookies that clear the auth pair on the client
pub fn clear_auth_cookies(config: &ServerConfig) -> (Cookie<'static>, Cookie<'static>) {
    (
        auth_cookie(config, ACCESS_COOKIE, String::new(), CookieDuration::seconds(0)),
        auth_cookie(config, REFRESH_COOKIE, String::new(), CookieDuration::seconds(0)),
    )
}

fn auth_cookie(
    config: &ServerConfig,
    name: &'static str,
    value: String,
    max_age: CookieDuration,
) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_path("/");
    cookie.set_secure(config.authentication.cookie_secure);
    cookie.set_max_age(max_age);
    if let Some(domain) = &config.authentication.cookie_domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}

/// Record request counts and latencies for every handled request
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let started = Instant::now();
    let response = next.run(req).await;

    crate::metrics::record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));

        headers.insert("authorization", HeaderValue::from_static("Basic abc123"));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("theme=dark; accessToken=tok-1; refreshToken=tok-2"),
        );
        assert_eq!(
            extract_cookie(&headers, "accessToken"),
            Some("tok-1".to_string())
        );
        assert_eq!(
            extract_cookie(&headers, "refreshToken"),
            Some("tok-2".to_string())
        );
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_auth_cookie_attributes() {
        let config = crate::config::test_config();

        let cookie = access_cookie(&config, "tok-1");
        assert_eq!(cookie.name(), ACCESS_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));

        let (access, refresh) = clear_auth_cookies(&config);
        assert_eq!(access.max_age(), Some(CookieDuration::seconds(0)));
        assert_eq!(refresh.max_age(), Some(CookieDuration::seconds(0)));
        assert_eq!(refresh.same_site(), Some(SameSite::Strict));
    }

    #[test]
    fn test_cookie_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("accessToken=cookie-token"));
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer header-token"),
        );
        assert_eq!(
            extract_access_token(&headers),
            Some("cookie-token".to_string())
        );
    }
}
