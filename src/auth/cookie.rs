use axum::http::{header, HeaderMap, HeaderValue};
use cookie::{Cookie, SameSite};

use super::jwt::SessionToken;
use crate::config::SessionConfig;

/// `Set-Cookie` header carrying a freshly signed session token.
pub fn session_cookie(config: &SessionConfig, session: &SessionToken) -> anyhow::Result<HeaderMap> {
    let cookie = Cookie::build((config.cookie_name.clone(), session.token.clone()))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .expires(session.expires_at)
        .build();
    set_cookie(cookie)
}

/// `Set-Cookie` header that makes the browser drop the session cookie.
pub fn removal_cookie(config: &SessionConfig) -> anyhow::Result<HeaderMap> {
    let mut cookie = Cookie::build((config.cookie_name.clone(), String::new()))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    set_cookie(cookie)
}

fn set_cookie(cookie: Cookie<'static>) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie.to_string())?,
    );
    Ok(headers)
}

/// Session token from the named cookie, else from `Authorization: Bearer`.
pub fn read_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Cookie::split_parse(v))
        .filter_map(Result::ok)
        .find(|c| c.name() == cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn config() -> SessionConfig {
        SessionConfig {
            cookie_name: "token".into(),
            cookie_secure: false,
            ttl_days: 15,
        }
    }

    #[test]
    fn session_cookie_is_http_only_and_path_scoped() {
        let session = SessionToken {
            token: "abc.def.ghi".into(),
            expires_at: OffsetDateTime::now_utc() + time::Duration::days(15),
        };
        let headers = session_cookie(&config(), &session).unwrap();
        let value = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(value.starts_with("token=abc.def.ghi"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Path=/"));
        assert!(value.contains("Expires="));
        assert!(!value.contains("Secure"));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let headers = removal_cookie(&config()).unwrap();
        let value = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(value.starts_with("token=;"));
        assert!(value.contains("Max-Age=0"));
    }

    #[test]
    fn reads_token_from_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=xyz"));
        assert_eq!(read_token(&headers, "token").as_deref(), Some("xyz"));
    }

    #[test]
    fn falls_back_to_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(read_token(&headers, "token").as_deref(), Some("xyz"));
    }

    #[test]
    fn empty_cookie_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        assert_eq!(read_token(&headers, "token"), None);
    }
}
