use axum::{
    http::{HeaderMap, HeaderValue, header},
    response::Response,
};
use chrono::{DateTime, Utc};
use cookie::{Cookie, SameSite, time};

use crate::common::SESSION_KEY;

/// Session token from the `Cookie` headers, if any.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_KEY && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

pub fn session_cookie(token: &str, expires_at: DateTime<Utc>, secure: bool) -> Cookie<'static> {
    let seconds = (expires_at - Utc::now()).num_seconds().max(0);

    Cookie::build((SESSION_KEY, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(seconds))
        .build()
}

pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_KEY, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

pub fn set_cookie(response: &mut Response, cookie: Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Could not encode session cookie: {:?}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn finds_the_session_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; ssid=abc123"));
        assert_eq!(session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn empty_or_missing_sessions_are_ignored() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.append(header::COOKIE, HeaderValue::from_static("ssid="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("abc", Utc::now() + Duration::hours(1), true);
        let rendered = cookie.to_string();

        assert!(rendered.starts_with("ssid=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("Path=/"));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        assert!(removal_cookie(false).to_string().contains("Max-Age=0"));
    }
}
