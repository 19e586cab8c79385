/// Token carriers
///
/// Both tokens travel as HTTP-only, strict same-site cookies whose lifetime
/// matches the token they carry. Logout and failed authentication overwrite
/// them with already-expired values.

use actix_web::cookie::time::{Duration, OffsetDateTime};
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header::{HeaderMap, ACCEPT};

use crate::auth::{IssuedToken, TokenPair};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const HX_REQUEST: &str = "HX-Request";
pub const HX_REDIRECT: &str = "HX-Redirect";

/// Builds token cookies with a consistent set of attributes.
#[derive(Debug, Clone)]
pub struct CookieFactory {
    secure: bool,
}

impl CookieFactory {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    pub fn token_cookie(&self, name: &'static str, issued: &IssuedToken, now: i64) -> Cookie<'static> {
        let max_age = (issued.expires_at - now).max(0);
        let mut cookie = self.base(name, issued.token.clone());
        cookie.set_max_age(Duration::seconds(max_age));
        if let Ok(expires) = OffsetDateTime::from_unix_timestamp(issued.expires_at) {
            cookie.set_expires(expires);
        }
        cookie
    }

    pub fn pair(&self, pair: &TokenPair, now: i64) -> [Cookie<'static>; 2] {
        [
            self.token_cookie(ACCESS_TOKEN_COOKIE, &pair.access, now),
            self.token_cookie(REFRESH_TOKEN_COOKIE, &pair.refresh, now),
        ]
    }

    /// An already-expired, empty cookie that replaces `name` on the client.
    pub fn expired(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = self.base(name, String::new());
        cookie.set_max_age(Duration::ZERO);
        cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
        cookie
    }

    pub fn cleared(&self) -> [Cookie<'static>; 2] {
        [
            self.expired(ACCESS_TOKEN_COOKIE),
            self.expired(REFRESH_TOKEN_COOKIE),
        ]
    }

    fn base(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build(name, value)
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .finish()
    }
}

/// Whether the caller is a browser page (htmx or plain HTML navigation)
/// rather than an API client.
pub fn is_browser_request(headers: &HeaderMap) -> bool {
    if is_htmx_request(headers) {
        return true;
    }
    headers
        .get(ACCEPT)
        .and_then(|h| h.to_str().ok())
        .map(|accept| accept.trim_start().starts_with("text/html"))
        .unwrap_or(false)
}

pub fn is_htmx_request(headers: &HeaderMap) -> bool {
    headers
        .get(HX_REQUEST)
        .and_then(|h| h.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        map
    }

    #[test]
    fn test_token_cookie_attributes() {
        let factory = CookieFactory::new(true);
        let issued = IssuedToken {
            token: "abc.def.ghi".to_string(),
            expires_at: 1_700_000_300,
        };
        let cookie = factory.token_cookie(ACCESS_TOKEN_COOKIE, &issued, 1_700_000_000);

        assert_eq!(cookie.name(), ACCESS_TOKEN_COOKIE);
        assert_eq!(cookie.value(), "abc.def.ghi");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(300)));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_expired_cookie() {
        let cookie = CookieFactory::new(true).expired(REFRESH_TOKEN_COOKIE);

        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(
            cookie.expires_datetime(),
            Some(OffsetDateTime::UNIX_EPOCH)
        );
    }

    #[test]
    fn test_browser_detection() {
        assert!(is_browser_request(&headers(&[("hx-request", "true")])));
        assert!(is_browser_request(&headers(&[(
            "accept",
            "text/html,application/xhtml+xml"
        )])));
        assert!(!is_browser_request(&headers(&[("accept", "application/json")])));
        assert!(!is_browser_request(&HeaderMap::new()));
    }
}
