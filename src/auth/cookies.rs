use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::jwt::{JwtKeys, TokenKind};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

fn session_cookie(name: &'static str, value: &str, ttl: std::time::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value.to_owned()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(ttl.as_secs() as i64))
        .build()
}

/// Adds both session cookies; each lives as long as its token.
pub fn with_session(
    jar: CookieJar,
    keys: &JwtKeys,
    secure: bool,
    access_token: &str,
    refresh_token: &str,
) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_COOKIE,
        access_token,
        keys.ttl(TokenKind::Access),
        secure,
    ))
    .add(session_cookie(
        REFRESH_COOKIE,
        refresh_token,
        keys.ttl(TokenKind::Refresh),
        secure,
    ))
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).http_only(true).path("/").build();
    cookie.make_removal();
    cookie
}

/// Expires both session cookies, whether or not the request carried them.
pub fn without_session(jar: CookieJar) -> CookieJar {
    jar.add(removal_cookie(ACCESS_COOKIE))
        .add(removal_cookie(REFRESH_COOKIE))
}
