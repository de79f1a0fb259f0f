use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::infrastructure::middleware::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::infrastructure::security::TokenPair;

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(if secure { SameSite::None } else { SameSite::Lax })
        .path("/")
        .build()
}

pub fn with_session(jar: CookieJar, tokens: &TokenPair, secure: bool) -> CookieJar {
    jar.add(session_cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone(), secure))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone(), secure))
}

pub fn without_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_TOKEN_COOKIE).path("/"))
}
