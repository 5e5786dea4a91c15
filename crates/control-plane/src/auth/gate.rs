// Page gate for the hosted admin console
// Decision: Signature and expiry are verified here; the stale-token check
// stays with the API extractors since it needs a database read
// Decision: The role comes from the signed claim, so a demoted admin or a
// superseded session keeps page access until the token expires. Data is
// still guarded: API extractors re-read the role and token hash per request

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use marketplace_core::access::{self, AccessDecision, TokenState, HOME_PATH, LOGIN_PATH};

use super::{jwt::JwtService, TOKEN_COOKIE};

/// Resolve the `token` cookie to a token state.
fn token_state(jar: &CookieJar, jwt: &JwtService) -> TokenState {
    let Some(cookie) = jar.get(TOKEN_COOKIE).filter(|c| !c.value().is_empty()) else {
        return TokenState::Missing;
    };
    match jwt.validate_session_token(cookie.value()) {
        Ok(claims) => TokenState::Valid(claims.role),
        Err(e) => {
            tracing::debug!("Gate rejected session cookie: {:#}", e);
            TokenState::Invalid
        }
    }
}

/// Middleware applying [`access::decide`] to every request.
pub async fn page_gate(
    State(jwt): State<Arc<JwtService>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let jar = CookieJar::from_headers(req.headers());

    match access::decide(&path, token_state(&jar, &jwt)) {
        AccessDecision::Allow => next.run(req).await,
        AccessDecision::RedirectToLogin { clear_token } => {
            tracing::debug!(%path, clear_token, "Redirecting to login");
            if clear_token {
                let jar = jar.remove(Cookie::build(TOKEN_COOKIE).path("/"));
                (jar, Redirect::temporary(LOGIN_PATH)).into_response()
            } else {
                Redirect::temporary(LOGIN_PATH).into_response()
            }
        }
        AccessDecision::RedirectHome => {
            tracing::debug!(%path, "Non-admin session on admin page");
            Redirect::temporary(HOME_PATH).into_response()
        }
    }
}
