use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use camp_types::models::{SUPERUSER_ROLE, User};

use crate::error::AppError;
use crate::state::{AppState, blocking};

pub const SESSION_COOKIE: &str = "camp_session";

/// The user behind the request's session, if any. Populated by
/// [`load_session`].
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned().unwrap_or_default())
    }
}

/// A logged-in user. Anonymous requests are sent to the login page with the
/// original path as the `next` target.
pub struct RequireUser(pub User);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<CurrentUser>() {
            Some(CurrentUser(Some(user))) => Ok(RequireUser(user.clone())),
            _ => Err(Redirect::to(&format!("/login?next={}", parts.uri.path()))),
        }
    }
}

/// Session tokens carried by the request, bearer header first, then cookie.
fn session_tokens(headers: &HeaderMap) -> Vec<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let cookie = CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string());

    bearer.into_iter().chain(cookie).collect()
}

/// Resolve the session and attach a [`CurrentUser`] to the request. The first
/// token that names an active user wins, so a stale bearer header does not
/// hide a valid cookie.
pub async fn load_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let tokens = session_tokens(req.headers());
    let user = if tokens.is_empty() {
        None
    } else {
        blocking(&state, move |st| {
            for token in &tokens {
                if let Some(user) = st.identity.current_user(token)? {
                    return Ok(Some(user));
                }
            }
            Ok(None)
        })
        .await?
    };

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

pub fn is_admin_path(path: &str) -> bool {
    path == "/admin" || path.starts_with("/admin/")
}

/// Everything under `/admin` answers 404 unless the session belongs to an
/// active superuser.
pub async fn admin_guard(req: Request, next: Next) -> Result<Response, AppError> {
    if is_admin_path(req.uri().path()) {
        let allowed = req
            .extensions()
            .get::<CurrentUser>()
            .and_then(|c| c.0.as_ref())
            .is_some_and(|u| u.active && u.has_role(SUPERUSER_ROLE));

        if !allowed {
            debug!("Hiding {} from non-superuser", req.uri().path());
            return Err(AppError::NotFound);
        }
    }
    Ok(next.run(req).await)
}
