use std::collections::HashMap;

use axum::{
    Form, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use camp_types::api::{LoginForm, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use camp_types::models::USER_ROLE;

use crate::error::AppError;
use crate::forms::{FormSpec, ProfileField};
use crate::guard::SESSION_COOKIE;
use crate::identity::NewAccount;
use crate::pages::render;
use crate::state::{AppState, blocking};

const MIN_PASSWORD_LEN: usize = 8;

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Only same-site paths are followed after login. Browsers read `/\` as
/// `//`, so a backslash in second position is refused as well.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !matches!(path.as_bytes().get(1), Some(b'/' | b'\\'))
                && !path.chars().any(char::is_control) =>
        {
            path
        }
        _ => "/",
    }
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = req.email.trim().to_string();
    let mut form = FormSpec::new("register", &[ProfileField::Email])
        .bind(&HashMap::from([(ProfileField::Email.name().to_string(), email.clone())]));
    if !form.validate() {
        let errors = form.errors_for(ProfileField::Email.name()).join(" ");
        return Err(AppError::Validation(errors));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let (user, token) = blocking(&state, move |st| {
        let role = st.identity.find_or_create_role(USER_ROLE)?;
        let user = st.identity.create_user(
            NewAccount {
                email,
                password: req.password,
                first_name: req.first_name,
                last_name: req.last_name,
            },
            &[role],
        )?;
        let token = st.identity.issue_token(&user)?;
        Ok((user, token))
    })
    .await?;

    info!("Registered {}", user.email);

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token.clone())),
        Json(RegisterResponse {
            user_id: user.id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, token) = blocking(&state, move |st| {
        let user = st.identity.authenticate(&req.email, &req.password)?;
        let token = st.identity.issue_token(&user)?;
        Ok((user, token))
    })
    .await?;

    info!("{} logged in", user.email);

    Ok((
        jar.add(session_cookie(token.clone())),
        Json(LoginResponse {
            user_id: user.id,
            email: user.email,
            token,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// GET /login
pub async fn login_page(Query(query): Query<NextQuery>) -> impl IntoResponse {
    render(
        "login.html",
        json!({ "next": safe_next(query.next.as_deref()), "error": null }),
    )
}

/// POST /login — form login from the login page.
pub async fn login_form(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let next = safe_next(form.next.as_deref()).to_string();
    let email = form.email.clone();

    let outcome = blocking(&state, move |st| {
        match st.identity.authenticate(&form.email, &form.password) {
            Ok(user) => Ok(Some(st.identity.issue_token(&user)?)),
            Err(AppError::InvalidCredentials) => Ok(None),
            Err(e) => Err(e),
        }
    })
    .await?;

    match outcome {
        Some(token) => {
            info!("{} logged in", email);
            Ok((jar.add(session_cookie(token)), Redirect::to(&next)).into_response())
        }
        None => {
            warn!("Failed login for {}", email);
            Ok((
                StatusCode::UNAUTHORIZED,
                render(
                    "login.html",
                    json!({ "next": next, "email": email, "error": "Неверный email или пароль." }),
                ),
            )
                .into_response())
        }
    }
}

/// GET /logout
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_must_be_a_local_path() {
        assert_eq!(safe_next(Some("/camp/take_part")), "/camp/take_part");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(Some("/camp\r\nSet-Cookie: x=1")), "/");
        assert_eq!(safe_next(Some("/camp\\notes")), "/camp\\notes");
        assert_eq!(safe_next(None), "/");
    }
}
