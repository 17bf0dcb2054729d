#![allow(dead_code)]

use argon2::{Algorithm, Argon2, Params, Version};
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use camp_api::identity::NewAccount;
use camp_api::{AppState, AppStateInner};
use camp_db::Database;
use camp_types::models::User;

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    pub fn new() -> Self {
        let hasher = Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(Params::MIN_M_COST, 1, 1, None).unwrap(),
        );
        let db = Database::open_in_memory().unwrap();
        let state = AppStateInner::with_hasher(db, "test-secret".into(), hasher);
        let router = camp_api::router(state.clone());
        Self { state, router }
    }

    /// Creates an account with the named roles and returns it with a session token.
    pub fn user_with_roles(&self, email: &str, roles: &[&str]) -> (User, String) {
        let idp = &self.state.identity;
        let roles: Vec<_> = roles
            .iter()
            .map(|r| idp.find_or_create_role(r).unwrap())
            .collect();
        let user = idp
            .create_user(
                NewAccount {
                    email: email.into(),
                    password: "password123".into(),
                    ..Default::default()
                },
                &roles,
            )
            .unwrap();
        let token = idp.issue_token(&user).unwrap();
        (user, token)
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_form(&self, uri: &str, token: Option<&str>, form: &str) -> TestResponse {
        let req = request(Method::POST, uri, token)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.send(req).await
    }

    pub async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        let req = request(method, uri, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(t) => builder.header(header::AUTHORIZATION, format!("Bearer {t}")),
        None => builder,
    }
}
