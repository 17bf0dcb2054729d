mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use camp_db::models::EventChanges;
use common::TestApp;

#[tokio::test]
async fn landing_page_needs_no_login() {
    let app = TestApp::new();
    let resp = app.get("/", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["template"], "index.html");
    assert!(resp.body["current_user"].is_null());
}

#[tokio::test]
async fn camp_without_events_renders_null_event() {
    let app = TestApp::new();
    let resp = app.get("/camp", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["template"], "camp.html");
    assert!(resp.body["event"].is_null());
}

#[tokio::test]
async fn camp_shows_first_event() {
    let app = TestApp::new();
    for title in ["Summer camp 2025", "Winter camp 2026"] {
        app.state
            .db
            .create_event(&EventChanges {
                title: title.into(),
                location: Some("Kazan".into()),
                ..Default::default()
            })
            .unwrap();
    }

    let resp = app.get("/camp", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["event"]["title"], "Summer camp 2025");
}

#[tokio::test]
async fn stale_bearer_header_falls_back_to_cookie() {
    let app = TestApp::new();
    let (_, token) = app.user_with_roles("mia.thomas@example.com", &["user"]);

    let req = Request::builder()
        .uri("/camp/take_part")
        .header(header::AUTHORIZATION, "Bearer expired-or-garbage")
        .header(header::COOKIE, format!("camp_session={token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.send(req).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["template"], "take_part.html");
}

#[tokio::test]
async fn register_then_login_with_cookie_session() {
    let app = TestApp::new();
    let resp = app
        .json(
            axum::http::Method::POST,
            "/auth/register",
            None,
            serde_json::json!({"email": "ava.clarke@example.com", "password": "long-enough"}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert!(resp.body["token"].is_string());

    let user = app.state.identity.find_user("ava.clarke@example.com").unwrap().unwrap();
    assert!(user.has_role("user"));

    let resp = app
        .post_form(
            "/login",
            None,
            "email=ava.clarke%40example.com&password=long-enough&next=%2Fcamp",
        )
        .await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/camp"));
    let cookie = resp.headers.get("set-cookie").unwrap().to_str().unwrap();
    assert!(cookie.starts_with("camp_session="));
}

#[tokio::test]
async fn register_rejects_short_password_and_duplicates() {
    let app = TestApp::new();
    let body = serde_json::json!({"email": "isla.james@example.com", "password": "short"});
    let resp = app.json(axum::http::Method::POST, "/auth/register", None, body).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    app.user_with_roles("isla.james@example.com", &["user"]);
    let body = serde_json::json!({"email": "isla.james@example.com", "password": "long-enough"});
    let resp = app.json(axum::http::Method::POST, "/auth/register", None, body).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_checks_email_with_form_rules() {
    let app = TestApp::new();
    let body = serde_json::json!({"email": "harry", "password": "long-enough"});
    let resp = app.json(axum::http::Method::POST, "/auth/register", None, body).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["message"], "Неверный адрес электронной почты.");

    let body = serde_json::json!({"email": "  ", "password": "long-enough"});
    let resp = app.json(axum::http::Method::POST, "/auth/register", None, body).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["message"], "Обязательное поле.");

    let body = serde_json::json!({"email": " harry.brown@example.com ", "password": "long-enough"});
    let resp = app.json(axum::http::Method::POST, "/auth/register", None, body).await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert!(app.state.identity.find_user("harry.brown@example.com").unwrap().is_some());
}

#[tokio::test]
async fn bad_form_login_rerenders_with_401() {
    let app = TestApp::new();
    app.user_with_roles("riley.mason@example.com", &["user"]);
    let resp = app
        .post_form("/login", None, "email=riley.mason%40example.com&password=nope")
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.body["template"], "login.html");
    assert!(resp.body["error"].is_string());
}
