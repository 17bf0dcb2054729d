mod common;

use axum::http::StatusCode;
use camp_db::models::EventChanges;
use camp_types::models::PARTICIPANT_ROLE;
use common::TestApp;

#[tokio::test]
async fn anonymous_visitor_is_sent_to_login() {
    let app = TestApp::new();
    let resp = app.get("/camp/take_part", None).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/login?next=/camp/take_part"));
    assert!(resp.body.get("user_form").is_none());

    let resp = app.post_form("/camp/take_part", None, "city=Kazan").await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn visiting_grants_participant_role_once() {
    let app = TestApp::new();
    let (user, token) = app.user_with_roles("jack.jones@example.com", &["user"]);

    for _ in 0..2 {
        let resp = app.get("/camp/take_part", Some(&token)).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["template"], "take_part.html");
    }

    let db = &app.state.db;
    assert_eq!(db.count_role_memberships(user.id, PARTICIPANT_ROLE).unwrap(), 1);
    let participant_roles = db
        .list_roles()
        .unwrap()
        .into_iter()
        .filter(|r| r.name == PARTICIPANT_ROLE)
        .count();
    assert_eq!(participant_roles, 1);
}

#[tokio::test]
async fn form_lists_missing_profile_fields() {
    let app = TestApp::new();
    let (_, token) = app.user_with_roles("sophie.taylor@example.com", &["user"]);

    let resp = app.get("/camp/take_part", Some(&token)).await;
    let names: Vec<_> = resp.body["user_form"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["first_name", "last_name", "phone", "birth_date", "city"]);
    assert_eq!(resp.body["user_form"]["submitted"], false);
    assert!(resp.body["event"].is_null());
}

#[tokio::test]
async fn valid_submission_redirects_home_and_saves_profile() {
    let app = TestApp::new();
    let event = app
        .state
        .db
        .create_event(&EventChanges {
            title: "Summer camp".into(),
            ..Default::default()
        })
        .unwrap();
    let (user, token) = app.user_with_roles("oliver.patel@example.com", &["user"]);

    let resp = app
        .post_form(
            "/camp/take_part",
            Some(&token),
            "first_name=Oliver&last_name=Patel&phone=%2B7+900+123-45-67&birth_date=2004-03-01&city=Kazan",
        )
        .await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/"));

    let user = app.state.db.get_user(user.id).unwrap().unwrap();
    assert_eq!(user.city.as_deref(), Some("Kazan"));
    assert!(user.has_role(PARTICIPANT_ROLE));

    let applications = app.state.db.list_applications().unwrap();
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0].event_id, Some(event.id));

    // Profile is complete now, so the form is empty and validates as-is
    let resp = app.get("/camp/take_part", Some(&token)).await;
    assert_eq!(resp.body["user_form"]["fields"].as_array().unwrap().len(), 0);
    let resp = app.post_form("/camp/take_part", Some(&token), "").await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(app.state.db.count_applications().unwrap(), 1);
}

#[tokio::test]
async fn missing_field_rerenders_with_error() {
    let app = TestApp::new();
    let (user, token) = app.user_with_roles("emily.lewis@example.com", &["user"]);

    let resp = app
        .post_form(
            "/camp/take_part",
            Some(&token),
            "first_name=Emily&last_name=Lewis&phone=%2B7+900+123-45-67&birth_date=2004-03-01",
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["template"], "take_part.html");

    let fields = resp.body["user_form"]["fields"].as_array().unwrap();
    let city = fields.iter().find(|f| f["name"] == "city").unwrap();
    assert_eq!(city["errors"].as_array().unwrap().len(), 1);
    let first = fields.iter().find(|f| f["name"] == "first_name").unwrap();
    assert_eq!(first["value"], "Emily");
    assert!(first["errors"].as_array().unwrap().is_empty());

    // Nothing is written on a failed submission
    let user = app.state.db.get_user(user.id).unwrap().unwrap();
    assert!(user.first_name.is_none());
    assert_eq!(app.state.db.count_applications().unwrap(), 0);
}
