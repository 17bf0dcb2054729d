pub mod admin;
pub mod auth;
pub mod error;
pub mod forms;
pub mod guard;
pub mod identity;
pub mod pages;
pub mod registration;
pub mod seed;
pub mod state;

use axum::{
    Router, middleware,
    routing::{get, post},
};

pub use state::{AppState, AppStateInner};

/// Every route of the application. The session is resolved before the admin
/// guard runs.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/camp", get(pages::camp))
        .route(
            "/camp/take_part",
            get(registration::take_part).post(registration::submit_take_part),
        )
        .route("/login", get(auth::login_page).post(auth::login_form))
        .route("/logout", get(auth::logout))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/admin/", get(admin::routes::dashboard))
        .route(
            "/admin/{model}/",
            get(admin::routes::list_records).post(admin::routes::create_record),
        )
        .route(
            "/admin/{model}/{id}",
            get(admin::routes::get_record)
                .put(admin::routes::update_record)
                .delete(admin::routes::delete_record),
        )
        .layer(middleware::from_fn(guard::admin_guard))
        .layer(middleware::from_fn_with_state(state.clone(), guard::load_session))
        .with_state(state)
}
