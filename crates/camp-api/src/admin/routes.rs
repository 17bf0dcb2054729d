use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use camp_types::api::AdminViewSummary;

use crate::error::AppError;
use crate::guard::CurrentUser;
use crate::pages::render;
use crate::state::{AppState, blocking};

/// GET /admin/ — registered views with their record counts.
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let views = blocking(&state, |st| {
        st.admin
            .views()
            .map(|v| {
                Ok(AdminViewSummary {
                    endpoint: v.endpoint().to_string(),
                    name: v.name().to_string(),
                    count: v.count(&st.identity)?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()
    })
    .await?;

    Ok(render(
        "admin/index.html",
        json!({
            "views": views,
            "current_user": user.map(|u| u.email),
        }),
    ))
}

pub async fn list_records(
    State(state): State<AppState>,
    Path(model): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let rows = blocking(&state, move |st| {
        let view = st.admin.view(&model).ok_or(AppError::NotFound)?;
        view.list(&st.identity)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn create_record(
    State(state): State<AppState>,
    Path(model): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let row = blocking(&state, move |st| {
        let view = st.admin.view(&model).ok_or(AppError::NotFound)?;
        view.create(&st.identity, body)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn get_record(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let row = blocking(&state, move |st| {
        let view = st.admin.view(&model).ok_or(AppError::NotFound)?;
        view.get(&st.identity, id)?.ok_or(AppError::NotFound)
    })
    .await?;
    Ok(Json(row))
}

pub async fn update_record(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, Uuid)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let row = blocking(&state, move |st| {
        let view = st.admin.view(&model).ok_or(AppError::NotFound)?;
        view.update(&st.identity, id, body)?.ok_or(AppError::NotFound)
    })
    .await?;
    Ok(Json(row))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    blocking(&state, move |st| {
        let view = st.admin.view(&model).ok_or(AppError::NotFound)?;
        if !view.delete(&st.identity, id)? {
            return Err(AppError::NotFound);
        }
        info!("Admin deleted {} {}", model, id);
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
