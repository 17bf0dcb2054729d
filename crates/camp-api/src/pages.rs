use axum::{Json, extract::State, response::IntoResponse};
use serde_json::{Value, json};

use crate::error::AppError;
use crate::guard::CurrentUser;
use crate::state::{AppState, blocking};

/// Page view model: the template to render plus its context.
pub fn render(template: &'static str, context: Value) -> Json<Value> {
    let mut page = json!({ "template": template });
    if let (Value::Object(page), Value::Object(context)) = (&mut page, context) {
        page.extend(context);
    }
    Json(page)
}

/// GET /
pub async fn index(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    render(
        "index.html",
        json!({ "current_user": user.map(|u| u.display_name()) }),
    )
}

/// GET /camp — the current event, or `null` when none exists yet.
pub async fn camp(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let event = blocking(&state, |st| Ok(st.db.first_event()?)).await?;
    Ok(render("camp.html", json!({ "event": event })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_merges_context_after_template() {
        let Json(page) = render("camp.html", json!({ "event": null }));
        assert_eq!(page["template"], "camp.html");
        assert!(page["event"].is_null());
        assert_eq!(page.as_object().unwrap().len(), 2);
    }
}
