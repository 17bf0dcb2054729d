use std::collections::HashMap;

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tracing::info;

use camp_types::models::{Event, PARTICIPANT_ROLE, User};

use crate::error::AppError;
use crate::forms::{BoundForm, FormSpec};
use crate::guard::RequireUser;
use crate::identity::IdentityProvider;
use crate::pages::render;
use crate::state::{AppState, blocking};

/// Moves `user` into the participant state. Safe to call repeatedly: the
/// role is created once and granted at most once. Returns the refreshed user.
pub fn ensure_participant(idp: &IdentityProvider, user: User) -> anyhow::Result<User> {
    if idp.has_role(&user, PARTICIPANT_ROLE) {
        return Ok(user);
    }
    idp.assign_role(&user, PARTICIPANT_ROLE)?;
    Ok(idp.db().get_user(user.id)?.unwrap_or(user))
}

fn take_part_page(event: Option<Event>, form: BoundForm) -> Response {
    render("take_part.html", json!({ "event": event, "user_form": form })).into_response()
}

/// GET /camp/take_part
pub async fn take_part(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Response, AppError> {
    let (user, event) = blocking(&state, move |st| {
        let user = ensure_participant(&st.identity, user)?;
        Ok((user, st.db.first_event()?))
    })
    .await?;

    Ok(take_part_page(event, FormSpec::for_user(&user).unbound()))
}

/// POST /camp/take_part — validates the submitted profile fields. A valid
/// submission fills in the profile, records an application for the current
/// event and redirects home; otherwise the page is shown again with errors.
pub async fn submit_take_part(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(data): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let outcome = blocking(&state, move |st| {
        let user = ensure_participant(&st.identity, user)?;
        let event = st.db.first_event()?;

        let mut form = FormSpec::for_user(&user).bind(&data);
        if !form.validate() {
            return Ok(Err((event, form)));
        }

        st.db.update_profile(user.id, &form.profile_update())?;
        let (_, created) = st.db.record_application(user.id, event.as_ref().map(|e| e.id))?;
        if created {
            info!("Recorded application for {}", user.email);
        }
        Ok(Ok(()))
    })
    .await?;

    match outcome {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err((event, form)) => Ok(take_part_page(event, form)),
    }
}
