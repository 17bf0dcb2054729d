use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use camp_db::models::{EventChanges, UserChanges};
use camp_types::models::{Application, Event, Role, User};

use super::AdminModel;
use crate::error::AppError;
use crate::identity::{IdentityProvider, NewAccount};

fn non_blank(value: &str, what: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{what} must not be empty")));
    }
    Ok(value.to_string())
}

// -- Role --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl AdminModel for Role {
    type Input = RoleInput;
    const ENDPOINT: &'static str = "role";
    const NAME: &'static str = "Role";

    fn count(idp: &IdentityProvider) -> Result<usize, AppError> {
        Ok(idp.db().count_roles()?)
    }

    fn list(idp: &IdentityProvider) -> Result<Vec<Self>, AppError> {
        Ok(idp.db().list_roles()?)
    }

    fn get(idp: &IdentityProvider, id: Uuid) -> Result<Option<Self>, AppError> {
        Ok(idp.db().get_role(id)?)
    }

    fn create(idp: &IdentityProvider, input: RoleInput) -> Result<Self, AppError> {
        let name = non_blank(&input.name, "Role name")?;
        let role = idp.db().create_role(&name, input.description.as_deref())?;
        info!("Admin created role '{}'", role.name);
        Ok(role)
    }

    fn update(idp: &IdentityProvider, id: Uuid, input: RoleInput) -> Result<Option<Self>, AppError> {
        let name = non_blank(&input.name, "Role name")?;
        Ok(idp.db().update_role(id, &name, input.description.as_deref())?)
    }

    fn delete(idp: &IdentityProvider, id: Uuid) -> Result<bool, AppError> {
        Ok(idp.db().delete_role(id)?)
    }
}

// -- User --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserInput {
    pub email: String,
    /// Required on create; on update a present value replaces the password.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Role names. Left out on update, the current roles are kept.
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

fn default_active() -> bool {
    true
}

fn resolve_roles(idp: &IdentityProvider, names: &[String]) -> Result<Vec<Role>, AppError> {
    names
        .iter()
        .map(|name| {
            idp.db()
                .get_role_by_name(name)?
                .ok_or_else(|| AppError::Validation(format!("Unknown role '{name}'")))
        })
        .collect()
}

impl AdminModel for User {
    type Input = UserInput;
    const ENDPOINT: &'static str = "user";
    const NAME: &'static str = "User";

    fn count(idp: &IdentityProvider) -> Result<usize, AppError> {
        Ok(idp.db().count_users()?)
    }

    fn list(idp: &IdentityProvider) -> Result<Vec<Self>, AppError> {
        Ok(idp.db().list_users()?)
    }

    fn get(idp: &IdentityProvider, id: Uuid) -> Result<Option<Self>, AppError> {
        Ok(idp.db().get_user(id)?)
    }

    fn create(idp: &IdentityProvider, input: UserInput) -> Result<Self, AppError> {
        let email = non_blank(&input.email, "Email")?;
        let password = input
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::Validation("Password is required".into()))?;
        let roles = resolve_roles(idp, input.roles.as_deref().unwrap_or_default())?;

        let user = idp.create_user(
            NewAccount {
                email,
                password,
                first_name: input.first_name.clone(),
                last_name: input.last_name.clone(),
            },
            &roles,
        )?;
        // Columns the account constructor does not take
        let user = Self::update(idp, user.id, UserInput { password: None, ..input })?
            .ok_or(AppError::NotFound)?;
        info!("Admin created user {}", user.email);
        Ok(user)
    }

    fn update(idp: &IdentityProvider, id: Uuid, input: UserInput) -> Result<Option<Self>, AppError> {
        let roles = input
            .roles
            .as_deref()
            .map(|names| resolve_roles(idp, names))
            .transpose()?;
        let changes = UserChanges {
            email: non_blank(&input.email, "Email")?,
            first_name: input.first_name,
            last_name: input.last_name,
            phone: input.phone,
            birth_date: input.birth_date,
            city: input.city,
            active: input.active,
        };

        let db = idp.db();
        if db.update_user(id, &changes)?.is_none() {
            return Ok(None);
        }
        if let Some(password) = input.password.filter(|p| !p.is_empty()) {
            db.set_password(id, &idp.hash_password(&password)?)?;
        }
        if let Some(roles) = roles {
            let role_ids: Vec<_> = roles.iter().map(|r| r.id).collect();
            db.set_user_roles(id, &role_ids)?;
        }
        Ok(db.get_user(id)?)
    }

    fn delete(idp: &IdentityProvider, id: Uuid) -> Result<bool, AppError> {
        Ok(idp.db().delete_user(id)?)
    }
}

/// Shows a user's roles by name.
pub fn role_names(_idp: &IdentityProvider, user: &User) -> Result<Value, AppError> {
    Ok(Value::from(
        user.roles.iter().map(|r| r.name.clone()).collect::<Vec<_>>(),
    ))
}

// -- Event --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub starts_on: Option<NaiveDate>,
    #[serde(default)]
    pub ends_on: Option<NaiveDate>,
}

impl EventInput {
    fn into_changes(self) -> Result<EventChanges, AppError> {
        if let (Some(start), Some(end)) = (self.starts_on, self.ends_on) {
            if end < start {
                return Err(AppError::Validation("Event ends before it starts".into()));
            }
        }
        Ok(EventChanges {
            title: non_blank(&self.title, "Title")?,
            description: self.description,
            location: self.location,
            starts_on: self.starts_on,
            ends_on: self.ends_on,
        })
    }
}

impl AdminModel for Event {
    type Input = EventInput;
    const ENDPOINT: &'static str = "event";
    const NAME: &'static str = "Event";

    fn count(idp: &IdentityProvider) -> Result<usize, AppError> {
        Ok(idp.db().count_events()?)
    }

    fn list(idp: &IdentityProvider) -> Result<Vec<Self>, AppError> {
        Ok(idp.db().list_events()?)
    }

    fn get(idp: &IdentityProvider, id: Uuid) -> Result<Option<Self>, AppError> {
        Ok(idp.db().get_event(id)?)
    }

    fn create(idp: &IdentityProvider, input: EventInput) -> Result<Self, AppError> {
        let event = idp.db().create_event(&input.into_changes()?)?;
        info!("Admin created event '{}'", event.title);
        Ok(event)
    }

    fn update(idp: &IdentityProvider, id: Uuid, input: EventInput) -> Result<Option<Self>, AppError> {
        Ok(idp.db().update_event(id, &input.into_changes()?)?)
    }

    fn delete(idp: &IdentityProvider, id: Uuid) -> Result<bool, AppError> {
        Ok(idp.db().delete_event(id)?)
    }
}

// -- Application --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationInput {
    pub user_id: Uuid,
    #[serde(default)]
    pub event_id: Option<Uuid>,
}

impl ApplicationInput {
    fn check_refs(&self, idp: &IdentityProvider) -> Result<(), AppError> {
        if idp.db().get_user(self.user_id)?.is_none() {
            return Err(AppError::Validation(format!("Unknown user {}", self.user_id)));
        }
        if let Some(event_id) = self.event_id {
            if idp.db().get_event(event_id)?.is_none() {
                return Err(AppError::Validation(format!("Unknown event {event_id}")));
            }
        }
        Ok(())
    }
}

impl AdminModel for Application {
    type Input = ApplicationInput;
    const ENDPOINT: &'static str = "application";
    const NAME: &'static str = "Application";

    fn count(idp: &IdentityProvider) -> Result<usize, AppError> {
        Ok(idp.db().count_applications()?)
    }

    fn list(idp: &IdentityProvider) -> Result<Vec<Self>, AppError> {
        Ok(idp.db().list_applications()?)
    }

    fn get(idp: &IdentityProvider, id: Uuid) -> Result<Option<Self>, AppError> {
        Ok(idp.db().get_application(id)?)
    }

    fn create(idp: &IdentityProvider, input: ApplicationInput) -> Result<Self, AppError> {
        input.check_refs(idp)?;
        let (application, created) = idp.db().record_application(input.user_id, input.event_id)?;
        if !created {
            return Err(AppError::Conflict("Application already recorded".into()));
        }
        Ok(application)
    }

    fn update(
        idp: &IdentityProvider,
        id: Uuid,
        input: ApplicationInput,
    ) -> Result<Option<Self>, AppError> {
        input.check_refs(idp)?;
        Ok(idp.db().update_application(id, input.user_id, input.event_id)?)
    }

    fn delete(idp: &IdentityProvider, id: Uuid) -> Result<bool, AppError> {
        Ok(idp.db().delete_application(id)?)
    }
}

pub fn applicant_email(idp: &IdentityProvider, app: &Application) -> Result<Value, AppError> {
    Ok(idp
        .db()
        .get_user(app.user_id)?
        .map(|u| Value::from(u.email))
        .unwrap_or(Value::Null))
}

pub fn event_title(idp: &IdentityProvider, app: &Application) -> Result<Value, AppError> {
    let Some(event_id) = app.event_id else {
        return Ok(Value::Null);
    };
    Ok(idp
        .db()
        .get_event(event_id)?
        .map(|e| Value::from(e.title))
        .unwrap_or(Value::Null))
}
