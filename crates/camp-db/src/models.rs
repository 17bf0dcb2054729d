/// Database row types — these map directly to SQLite rows.
/// Conversions into the camp-types models live here so the query layer can
/// stay string-typed.
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use camp_types::models::{Application, Event, Role, User};

pub struct RoleRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub city: Option<String>,
    pub active: bool,
    pub created_at: String,
}

pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_on: Option<String>,
    pub ends_on: Option<String>,
    pub created_at: String,
}

pub struct ApplicationRow {
    pub id: String,
    pub user_id: String,
    pub event_id: Option<String>,
    pub created_at: String,
}

/// Columns written when a user is created.
#[derive(Debug, Default, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub active: bool,
}

/// Editable user columns other than the password.
#[derive(Debug, Default, Clone)]
pub struct UserChanges {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub city: Option<String>,
    pub active: bool,
}

#[derive(Debug, Default, Clone)]
pub struct EventChanges {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
}

pub(crate) fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("bad date '{s}'")))
        .transpose()
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().or_else(|_| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .map(|ndt| ndt.and_utc())
            .with_context(|| format!("bad timestamp '{raw}'"))
    })
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt id '{raw}'"))
}

impl RoleRow {
    pub fn into_model(self) -> Result<Role> {
        Ok(Role {
            id: parse_id(&self.id)?,
            name: self.name,
            description: self.description,
        })
    }
}

impl UserRow {
    pub fn into_model(self, roles: Vec<RoleRow>) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            birth_date: parse_date(self.birth_date.as_deref())?,
            created_at: parse_timestamp(&self.created_at)?,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            city: self.city,
            active: self.active,
            roles: roles
                .into_iter()
                .map(RoleRow::into_model)
                .collect::<Result<_>>()?,
        })
    }
}

impl EventRow {
    pub fn into_model(self) -> Result<Event> {
        Ok(Event {
            id: parse_id(&self.id)?,
            starts_on: parse_date(self.starts_on.as_deref())?,
            ends_on: parse_date(self.ends_on.as_deref())?,
            created_at: parse_timestamp(&self.created_at)?,
            title: self.title,
            description: self.description,
            location: self.location,
        })
    }
}

impl ApplicationRow {
    pub fn into_model(self) -> Result<Application> {
        Ok(Application {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            event_id: self.event_id.as_deref().map(parse_id).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
