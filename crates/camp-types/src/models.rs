use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the role that gates the admin console.
pub const SUPERUSER_ROLE: &str = "superuser";
/// Name of the role every registered account receives.
pub const USER_ROLE: &str = "user";
/// Name of the role marking a user as a camp participant.
pub const PARTICIPANT_ROLE: &str = "участник";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// A user as seen by the application. The password hash never leaves the
/// database layer through this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub city: Option<String>,
    pub active: bool,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }

    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: Option<&str>, last: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "harry.brown@example.com".into(),
            first_name: first.map(Into::into),
            last_name: last.map(Into::into),
            phone: None,
            birth_date: None,
            city: None,
            active: true,
            roles: vec![Role {
                id: Uuid::new_v4(),
                name: USER_ROLE.into(),
                description: None,
            }],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn has_role_matches_by_name() {
        let u = user(None, None);
        assert!(u.has_role(USER_ROLE));
        assert!(!u.has_role(SUPERUSER_ROLE));
    }

    #[test]
    fn display_name_falls_back_to_email() {
        assert_eq!(user(Some("Harry"), Some("Brown")).display_name(), "Harry Brown");
        assert_eq!(user(Some("Harry"), None).display_name(), "Harry");
        assert_eq!(user(None, None).display_name(), "harry.brown@example.com");
    }
}
