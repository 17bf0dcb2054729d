use std::collections::HashMap;

use crate::Database;
use crate::models::{
    ApplicationRow, EventChanges, EventRow, NewUser, RoleRow, UserChanges, UserRow, format_date,
};
use anyhow::Result;
use camp_types::models::{Application, Event, Role, User};
use chrono::NaiveDate;
use rusqlite::{Connection, Row};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, email, password, first_name, last_name, phone, birth_date, city, active, created_at";
const EVENT_COLUMNS: &str = "id, title, description, location, starts_on, ends_on, created_at";

/// Profile columns filled in through the take-part form. `None` leaves the
/// stored value untouched.
#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub city: Option<String>,
}

impl Database {
    // -- Roles --

    pub fn create_role(&self, name: &str, description: Option<&str>) -> Result<Role> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO roles (id, name, description) VALUES (?1, ?2, ?3)",
                (id.to_string(), name, description),
            )?;
            Ok(())
        })?;
        Ok(Role {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
        })
    }

    pub fn get_role(&self, id: Uuid) -> Result<Option<Role>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, description FROM roles WHERE id = ?1",
                [id.to_string()],
                map_role,
            )
            .optional()?
            .map(RoleRow::into_model)
            .transpose()
        })
    }

    pub fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        self.with_conn(|conn| {
            query_role_by_name(conn, name)?
                .map(RoleRow::into_model)
                .transpose()
        })
    }

    /// Returns the role called `name`, inserting it first if it does not exist.
    /// Role names are unique, so concurrent callers converge on one row.
    pub fn find_or_create_role(&self, name: &str) -> Result<Role> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT OR IGNORE INTO roles (id, name) VALUES (?1, ?2)",
                (Uuid::new_v4().to_string(), name),
            )?;
            query_role_by_name(tx, name)?
                .ok_or_else(|| anyhow::anyhow!("Role vanished after insert: {}", name))?
                .into_model()
        })
    }

    pub fn list_roles(&self) -> Result<Vec<Role>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, description FROM roles ORDER BY rowid")?;
            let rows = stmt
                .query_map([], map_role)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(RoleRow::into_model).collect()
        })
    }

    pub fn update_role(&self, id: Uuid, name: &str, description: Option<&str>) -> Result<Option<Role>> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE roles SET name = ?2, description = ?3 WHERE id = ?1",
                (id.to_string(), name, description),
            )?)
        })?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_role(id)
    }

    pub fn delete_role(&self, id: Uuid) -> Result<bool> {
        self.delete_by_id("roles", id)
    }

    pub fn count_roles(&self) -> Result<usize> {
        self.count_rows("roles")
    }

    // -- Users --

    /// Inserts the user and its role memberships in one transaction.
    pub fn create_user(&self, new: &NewUser, role_ids: &[Uuid]) -> Result<User> {
        let id = Uuid::new_v4();
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO users (id, email, password, first_name, last_name, active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id.to_string(),
                    new.email,
                    new.password_hash,
                    new.first_name,
                    new.last_name,
                    new.active
                ],
            )?;
            for role_id in role_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO roles_users (user_id, role_id) VALUES (?1, ?2)",
                    (id.to_string(), role_id.to_string()),
                )?;
            }
            Ok(())
        })?;
        self.get_user(id)?
            .ok_or_else(|| anyhow::anyhow!("User vanished after insert: {}", id))
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                    [id.to_string()],
                    map_user,
                )
                .optional()?;
            row.map(|r| load_user(conn, r)).transpose()
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.get_user_with_password(email)?.map(|(user, _)| user))
    }

    /// Looks a user up by login identifier and returns the stored password
    /// hash alongside it.
    pub fn get_user_with_password(&self, email: &str) -> Result<Option<(User, String)>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                    [email],
                    map_user,
                )
                .optional()?;
            row.map(|r| {
                let hash = r.password.clone();
                load_user(conn, r).map(|u| (u, hash))
            })
            .transpose()
        })
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid"))?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // One query for every membership instead of one per user
            let mut memberships: HashMap<String, Vec<RoleRow>> = HashMap::new();
            let mut stmt = conn.prepare(
                "SELECT ru.user_id, r.id, r.name, r.description
                 FROM roles_users ru
                 JOIN roles r ON r.id = ru.role_id
                 ORDER BY r.rowid",
            )?;
            let pairs = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    RoleRow {
                        id: row.get(1)?,
                        name: row.get(2)?,
                        description: row.get(3)?,
                    },
                ))
            })?;
            for pair in pairs {
                let (user_id, role) = pair?;
                memberships.entry(user_id).or_default().push(role);
            }

            rows.into_iter()
                .map(|r| {
                    let roles = memberships.remove(&r.id).unwrap_or_default();
                    r.into_model(roles)
                })
                .collect()
        })
    }

    pub fn update_user(&self, id: Uuid, changes: &UserChanges) -> Result<Option<User>> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users SET email = ?2, first_name = ?3, last_name = ?4, phone = ?5,
                     birth_date = ?6, city = ?7, active = ?8
                 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    changes.email,
                    changes.first_name,
                    changes.last_name,
                    changes.phone,
                    format_date(changes.birth_date),
                    changes.city,
                    changes.active
                ],
            )?)
        })?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_user(id)
    }

    pub fn update_profile(&self, id: Uuid, profile: &ProfileUpdate) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                     first_name = COALESCE(?2, first_name),
                     last_name  = COALESCE(?3, last_name),
                     phone      = COALESCE(?4, phone),
                     birth_date = COALESCE(?5, birth_date),
                     city       = COALESCE(?6, city)
                 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    profile.first_name,
                    profile.last_name,
                    profile.phone,
                    format_date(profile.birth_date),
                    profile.city
                ],
            )?;
            Ok(())
        })
    }

    pub fn set_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET password = ?2 WHERE id = ?1",
                (id.to_string(), password_hash),
            )?;
            Ok(())
        })
    }

    pub fn delete_user(&self, id: Uuid) -> Result<bool> {
        self.delete_by_id("users", id)
    }

    pub fn count_users(&self) -> Result<usize> {
        self.count_rows("users")
    }

    /// Adds a role membership. Returns false if the user already had it.
    pub fn add_role_to_user(&self, user_id: Uuid, role_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO roles_users (user_id, role_id) VALUES (?1, ?2)",
                (user_id.to_string(), role_id.to_string()),
            )?;
            Ok(inserted == 1)
        })
    }

    /// Replaces the full role set of a user.
    pub fn set_user_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute("DELETE FROM roles_users WHERE user_id = ?1", [user_id.to_string()])?;
            for role_id in role_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO roles_users (user_id, role_id) VALUES (?1, ?2)",
                    (user_id.to_string(), role_id.to_string()),
                )?;
            }
            Ok(())
        })
    }

    pub fn count_role_memberships(&self, user_id: Uuid, role_name: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM roles_users ru JOIN roles r ON r.id = ru.role_id
                 WHERE ru.user_id = ?1 AND r.name = ?2",
                (user_id.to_string(), role_name),
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
    }

    // -- Events --

    pub fn create_event(&self, event: &EventChanges) -> Result<Event> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (id, title, description, location, starts_on, ends_on)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id.to_string(),
                    event.title,
                    event.description,
                    event.location,
                    format_date(event.starts_on),
                    format_date(event.ends_on)
                ],
            )?;
            Ok(())
        })?;
        self.get_event(id)?
            .ok_or_else(|| anyhow::anyhow!("Event vanished after insert: {}", id))
    }

    /// The current event: the earliest inserted row, if any.
    pub fn first_event(&self) -> Result<Option<Event>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY rowid LIMIT 1"),
                [],
                map_event,
            )
            .optional()?
            .map(EventRow::into_model)
            .transpose()
        })
    }

    pub fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                [id.to_string()],
                map_event,
            )
            .optional()?
            .map(EventRow::into_model)
            .transpose()
        })
    }

    pub fn list_events(&self) -> Result<Vec<Event>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY rowid"))?;
            let rows = stmt
                .query_map([], map_event)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(EventRow::into_model).collect()
        })
    }

    pub fn update_event(&self, id: Uuid, event: &EventChanges) -> Result<Option<Event>> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE events SET title = ?2, description = ?3, location = ?4,
                     starts_on = ?5, ends_on = ?6
                 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    event.title,
                    event.description,
                    event.location,
                    format_date(event.starts_on),
                    format_date(event.ends_on)
                ],
            )?)
        })?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_event(id)
    }

    pub fn delete_event(&self, id: Uuid) -> Result<bool> {
        self.delete_by_id("events", id)
    }

    pub fn count_events(&self) -> Result<usize> {
        self.count_rows("events")
    }

    // -- Applications --

    /// Records that `user_id` applied to `event_id`. Returns the existing row
    /// (and `false`) when the pair is already recorded.
    pub fn record_application(
        &self,
        user_id: Uuid,
        event_id: Option<Uuid>,
    ) -> Result<(Application, bool)> {
        let uid = user_id.to_string();
        let eid = event_id.map(|e| e.to_string());
        let (row, created) = self.with_tx(|tx| {
            // `IS` so that a missing event also matches an existing NULL row
            let existing = tx
                .query_row(
                    "SELECT id, user_id, event_id, created_at FROM applications
                     WHERE user_id = ?1 AND event_id IS ?2",
                    (&uid, &eid),
                    map_application,
                )
                .optional()?;
            if let Some(row) = existing {
                return Ok((row, false));
            }

            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO applications (id, user_id, event_id) VALUES (?1, ?2, ?3)",
                (&id, &uid, &eid),
            )?;
            let row = tx.query_row(
                "SELECT id, user_id, event_id, created_at FROM applications WHERE id = ?1",
                [&id],
                map_application,
            )?;
            Ok((row, true))
        })?;
        Ok((row.into_model()?, created))
    }

    pub fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, event_id, created_at FROM applications WHERE id = ?1",
                [id.to_string()],
                map_application,
            )
            .optional()?
            .map(ApplicationRow::into_model)
            .transpose()
        })
    }

    pub fn list_applications(&self) -> Result<Vec<Application>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, event_id, created_at FROM applications ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map([], map_application)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(ApplicationRow::into_model).collect()
        })
    }

    pub fn update_application(
        &self,
        id: Uuid,
        user_id: Uuid,
        event_id: Option<Uuid>,
    ) -> Result<Option<Application>> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE applications SET user_id = ?2, event_id = ?3 WHERE id = ?1",
                (id.to_string(), user_id.to_string(), event_id.map(|e| e.to_string())),
            )?)
        })?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_application(id)
    }

    pub fn delete_application(&self, id: Uuid) -> Result<bool> {
        self.delete_by_id("applications", id)
    }

    pub fn count_applications(&self) -> Result<usize> {
        self.count_rows("applications")
    }

    // -- Helpers --

    fn delete_by_id(&self, table: &'static str, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id.to_string()])?;
            Ok(n > 0)
        })
    }

    fn count_rows(&self, table: &'static str) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n as usize)
        })
    }
}

/// True if `err` came from a UNIQUE or other constraint violation.
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn load_user(conn: &Connection, row: UserRow) -> Result<User> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.name, r.description
         FROM roles_users ru
         JOIN roles r ON r.id = ru.role_id
         WHERE ru.user_id = ?1
         ORDER BY r.rowid",
    )?;
    let roles = stmt
        .query_map([&row.id], map_role)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    row.into_model(roles)
}

fn query_role_by_name(conn: &Connection, name: &str) -> Result<Option<RoleRow>> {
    conn.query_row(
        "SELECT id, name, description FROM roles WHERE name = ?1",
        [name],
        map_role,
    )
    .optional()
}

fn map_role(row: &Row<'_>) -> rusqlite::Result<RoleRow> {
    Ok(RoleRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        phone: row.get(5)?,
        birth_date: row.get(6)?,
        city: row.get(7)?,
        active: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn map_event(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        location: row.get(3)?,
        starts_on: row.get(4)?,
        ends_on: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_application(row: &Row<'_>) -> rusqlite::Result<ApplicationRow> {
    Ok(ApplicationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        event_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
