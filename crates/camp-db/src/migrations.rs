use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS roles (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            first_name  TEXT,
            last_name   TEXT,
            phone       TEXT,
            birth_date  TEXT,
            city        TEXT,
            active      INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS roles_users (
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            role_id     TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
            PRIMARY KEY (user_id, role_id)
        );

        CREATE TABLE IF NOT EXISTS events (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT,
            location    TEXT,
            starts_on   TEXT,
            ends_on     TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS applications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            event_id    TEXT REFERENCES events(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- UNIQUE(user_id, event_id) would let NULL events repeat
        CREATE UNIQUE INDEX IF NOT EXISTS idx_applications_user_event
            ON applications(user_id, IFNULL(event_id, ''));

        CREATE INDEX IF NOT EXISTS idx_applications_user
            ON applications(user_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

/// Drops all application tables, children first.
pub fn drop_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS applications;
        DROP TABLE IF EXISTS roles_users;
        DROP TABLE IF EXISTS events;
        DROP TABLE IF EXISTS users;
        DROP TABLE IF EXISTS roles;
        ",
    )?;

    info!("Dropped all tables");
    Ok(())
}
