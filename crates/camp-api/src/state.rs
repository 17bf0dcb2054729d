use std::sync::Arc;

use argon2::Argon2;
use tracing::error;

use camp_db::Database;

use crate::admin::{self, AdminConsole};
use crate::error::AppError;
use crate::identity::IdentityProvider;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub identity: IdentityProvider,
    pub admin: AdminConsole,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: String) -> AppState {
        Self::with_hasher(db, jwt_secret, Argon2::default())
    }

    /// Same as [`AppStateInner::new`] with a caller-chosen argon2 configuration.
    pub fn with_hasher(db: Database, jwt_secret: String, hasher: Argon2<'static>) -> AppState {
        let db = Arc::new(db);
        Arc::new(Self {
            identity: IdentityProvider::new(db.clone(), jwt_secret, hasher),
            admin: admin::default_console(),
            db,
        })
    }
}

/// Runs blocking database work off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&AppStateInner) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal(e.into())
        })?
}
