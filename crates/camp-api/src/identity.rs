use std::sync::Arc;

use anyhow::Result;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, info};

use camp_db::Database;
use camp_db::models::NewUser;
use camp_types::api::Claims;
use camp_types::models::{Role, User};

use crate::error::AppError;

/// Fields accepted when an account is created.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// User store, password hashing and session tokens.
pub struct IdentityProvider {
    db: Arc<Database>,
    hasher: Argon2<'static>,
    jwt_secret: String,
}

impl IdentityProvider {
    pub fn new(db: Arc<Database>, jwt_secret: String, hasher: Argon2<'static>) -> Self {
        Self {
            db,
            hasher,
            jwt_secret,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();
        Ok(hash)
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .and_then(|parsed| self.hasher.verify_password(password.as_bytes(), &parsed))
            .is_ok()
    }

    /// Creates an active account holding `roles`. A taken email is a conflict.
    pub fn create_user(&self, account: NewAccount, roles: &[Role]) -> Result<User, AppError> {
        if self.db.get_user_by_email(&account.email)?.is_some() {
            return Err(AppError::Conflict(format!(
                "Email '{}' is already registered",
                account.email
            )));
        }

        let new = NewUser {
            password_hash: self.hash_password(&account.password)?,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            active: true,
        };
        let role_ids: Vec<_> = roles.iter().map(|r| r.id).collect();
        let user = self.db.create_user(&new, &role_ids)?;

        debug!("Created user {} with {} role(s)", user.email, role_ids.len());
        Ok(user)
    }

    pub fn find_user(&self, email: &str) -> Result<Option<User>> {
        self.db.get_user_by_email(email)
    }

    /// Checks credentials. Unknown emails, wrong passwords and inactive
    /// accounts are indistinguishable to the caller.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let (user, hash) = self
            .db
            .get_user_with_password(email)?
            .ok_or(AppError::InvalidCredentials)?;

        if !self.verify_password(password, &hash) || !user.active {
            return Err(AppError::InvalidCredentials);
        }
        Ok(user)
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Resolves a session token to an active user. Bad or expired tokens and
    /// deactivated or deleted accounts yield `None`.
    pub fn current_user(&self, token: &str) -> Result<Option<User>> {
        let claims = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("Rejected session token: {}", e);
                return Ok(None);
            }
        };

        Ok(self.db.get_user(claims.sub)?.filter(|u| u.active))
    }

    pub fn has_role(&self, user: &User, role: &str) -> bool {
        user.has_role(role)
    }

    pub fn find_or_create_role(&self, name: &str) -> Result<Role> {
        self.db.find_or_create_role(name)
    }

    /// Grants `role` to `user`, creating the role on first use.
    /// Returns false when the user already held it.
    pub fn assign_role(&self, user: &User, role: &str) -> Result<bool> {
        let role = self.find_or_create_role(role)?;
        let added = self.db.add_role_to_user(user.id, role.id)?;
        if added {
            info!("Granted role '{}' to {}", role.name, user.email);
        }
        Ok(added)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use argon2::{Algorithm, Params, Version};

    pub(crate) fn cheap_hasher() -> Argon2<'static> {
        Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(Params::MIN_M_COST, 1, 1, None).unwrap(),
        )
    }

    pub(crate) fn provider() -> IdentityProvider {
        let db = Arc::new(Database::open_in_memory().unwrap());
        IdentityProvider::new(db, "test-secret".into(), cheap_hasher())
    }

    fn account(email: &str) -> NewAccount {
        NewAccount {
            email: email.into(),
            password: "correct horse".into(),
            ..Default::default()
        }
    }

    #[test]
    fn authenticate_checks_password() {
        let idp = provider();
        idp.create_user(account("a@example.com"), &[]).unwrap();

        assert!(idp.authenticate("a@example.com", "correct horse").is_ok());
        assert!(matches!(
            idp.authenticate("a@example.com", "wrong"),
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            idp.authenticate("nobody@example.com", "correct horse"),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn hashes_are_salted_per_call() {
        let idp = provider();
        let first = idp.hash_password("correct horse").unwrap();
        let second = idp.hash_password("correct horse").unwrap();

        assert_ne!(first, second);
        assert!(idp.verify_password("correct horse", &first));
        assert!(idp.verify_password("correct horse", &second));
    }

    #[test]
    fn duplicate_email_is_conflict() {
        let idp = provider();
        idp.create_user(account("a@example.com"), &[]).unwrap();
        assert!(matches!(
            idp.create_user(account("a@example.com"), &[]),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn token_round_trips_to_current_user() {
        let idp = provider();
        let user = idp.create_user(account("a@example.com"), &[]).unwrap();
        let token = idp.issue_token(&user).unwrap();

        let current = idp.current_user(&token).unwrap().unwrap();
        assert_eq!(current.id, user.id);
        assert!(idp.current_user("not-a-token").unwrap().is_none());
    }

    #[test]
    fn assign_role_reports_first_grant_only() {
        let idp = provider();
        let user = idp.create_user(account("a@example.com"), &[]).unwrap();

        assert!(idp.assign_role(&user, "участник").unwrap());
        assert!(!idp.assign_role(&user, "участник").unwrap());

        let user = idp.find_user("a@example.com").unwrap().unwrap();
        assert!(idp.has_role(&user, "участник"));
    }
}
