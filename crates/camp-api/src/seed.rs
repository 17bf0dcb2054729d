//! Debug-only sample data. Destroys whatever the database held before.

use anyhow::Result;
use rand::Rng;
use tracing::info;

use camp_types::models::{SUPERUSER_ROLE, USER_ROLE};

use crate::identity::{IdentityProvider, NewAccount};

pub const ADMIN_EMAIL: &str = "admin";
const ADMIN_PASSWORD: &str = "admin";
const PASSWORD_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const PASSWORD_LEN: usize = 10;

pub const SAMPLE_NAMES: &[(&str, &str)] = &[
    ("Harry", "Brown"),
    ("Amelia", "Smith"),
    ("Oliver", "Patel"),
    ("Jack", "Jones"),
    ("Isabella", "Williams"),
    ("Charlie", "Johnson"),
    ("Sophie", "Taylor"),
    ("Mia", "Thomas"),
    ("Jacob", "Roberts"),
    ("Thomas", "Khan"),
    ("Emily", "Lewis"),
    ("Lily", "Jackson"),
    ("Ava", "Clarke"),
    ("Isla", "James"),
    ("Alfie", "Phillips"),
    ("Olivia", "Wilson"),
    ("Jessica", "Ali"),
    ("Riley", "Mason"),
    ("William", "Mitchell"),
    ("James", "Rose"),
    ("Geoffrey", "Davis"),
    ("Lisa", "Davies"),
    ("Benjamin", "Rodriguez"),
    ("Stacey", "Cox"),
    ("Lucy", "Alexander"),
];

fn random_password(rng: &mut impl Rng) -> String {
    (0..PASSWORD_LEN)
        .map(|_| PASSWORD_CHARSET[rng.random_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}

/// Drops and recreates every table, then creates the `user` and `superuser`
/// roles, the admin account and one `user` per name pair.
pub fn build_sample_db(idp: &IdentityProvider, names: &[(&str, &str)]) -> Result<()> {
    idp.db().reset()?;

    let user_role = idp.db().create_role(USER_ROLE, None)?;
    let super_role = idp.db().create_role(SUPERUSER_ROLE, None)?;

    idp.create_user(
        NewAccount {
            email: ADMIN_EMAIL.into(),
            password: ADMIN_PASSWORD.into(),
            first_name: Some("Admin".into()),
            last_name: None,
        },
        &[user_role.clone(), super_role],
    )?;

    let mut rng = rand::rng();
    for (first, last) in names {
        idp.create_user(
            NewAccount {
                email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
                password: random_password(&mut rng),
                first_name: Some(first.to_string()),
                last_name: Some(last.to_string()),
            },
            std::slice::from_ref(&user_role),
        )?;
    }

    info!("Sample database built: admin + {} users", names.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::tests::provider;

    const NAMES: &[(&str, &str)] = &[("Harry", "Brown"), ("Amelia", "Smith"), ("Oliver", "Patel")];

    #[test]
    fn seeding_twice_gives_same_shape() {
        let idp = provider();
        for _ in 0..2 {
            build_sample_db(&idp, NAMES).unwrap();

            assert_eq!(idp.db().count_roles().unwrap(), 2);
            assert_eq!(idp.db().count_users().unwrap(), 1 + NAMES.len());

            let admin = idp.find_user(ADMIN_EMAIL).unwrap().unwrap();
            assert!(admin.has_role(USER_ROLE));
            assert!(admin.has_role(SUPERUSER_ROLE));
        }
    }

    #[test]
    fn sample_users_only_hold_user_role() {
        let idp = provider();
        build_sample_db(&idp, NAMES).unwrap();

        let amelia = idp.find_user("amelia.smith@example.com").unwrap().unwrap();
        assert_eq!(amelia.roles.len(), 1);
        assert!(amelia.has_role(USER_ROLE));
        assert!(idp.authenticate(ADMIN_EMAIL, "admin").is_ok());
    }

    #[test]
    fn random_passwords_use_lowercase_and_digits() {
        let pw = random_password(&mut rand::rng());
        assert_eq!(pw.len(), PASSWORD_LEN);
        assert!(pw.bytes().all(|b| PASSWORD_CHARSET.contains(&b)));
    }

    #[test]
    fn default_name_list_has_25_pairs() {
        assert_eq!(SAMPLE_NAMES.len(), 25);
    }
}
