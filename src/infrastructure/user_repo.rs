use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::{NewUser, ProfileChanges, Role, User};
use crate::schema::users;

use super::models::{NewUserRow, ProfileChangesRow, UserRow};

pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for DieselUserRepository {
    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        users::table
            .find(id)
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        users::table
            .filter(users::email.eq(email.to_lowercase()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(users::table)
            .values(&NewUserRow {
                id: user.id,
                email: user.email.to_lowercase(),
                password_hash: user.password_hash,
                name: user.name,
                phone: user.phone,
                address: user.address,
                role: user.role.as_str().to_string(),
            })
            .returning(UserRow::as_returning())
            .get_result(&mut conn)?
            .try_into()
    }

    fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        diesel::update(users::table.find(id))
            .set(&ProfileChangesRow::from(changes))
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn set_credentials(
        &self,
        id: Uuid,
        password_hash: String,
        role: Role,
    ) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        diesel::update(users::table.find(id))
            .set((
                users::password_hash.eq(password_hash),
                users::role.eq(role.as_str()),
                users::is_active.eq(true),
                users::updated_at.eq(Utc::now()),
            ))
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(User::try_from)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::DieselUserRepository;
    use crate::domain::errors::DomainError;
    use crate::domain::ports::UserRepository;
    use crate::domain::user::{NewUser, ProfileChanges, Role};
    use crate::infrastructure::test_support::setup_db;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: "Ana".to_string(),
            phone: None,
            address: None,
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn email_is_stored_lowercase_and_unique() {
        let (_container, pool) = setup_db().await;
        let repo = DieselUserRepository::new(pool);

        let user = repo.create(new_user("Ana@Example.com")).unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert!(repo.find_by_email("ANA@example.COM").unwrap().is_some());

        let err = repo.create(new_user("ana@example.com")).unwrap_err();
        assert!(
            matches!(&err, DomainError::Conflict(msg) if msg == "Email is already registered"),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn profile_update_leaves_missing_fields_alone() {
        let (_container, pool) = setup_db().await;
        let repo = DieselUserRepository::new(pool);
        let user = repo.create(new_user("ana@example.com")).unwrap();

        let updated = repo
            .update_profile(
                user.id,
                ProfileChanges {
                    phone: Some("1155550000".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .expect("user should exist");
        assert_eq!(updated.name, "Ana");
        assert_eq!(updated.phone.as_deref(), Some("1155550000"));
    }

    #[tokio::test]
    async fn set_credentials_promotes_to_admin() {
        let (_container, pool) = setup_db().await;
        let repo = DieselUserRepository::new(pool);
        let user = repo.create(new_user("boss@example.com")).unwrap();

        let admin = repo
            .set_credentials(user.id, "new-hash".to_string(), Role::Admin)
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.password_hash, "new-hash");
    }
}
