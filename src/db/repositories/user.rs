use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set, SqlErr, TransactionTrait,
};

use crate::entities::users;

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_changed: bool,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            password_changed: model.password_changed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub password_changed: bool,
}

/// Result of a case-insensitive uniqueness check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Existence {
    pub username_taken: bool,
    pub email_taken: bool,
}

impl Existence {
    #[must_use]
    pub const fn any(self) -> bool {
        self.username_taken || self.email_taken
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInsert {
    Created(i32),
    /// A unique constraint rejected the row (lost a registration race).
    Duplicate,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get user by username together with the stored password hash
    pub async fn get_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    pub async fn get_password_hash(&self, id: i32) -> Result<Option<String>> {
        let hash = users::Entity::find_by_id(id)
            .select_only()
            .column(users::Column::PasswordHash)
            .into_tuple::<String>()
            .one(&self.conn)
            .await
            .context("Failed to query password hash")?;

        Ok(hash)
    }

    /// Both lookups run inside one transaction so they see the same snapshot.
    pub async fn username_or_email_exists(&self, username: &str, email: &str) -> Result<Existence> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to begin existence check")?;

        let username_taken = users::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(users::Column::Username)))
                    .eq(username.to_lowercase()),
            )
            .count(&txn)
            .await
            .context("Failed to check username")?
            > 0;

        let email_taken = users::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(users::Column::Email))).eq(email.to_lowercase()),
            )
            .count(&txn)
            .await
            .context("Failed to check email")?
            > 0;

        txn.commit()
            .await
            .context("Failed to commit existence check")?;

        Ok(Existence {
            username_taken,
            email_taken,
        })
    }

    pub async fn create(&self, user: NewUser) -> Result<UserInsert> {
        let active = users::ActiveModel {
            username: Set(user.username),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            password_changed: Set(user.password_changed),
            ..Default::default()
        };

        match users::Entity::insert(active).exec(&self.conn).await {
            Ok(res) => Ok(UserInsert::Created(res.last_insert_id)),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(UserInsert::Duplicate)
            }
            Err(e) => Err(e).context("Failed to insert user"),
        }
    }

    /// Stores a new hash and marks the password as changed by its owner
    pub async fn update_password(&self, id: i32, password_hash: String) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.password_changed = Set(true);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// `None` when the user no longer exists
    pub async fn password_changed(&self, id: i32) -> Result<Option<bool>> {
        let changed = users::Entity::find_by_id(id)
            .select_only()
            .column(users::Column::PasswordChanged)
            .into_tuple::<bool>()
            .one(&self.conn)
            .await
            .context("Failed to query password state")?;

        Ok(changed)
    }

    pub async fn force_reset_all(&self) -> Result<u64> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::PasswordChanged, Expr::value(false))
            .exec(&self.conn)
            .await
            .context("Failed to flag users for password reset")?;

        Ok(result.rows_affected)
    }

    pub async fn count(&self) -> Result<u64> {
        users::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }
}
