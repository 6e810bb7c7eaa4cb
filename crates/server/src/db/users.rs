//! User repository for database operations.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use shopdesk_core::{Email, UserId};

use super::{RepositoryError, UserStore, map_unique_violation};
use crate::models::{NewUser, User};

macro_rules! user_columns {
    () => {
        "id, name, email, password_hash, is_admin, created_at, updated_at"
    };
}

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    password_hash: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            email,
            password_hash: row.password_hash,
            is_admin: row.is_admin,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}

impl UserStore for UserRepository<'_> {
    fn get_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send {
        async move {
            let row = sqlx::query_as::<_, UserRow>(concat!(
                "SELECT ",
                user_columns!(),
                " FROM users WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

            row.map(TryInto::try_into).transpose()
        }
    }

    fn list_all(&self) -> impl Future<Output = Result<Vec<User>, RepositoryError>> + Send {
        async move {
            let rows = sqlx::query_as::<_, UserRow>(concat!(
                "SELECT ",
                user_columns!(),
                " FROM users ORDER BY created_at DESC, id DESC"
            ))
            .fetch_all(self.pool)
            .await?;

            rows.into_iter().map(TryInto::try_into).collect()
        }
    }

    fn create(&self, user: NewUser) -> impl Future<Output = Result<User, RepositoryError>> + Send {
        async move {
            let row = sqlx::query_as::<_, UserRow>(concat!(
                "INSERT INTO users (name, email, password_hash, is_admin) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING ",
                user_columns!()
            ))
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.is_admin)
            .fetch_one(self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "email already exists"))?;

            row.try_into()
        }
    }

    fn set_admin(
        &self,
        id: UserId,
        is_admin: bool,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send {
        async move {
            let row = sqlx::query_as::<_, UserRow>(concat!(
                "UPDATE users SET is_admin = $2, updated_at = NOW() WHERE id = $1 RETURNING ",
                user_columns!()
            ))
            .bind(id)
            .bind(is_admin)
            .fetch_optional(self.pool)
            .await?;

            row.ok_or(RepositoryError::NotFound)?.try_into()
        }
    }

    fn delete_non_admin(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        async move {
            let result = sqlx::query("DELETE FROM users WHERE id = $1 AND is_admin = FALSE")
                .bind(id)
                .execute(self.pool)
                .await?;

            if result.rows_affected() > 0 {
                return Ok(());
            }

            let is_admin: Option<bool> =
                sqlx::query_scalar("SELECT is_admin FROM users WHERE id = $1")
                    .bind(id)
                    .fetch_optional(self.pool)
                    .await?;

            match is_admin {
                Some(_) => Err(RepositoryError::Conflict(
                    "admin accounts cannot be deleted".to_owned(),
                )),
                None => Err(RepositoryError::NotFound),
            }
        }
    }
}
