use anyhow::Context;
use axum::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{auth::password::hash_password, db::PgStore};

use super::repo_types::{NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write; carries the offending field.
    #[error("duplicate {0}")]
    Duplicate(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for user records.
///
/// Implementations own password hashing: `create` and `set_password` take
/// plaintext and must store only the hash.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_by_username(&self, user_name: &str) -> StoreResult<Option<User>>;
    /// Matches a user whose email OR username equals the given value; `None` never matches.
    async fn find_by_email_or_username(
        &self,
        email: Option<&str>,
        user_name: Option<&str>,
    ) -> StoreResult<Option<User>>;
    async fn create(&self, new_user: NewUser) -> StoreResult<User>;
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<()>;
    /// Replaces the refresh token only if it still equals `expected`; returns whether it did.
    async fn rotate_refresh_token(&self, id: Uuid, expected: &str, next: &str) -> StoreResult<bool>;
    async fn set_password(&self, id: Uuid, plain: &str) -> StoreResult<()>;
    async fn update_account(&self, id: Uuid, full_name: &str, email: &str) -> StoreResult<Option<User>>;
    async fn set_avatar(&self, id: Uuid, url: &str) -> StoreResult<Option<User>>;
    async fn set_cover_image(&self, id: Uuid, url: &str) -> StoreResult<Option<User>>;
}

fn write_error(e: sqlx::Error, what: &'static str) -> StoreError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(c) if c.contains("email") => "email",
                Some(c) if c.contains("user_name") => "username",
                _ => "email or username",
            };
            return StoreError::Duplicate(field);
        }
    }
    StoreError::Backend(anyhow::Error::new(e).context(what))
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, user_name, email, full_name, password_hash, avatar, cover_image,
                   refresh_token, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_username(&self, user_name: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, user_name, email, full_name, password_hash, avatar, cover_image,
                   refresh_token, created_at, updated_at
            FROM users
            WHERE user_name = $1
            "#,
        )
        .bind(user_name)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    async fn find_by_email_or_username(
        &self,
        email: Option<&str>,
        user_name: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, user_name, email, full_name, password_hash, avatar, cover_image,
                   refresh_token, created_at, updated_at
            FROM users
            WHERE email = $1 OR user_name = $2
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(user_name)
        .fetch_optional(&self.db)
        .await
        .context("find user by email or username")?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> StoreResult<User> {
        let hash = hash_password(&new_user.password).await?;
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_name, email, full_name, password_hash, avatar, cover_image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_name, email, full_name, password_hash, avatar, cover_image,
                      refresh_token, created_at, updated_at
            "#,
        )
        .bind(&new_user.user_name)
        .bind(&new_user.email)
        .bind(&new_user.full_name)
        .bind(&hash)
        .bind(&new_user.avatar)
        .bind(&new_user.cover_image)
        .fetch_one(&self.db)
        .await
        .map_err(|e| write_error(e, "insert user"))
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<()> {
        sqlx::query("UPDATE users SET refresh_token = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.db)
            .await
            .context("set refresh token")?;
        Ok(())
    }

    async fn rotate_refresh_token(&self, id: Uuid, expected: &str, next: &str) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users SET refresh_token = $3, updated_at = now()
            WHERE id = $1 AND refresh_token = $2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(next)
        .execute(&self.db)
        .await
        .context("rotate refresh token")?;
        Ok(res.rows_affected() == 1)
    }

    async fn set_password(&self, id: Uuid, plain: &str) -> StoreResult<()> {
        let hash = hash_password(plain).await?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(&hash)
            .execute(&self.db)
            .await
            .context("set password")?;
        Ok(())
    }

    async fn update_account(&self, id: Uuid, full_name: &str, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET full_name = $2, email = $3, updated_at = now()
            WHERE id = $1
            RETURNING id, user_name, email, full_name, password_hash, avatar, cover_image,
                      refresh_token, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| write_error(e, "update account"))
    }

    async fn set_avatar(&self, id: Uuid, url: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET avatar = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, user_name, email, full_name, password_hash, avatar, cover_image,
                      refresh_token, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(url)
        .fetch_optional(&self.db)
        .await
        .context("set avatar")?;
        Ok(user)
    }

    async fn set_cover_image(&self, id: Uuid, url: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET cover_image = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, user_name, email, full_name, password_hash, avatar, cover_image,
                      refresh_token, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(url)
        .fetch_optional(&self.db)
        .await
        .context("set cover image")?;
        Ok(user)
    }
}
