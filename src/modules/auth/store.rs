use async_trait::async_trait;
use shelf_db::StoreResult;
use sqlx::PgPool;

use super::models::{NewUser, PublicUser, UserCredentials};

/// Persistence for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// True when any user already has this email or this username.
    async fn exists_by_email_or_username(&self, email: &str, username: &str) -> StoreResult<bool>;

    async fn insert(&self, user: NewUser) -> StoreResult<PublicUser>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserCredentials>>;
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn exists_by_email_or_username(&self, email: &str, username: &str) -> StoreResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 OR username = $2)",
        )
        .bind(email)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert(&self, user: NewUser) -> StoreResult<PublicUser> {
        let created = sqlx::query_as::<_, PublicUser>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, created_at
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, username, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credentials)
    }
}
