use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Identity, NewUser, UserStore, UserStoreError};

const UNIQUE_VIOLATION: &str = "23505";

/// `users` table access over a Postgres pool
#[derive(Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Identity, UserStoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, String)>(
            "SELECT id, username, password_hash, role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Query find_by_username failed");
            UserStoreError::Database(e.to_string())
        })?;

        let (id, username, password_hash, role) = row.ok_or(UserStoreError::NotFound)?;
        Ok(Identity {
            id: id.to_string(),
            username,
            password_hash,
            role,
        })
    }

    async fn create(&self, user: NewUser) -> Result<String, UserStoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, email, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.role)
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(id.to_string())
    }
}

fn map_insert_error(err: sqlx::Error) -> UserStoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            match db_err.constraint() {
                Some("users_username_key") => return UserStoreError::AlreadyExists("username"),
                Some("users_email_key") => return UserStoreError::AlreadyExists("email"),
                _ => {}
            }
        }
    }
    tracing::error!(error = %err, "Query create user failed");
    UserStoreError::Database(err.to_string())
}
