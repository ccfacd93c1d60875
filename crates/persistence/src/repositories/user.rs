//! User repository for database operations.
//!
//! Users are owned by the identity provider. Registration reads them in its
//! own transaction; this repository only provisions rows (seeding and tests).

use sqlx::PgPool;

use crate::entities::UserEntity;
use crate::metrics::QueryTimer;

/// Repository for user-related database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new UserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    pub async fn create_user(&self, name: &str, email: &str) -> Result<UserEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (name, email)
            VALUES ($1, $2)
            RETURNING id, name, email, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}
