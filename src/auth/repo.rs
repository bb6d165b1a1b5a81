use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::accounts::repo as accounts_repo;
use crate::auth::repo_types::{NewUser, User};

/// True when a unique constraint rejected the write, e.g. an email
/// registered concurrently after the existence check.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    })
}

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, email, password_hash, created_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create the user together with its ledger account and node account.
    pub async fn create_with_accounts(db: &PgPool, new: &NewUser<'_>) -> anyhow::Result<User> {
        let mut tx = db.begin().await.context("begin tx")?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(new.email)
        .bind(new.password_hash)
        .fetch_one(&mut *tx)
        .await
        .context("insert user")?;

        accounts_repo::insert_account_tx(&mut tx, user.id, new.ledger_address).await?;
        accounts_repo::insert_eth_account_tx(&mut tx, user.id, new.eth_address, new.eth_password)
            .await?;

        tx.commit().await.context("commit tx")?;
        Ok(user)
    }
}
