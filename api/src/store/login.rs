use jiff_sqlx::ToSqlx;
use payloads::UserId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::store::{StoreError, User, map_row_not_found};
use crate::time::TimeSource;

/// Create a new user as would happen during signup.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
    time_source: &TimeSource,
) -> Result<User, StoreError> {
    let validation = payloads::requests::validate_username(username);
    if let Some(error_message) = validation.error_message() {
        return Err(StoreError::InvalidUsername(error_message.to_string()));
    }
    if email.len() > payloads::requests::EMAIL_MAX_LEN {
        return Err(StoreError::FieldTooLong);
    }
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (
                username,
                email,
                password_hash,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *;",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(time_source.now().to_sqlx())
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn read_user(pool: &PgPool, id: &UserId) -> Result<User, StoreError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1;")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(map_row_not_found(StoreError::UserNotFound))
}

pub async fn find_user_by_username(
    username: &str,
    pool: &PgPool,
) -> Result<Option<User>, StoreError> {
    let user =
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1;")
            .bind(username)
            .fetch_optional(pool)
            .await?;
    Ok(user)
}

/// Resolve a username inside an open transaction.
pub(super) async fn user_by_username_tx(
    username: &str,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<User, StoreError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1;")
        .bind(username)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_row_not_found(StoreError::UserNotFound))
}
