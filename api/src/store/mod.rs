//! Database store for the challenge and ranking engine.
//!
//! ## Design Decisions
//!
//! ### Transactions
//! - **One transaction per mutation**: creating, answering and completing a
//!   challenge each run in a single transaction. Errors propagate with `?`,
//!   which drops the transaction and rolls everything back.
//! - **Row locks**: the challenge row is locked with `FOR UPDATE` filtered by
//!   the status the operation requires, so a second concurrent call waits
//!   and then finds nothing. Ranking rows are locked in ascending user id
//!   order.
//!
//! ### Time Source Dependency
//! - Functions that stamp rows accept a `TimeSource` so tests can move the
//!   clock across a challenge window.
//!
//! ### Computed Tier
//! - `user_rankings.tier` is kept up to date on every write, but responses
//!   always derive the tier from the rating with [`crate::rating::tier_for`].

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTs;
use sqlx::FromRow;

use payloads::UserId;

pub mod challenge;
pub mod login;
pub mod ranking;
pub mod workout;

pub use challenge::{
    complete_challenge, create_challenge, list_user_challenges,
    respond_to_challenge,
};
pub use login::{create_user, find_user_by_username, read_user};
pub use ranking::{
    get_leaderboard, get_or_create_ranking, get_profile, get_ranking_stats,
};

/// A complete user row that stays in the backend.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("User not found")]
    UserNotFound,
    #[error("Challenge not found")]
    ChallengeNotFound,
    #[error("Cannot challenge yourself")]
    SelfChallenge,
    #[error(
        "Challenge duration must be between 1 and {} days",
        payloads::requests::MAX_DURATION_DAYS
    )]
    InvalidDuration,
    #[error("Field must not be empty")]
    EmptyField,
    #[error("Field too long")]
    FieldTooLong,
    #[error("A pending or active challenge already exists between these users")]
    ChallengeConflict,
    #[error("{0}")]
    InvalidUsername(String),
    #[error("Unique constraint violation")]
    NotUnique(#[source] sqlx::Error),
    #[error("Database error")]
    Database(#[source] sqlx::Error),
    #[error("Unexpected error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e
            && db_err.is_unique_violation()
        {
            return StoreError::NotUnique(e);
        }
        StoreError::Database(e)
    }
}

/// Map the open-pair index violation raised by a racing create to the same
/// error the application check returns.
fn map_open_pair_unique_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
        && db_err.constraint() == Some("challenges_open_pair_unique")
    {
        return StoreError::ChallengeConflict;
    }
    e.into()
}

/// Map a missing row to `not_found`, everything else through `From`.
fn map_row_not_found(
    not_found: StoreError,
) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| match e {
        sqlx::Error::RowNotFound => not_found,
        e => e.into(),
    }
}
