//! Types shared between the ranking api and its clients.
//!
//! Everything that crosses the wire lives here: id wrappers, the closed
//! enums for challenge type, status and tier, and the request/response
//! bodies. With the `use-sqlx` feature the same types decode straight from
//! Postgres rows.

pub mod api_client;
pub mod requests;
pub mod responses;

pub use api_client::{APIClient, ClientError};

use derive_more::Display;
#[cfg(feature = "use-sqlx")]
use jiff::Timestamp;
#[cfg(feature = "use-sqlx")]
use jiff_sqlx::Timestamp as SqlxTs;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Id type wrapper helps ensure we don't mix up ids for different tables.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    Serialize,
    Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct UserId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct ChallengeId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct WorkoutId(pub Uuid);

/// What a challenge is scored on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "challenge_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    /// Number of workout sessions logged.
    #[display("workout_count")]
    WorkoutCount,
    /// Sum of `sets * reps` over every exercise.
    #[display("total_reps")]
    TotalReps,
    /// Sum of workout durations, in minutes.
    #[display("duration")]
    Duration,
    /// Sum of `weight * sets * reps` over exercises with a recorded weight.
    #[display("weight_lifted")]
    WeightLifted,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "challenge_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    #[display("pending")]
    Pending,
    #[display("active")]
    Active,
    #[display("completed")]
    Completed,
    #[display("cancelled")]
    Cancelled,
}

/// Coarse rating bucket. Variants are declared from lowest to highest so the
/// derived ordering follows rating.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    Serialize,
    Deserialize,
)]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "ranking_tier", rename_all = "lowercase")
)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl Tier {
    /// All tiers, highest first.
    pub const DESCENDING: [Tier; 5] = [
        Tier::Diamond,
        Tier::Platinum,
        Tier::Gold,
        Tier::Silver,
        Tier::Bronze,
    ];
}

/// The challenged user's answer to a pending challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeResponse {
    Accept,
    Decline,
}

/// Decode helper for nullable timestamp columns.
#[cfg(feature = "use-sqlx")]
#[derive(sqlx::Type)]
#[sqlx(transparent)]
pub struct OptionalTimestamp(Option<SqlxTs>);

#[cfg(feature = "use-sqlx")]
impl From<OptionalTimestamp> for Option<Timestamp> {
    fn from(x: OptionalTimestamp) -> Option<Timestamp> {
        x.0.map(|x| x.to_jiff())
    }
}

/// User identification bundled with display information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: UserId,
    pub username: String,
}
