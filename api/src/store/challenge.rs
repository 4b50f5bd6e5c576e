use anyhow::Context;
use jiff::Timestamp;
use jiff_sqlx::{Timestamp as SqlxTs, ToSqlx};
use payloads::{
    ChallengeId, ChallengeResponse, ChallengeStatus, ChallengeType,
    OptionalTimestamp, UserId, UserIdentity, requests, responses,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use crate::activity::{self, ActivityWindow, Score};
use crate::rating::{Outcome, rate_pair};
use crate::store::{
    StoreError, login, map_open_pair_unique_error, map_row_not_found, ranking,
    workout,
};
use crate::time::TimeSource;

#[derive(Debug, Clone, FromRow)]
pub struct Challenge {
    pub id: ChallengeId,
    pub challenger_id: UserId,
    pub challenged_id: UserId,
    pub challenge_type: ChallengeType,
    pub title: String,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub duration_days: i32,
    pub status: ChallengeStatus,
    pub winner_id: Option<UserId>,
    pub challenger_result: f64,
    pub challenged_result: f64,
    pub challenger_rating_before: Option<i32>,
    pub challenged_rating_before: Option<i32>,
    pub challenger_rating_after: Option<i32>,
    pub challenged_rating_after: Option<i32>,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "OptionalTimestamp")]
    pub started_at: Option<Timestamp>,
    #[sqlx(try_from = "OptionalTimestamp")]
    pub completed_at: Option<Timestamp>,
}

#[derive(Debug, FromRow)]
struct ChallengeWithUsernames {
    #[sqlx(flatten)]
    challenge: Challenge,
    challenger_username: String,
    challenged_username: String,
}

impl From<ChallengeWithUsernames> for responses::Challenge {
    fn from(row: ChallengeWithUsernames) -> Self {
        let c = row.challenge;
        Self {
            challenge_id: c.id,
            challenger: UserIdentity {
                user_id: c.challenger_id,
                username: row.challenger_username,
            },
            challenged: UserIdentity {
                user_id: c.challenged_id,
                username: row.challenged_username,
            },
            challenge_type: c.challenge_type,
            title: c.title,
            description: c.description,
            target_value: c.target_value,
            duration_days: c.duration_days,
            status: c.status,
            winner_id: c.winner_id,
            challenger_result: c.challenger_result,
            challenged_result: c.challenged_result,
            challenger_rating_before: c.challenger_rating_before,
            challenged_rating_before: c.challenged_rating_before,
            challenger_rating_after: c.challenger_rating_after,
            challenged_rating_after: c.challenged_rating_after,
            created_at: c.created_at,
            started_at: c.started_at,
            completed_at: c.completed_at,
        }
    }
}

const SELECT_WITH_USERNAMES: &str = "
    SELECT c.*,
        challenger.username AS challenger_username,
        challenged.username AS challenged_username
    FROM challenges c
    JOIN users challenger ON challenger.id = c.challenger_id
    JOIN users challenged ON challenged.id = c.challenged_id";

async fn read_challenge_tx(
    challenge_id: &ChallengeId,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<responses::Challenge, StoreError> {
    let row = sqlx::query_as::<_, ChallengeWithUsernames>(&format!(
        "{SELECT_WITH_USERNAMES} WHERE c.id = $1;"
    ))
    .bind(challenge_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(map_row_not_found(StoreError::ChallengeNotFound))?;
    Ok(row.into())
}

/// Validated title and description, with a blank description dropped.
fn validate_text(
    title: &str,
    description: Option<&str>,
) -> Result<(String, Option<String>), StoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::EmptyField);
    }
    if title.chars().count() > requests::CHALLENGE_TITLE_MAX_LEN {
        return Err(StoreError::FieldTooLong);
    }
    let description = description.map(str::trim).filter(|d| !d.is_empty());
    if let Some(description) = description
        && description.chars().count()
            > requests::CHALLENGE_DESCRIPTION_MAX_LEN
    {
        return Err(StoreError::FieldTooLong);
    }
    Ok((title.to_string(), description.map(str::to_string)))
}

fn validate_duration(duration_days: Option<i32>) -> Result<i32, StoreError> {
    let duration_days =
        duration_days.unwrap_or(requests::DEFAULT_DURATION_DAYS);
    if !(1..=requests::MAX_DURATION_DAYS).contains(&duration_days) {
        return Err(StoreError::InvalidDuration);
    }
    Ok(duration_days)
}

/// Create a pending challenge from `challenger_id` to the named user.
///
/// Fails with `ChallengeConflict` when the two users already have a pending
/// or active challenge in either direction.
#[tracing::instrument(skip(details, pool, time_source))]
pub async fn create_challenge(
    challenger_id: &UserId,
    details: &requests::CreateChallenge,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::Challenge, StoreError> {
    let (title, description) =
        validate_text(&details.title, details.description.as_deref())?;
    let duration_days = validate_duration(details.duration_days)?;

    let mut tx = pool.begin().await?;

    let challenged =
        login::user_by_username_tx(&details.challenged_username, &mut tx)
            .await?;
    if challenged.id == *challenger_id {
        return Err(StoreError::SelfChallenge);
    }

    let open_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM challenges
            WHERE status IN ('pending', 'active')
              AND ((challenger_id = $1 AND challenged_id = $2)
                OR (challenger_id = $2 AND challenged_id = $1))
        );",
    )
    .bind(challenger_id)
    .bind(challenged.id)
    .fetch_one(&mut *tx)
    .await?;
    if open_exists {
        return Err(StoreError::ChallengeConflict);
    }

    // a concurrent create for the same pair fails on the partial unique index
    let challenge_id = sqlx::query_scalar::<_, ChallengeId>(
        "INSERT INTO challenges (
            challenger_id,
            challenged_id,
            challenge_type,
            title,
            description,
            target_value,
            duration_days,
            created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id;",
    )
    .bind(challenger_id)
    .bind(challenged.id)
    .bind(details.challenge_type)
    .bind(title)
    .bind(description)
    .bind(details.target_value)
    .bind(duration_days)
    .bind(time_source.now().to_sqlx())
    .fetch_one(&mut *tx)
    .await
    .map_err(map_open_pair_unique_error)?;

    let challenge = read_challenge_tx(&challenge_id, &mut tx).await?;
    tx.commit().await?;
    Ok(challenge)
}

/// Accept or decline a pending challenge addressed to `responder_id`.
///
/// Accepting snapshots both participants' current ratings; those snapshots
/// are what completion rates from.
#[tracing::instrument(skip(pool, time_source))]
pub async fn respond_to_challenge(
    responder_id: &UserId,
    challenge_id: &ChallengeId,
    response: ChallengeResponse,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::Challenge, StoreError> {
    let mut tx = pool.begin().await?;

    let challenge = sqlx::query_as::<_, Challenge>(
        "SELECT * FROM challenges
        WHERE id = $1 AND challenged_id = $2 AND status = 'pending'
        FOR UPDATE;",
    )
    .bind(challenge_id)
    .bind(responder_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::ChallengeNotFound)?;

    let now = time_source.now();
    match response {
        ChallengeResponse::Accept => {
            let challenger_ranking = ranking::get_or_create_ranking_tx(
                &challenge.challenger_id,
                now,
                &mut tx,
            )
            .await?;
            let challenged_ranking = ranking::get_or_create_ranking_tx(
                &challenge.challenged_id,
                now,
                &mut tx,
            )
            .await?;
            sqlx::query(
                "UPDATE challenges SET
                    status = 'active',
                    started_at = $2,
                    challenger_rating_before = $3,
                    challenged_rating_before = $4
                WHERE id = $1;",
            )
            .bind(challenge_id)
            .bind(now.to_sqlx())
            .bind(challenger_ranking.rating)
            .bind(challenged_ranking.rating)
            .execute(&mut *tx)
            .await?;
        }
        ChallengeResponse::Decline => {
            sqlx::query(
                "UPDATE challenges SET status = 'cancelled' WHERE id = $1;",
            )
            .bind(challenge_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    let challenge = read_challenge_tx(challenge_id, &mut tx).await?;
    tx.commit().await?;
    Ok(challenge)
}

async fn record_contributions_tx(
    challenge_id: &ChallengeId,
    user_id: &UserId,
    score: &Score,
    recorded_at: Timestamp,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), StoreError> {
    for (workout_id, value) in &score.contributions {
        sqlx::query(
            "INSERT INTO challenge_contributions (
                challenge_id,
                user_id,
                workout_id,
                contributed_value,
                recorded_at
            )
            VALUES ($1, $2, $3, $4, $5);",
        )
        .bind(challenge_id)
        .bind(user_id)
        .bind(workout_id)
        .bind(value)
        .bind(recorded_at.to_sqlx())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Score both participants over the challenge window, decide the winner and
/// apply the rating change to both rankings.
///
/// Only an active challenge can be completed, so a repeated call fails with
/// `ChallengeNotFound` and leaves the rankings alone.
#[tracing::instrument(skip(pool, time_source))]
pub async fn complete_challenge(
    challenge_id: &ChallengeId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::ChallengeResult, StoreError> {
    let mut tx = pool.begin().await?;

    let challenge = sqlx::query_as::<_, Challenge>(
        "SELECT * FROM challenges
        WHERE id = $1 AND status = 'active'
        FOR UPDATE;",
    )
    .bind(challenge_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::ChallengeNotFound)?;

    let started_at = challenge
        .started_at
        .context("Active challenge has no start time")?;
    let (challenger_before, challenged_before) = challenge
        .challenger_rating_before
        .zip(challenge.challenged_rating_before)
        .context("Active challenge has no rating snapshot")?;
    let window =
        ActivityWindow::for_challenge(started_at, challenge.duration_days)
            .context("Challenge window out of range")?;

    let challenger_workouts =
        workout::list_workouts(&challenge.challenger_id, &window, &mut tx)
            .await?;
    let challenged_workouts =
        workout::list_workouts(&challenge.challenged_id, &window, &mut tx)
            .await?;
    let challenger_score = activity::score(
        challenge.challenge_type,
        &window,
        &challenger_workouts,
    );
    let challenged_score = activity::score(
        challenge.challenge_type,
        &window,
        &challenged_workouts,
    );

    let challenger_outcome =
        Outcome::from_results(challenger_score.total, challenged_score.total);
    let challenged_outcome =
        Outcome::from_results(challenged_score.total, challenger_score.total);
    let winner_id = match challenger_outcome {
        Outcome::Win => Some(challenge.challenger_id),
        Outcome::Loss => Some(challenge.challenged_id),
        Outcome::Draw => None,
    };
    let (challenger_after, challenged_after) = rate_pair(
        challenger_before,
        challenged_before,
        challenger_score.total,
        challenged_score.total,
    );

    let now = time_source.now();
    sqlx::query(
        "UPDATE challenges SET
            status = 'completed',
            completed_at = $2,
            winner_id = $3,
            challenger_result = $4,
            challenged_result = $5,
            challenger_rating_after = $6,
            challenged_rating_after = $7
        WHERE id = $1;",
    )
    .bind(challenge_id)
    .bind(now.to_sqlx())
    .bind(winner_id)
    .bind(challenger_score.total)
    .bind(challenged_score.total)
    .bind(challenger_after)
    .bind(challenged_after)
    .execute(&mut *tx)
    .await?;

    // lock in ascending user id order so challenges sharing a user cannot
    // deadlock
    let mut participants = [
        (challenge.challenger_id, challenger_outcome, challenger_after),
        (challenge.challenged_id, challenged_outcome, challenged_after),
    ];
    participants.sort_by_key(|(user_id, _, _)| *user_id);
    for (user_id, outcome, new_rating) in participants {
        let current =
            ranking::get_ranking_for_update_tx(&user_id, now, &mut tx).await?;
        let standing = current.standing().record(outcome, new_rating);
        ranking::update_standing_tx(&user_id, &standing, now, &mut tx).await?;
    }

    record_contributions_tx(
        challenge_id,
        &challenge.challenger_id,
        &challenger_score,
        now,
        &mut tx,
    )
    .await?;
    record_contributions_tx(
        challenge_id,
        &challenge.challenged_id,
        &challenged_score,
        now,
        &mut tx,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        %challenge_id,
        challenger_result = challenger_score.total,
        challenged_result = challenged_score.total,
        challenger_after,
        challenged_after,
        "challenge completed"
    );

    Ok(responses::ChallengeResult {
        challenge_id: *challenge_id,
        challenger_result: challenger_score.total,
        challenged_result: challenged_score.total,
        winner_id,
        challenger_new_rating: challenger_after,
        challenged_new_rating: challenged_after,
    })
}

/// Every challenge the user took part in, newest first.
#[tracing::instrument(skip(pool))]
pub async fn list_user_challenges(
    user_id: &UserId,
    pool: &PgPool,
) -> Result<Vec<responses::Challenge>, StoreError> {
    let rows = sqlx::query_as::<_, ChallengeWithUsernames>(&format!(
        "{SELECT_WITH_USERNAMES}
        WHERE c.challenger_id = $1 OR c.challenged_id = $1
        ORDER BY c.created_at DESC;"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Most recently completed challenges, optionally only those `user_id`
/// took part in.
pub(super) async fn recent_completed(
    user_id: Option<&UserId>,
    limit: i64,
    pool: &PgPool,
) -> Result<Vec<responses::Challenge>, StoreError> {
    let rows = sqlx::query_as::<_, ChallengeWithUsernames>(&format!(
        "{SELECT_WITH_USERNAMES}
        WHERE c.status = 'completed'
          AND ($1::uuid IS NULL
            OR c.challenger_id = $1
            OR c.challenged_id = $1)
        ORDER BY c.completed_at DESC
        LIMIT $2;"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
