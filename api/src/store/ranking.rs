use std::collections::BTreeMap;

use jiff::Timestamp;
use jiff_sqlx::{Timestamp as SqlxTs, ToSqlx};
use payloads::{
    OptionalTimestamp, Tier, UserId, UserIdentity, requests, responses,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use crate::rating::{Standing, tier_for};
use crate::store::{StoreError, challenge, map_row_not_found};
use crate::time::TimeSource;

const TOP_CHALLENGERS_LIMIT: i64 = 10;
const RECENT_CHALLENGES_LIMIT: i64 = 10;
const PROFILE_RECENT_MATCHES_LIMIT: i64 = 5;

#[derive(Debug, Clone, FromRow)]
pub struct UserRanking {
    pub user_id: UserId,
    pub rating: i32,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub total_matches: i32,
    pub current_streak: i32,
    pub best_streak: i32,
    /// Cached at write time. Read [`UserRanking::standing`] for the tier.
    pub tier: Tier,
    #[sqlx(try_from = "OptionalTimestamp")]
    pub last_match_at: Option<Timestamp>,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

impl UserRanking {
    pub fn standing(&self) -> Standing {
        Standing {
            rating: self.rating,
            wins: self.wins,
            losses: self.losses,
            draws: self.draws,
            total_matches: self.total_matches,
            current_streak: self.current_streak,
            best_streak: self.best_streak,
        }
    }

    fn into_response(self, username: String) -> responses::Ranking {
        responses::Ranking {
            user: UserIdentity {
                user_id: self.user_id,
                username,
            },
            rating: self.rating,
            tier: tier_for(self.rating),
            wins: self.wins,
            losses: self.losses,
            draws: self.draws,
            total_matches: self.total_matches,
            current_streak: self.current_streak,
            best_streak: self.best_streak,
            last_match_at: self.last_match_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RankingWithUsername {
    #[sqlx(flatten)]
    ranking: UserRanking,
    username: String,
}

impl From<RankingWithUsername> for responses::Ranking {
    fn from(row: RankingWithUsername) -> Self {
        row.ranking.into_response(row.username)
    }
}

#[derive(Debug, FromRow)]
struct LeaderboardRow {
    #[sqlx(flatten)]
    ranking: UserRanking,
    username: String,
    position: i64,
}

/// Insert a default ranking if the user has none yet.
pub(super) async fn ensure_ranking_tx(
    user_id: &UserId,
    now: Timestamp,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO user_rankings (user_id, created_at, updated_at)
        VALUES ($1, $2, $2)
        ON CONFLICT (user_id) DO NOTHING;",
    )
    .bind(user_id)
    .bind(now.to_sqlx())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// The user's ranking, created with the defaults on first access.
pub(super) async fn get_or_create_ranking_tx(
    user_id: &UserId,
    now: Timestamp,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<UserRanking, StoreError> {
    ensure_ranking_tx(user_id, now, tx).await?;
    sqlx::query_as::<_, UserRanking>(
        "SELECT * FROM user_rankings WHERE user_id = $1;",
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(map_row_not_found(StoreError::UserNotFound))
}

/// Lock a ranking row until the transaction ends.
///
/// Callers locking several rows must do so in ascending user id order.
pub(super) async fn get_ranking_for_update_tx(
    user_id: &UserId,
    now: Timestamp,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<UserRanking, StoreError> {
    ensure_ranking_tx(user_id, now, tx).await?;
    sqlx::query_as::<_, UserRanking>(
        "SELECT * FROM user_rankings WHERE user_id = $1 FOR UPDATE;",
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(map_row_not_found(StoreError::UserNotFound))
}

/// Write a standing back after a finished challenge.
pub(super) async fn update_standing_tx(
    user_id: &UserId,
    standing: &Standing,
    match_at: Timestamp,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE user_rankings SET
            rating = $2,
            wins = $3,
            losses = $4,
            draws = $5,
            total_matches = $6,
            current_streak = $7,
            best_streak = $8,
            tier = $9,
            last_match_at = $10,
            updated_at = $10
        WHERE user_id = $1;",
    )
    .bind(user_id)
    .bind(standing.rating)
    .bind(standing.wins)
    .bind(standing.losses)
    .bind(standing.draws)
    .bind(standing.total_matches)
    .bind(standing.current_streak)
    .bind(standing.best_streak)
    .bind(standing.tier())
    .bind(match_at.to_sqlx())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[tracing::instrument(skip(pool, time_source))]
pub async fn get_or_create_ranking(
    user_id: &UserId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<UserRanking, StoreError> {
    let mut tx = pool.begin().await?;
    let ranking =
        get_or_create_ranking_tx(user_id, time_source.now(), &mut tx).await?;
    tx.commit().await?;
    Ok(ranking)
}

/// 1 + the number of users rated strictly higher. Equal ratings share a
/// position.
pub async fn position(rating: i32, pool: &PgPool) -> Result<i64, StoreError> {
    let higher = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM user_rankings WHERE rating > $1;",
    )
    .bind(rating)
    .fetch_one(pool)
    .await?;
    Ok(higher + 1)
}

#[tracing::instrument(skip(pool, time_source))]
pub async fn get_profile(
    user_id: &UserId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::RankingProfile, StoreError> {
    let user = super::read_user(pool, user_id).await?;
    let ranking = get_or_create_ranking(user_id, pool, time_source).await?;
    let position = position(ranking.rating, pool).await?;
    let recent_matches = challenge::recent_completed(
        Some(user_id),
        PROFILE_RECENT_MATCHES_LIMIT,
        pool,
    )
    .await?;
    Ok(responses::RankingProfile {
        ranking: ranking.into_response(user.username),
        position,
        recent_matches,
    })
}

/// Page and limit after defaults and clamping.
fn page_bounds(request: &requests::LeaderboardPage) -> (i64, i64) {
    let page = request.page.unwrap_or(1).max(1);
    let limit = request
        .limit
        .unwrap_or(requests::DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, requests::MAX_LEADERBOARD_LIMIT);
    (page, limit)
}

fn total_pages(total: i64, limit: i64) -> i64 {
    (total + limit - 1) / limit
}

#[tracing::instrument(skip(pool))]
pub async fn get_leaderboard(
    request: &requests::LeaderboardPage,
    pool: &PgPool,
) -> Result<responses::Leaderboard, StoreError> {
    let (page, limit) = page_bounds(request);
    let offset = (page - 1).saturating_mul(limit);

    let total =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_rankings;")
            .fetch_one(pool)
            .await?;

    let rows = sqlx::query_as::<_, LeaderboardRow>(
        "SELECT ranked.*, u.username
        FROM (
            SELECT r.*, ROW_NUMBER() OVER (ORDER BY r.rating DESC) AS position
            FROM user_rankings r
        ) ranked
        JOIN users u ON u.id = ranked.user_id
        ORDER BY ranked.position
        LIMIT $1 OFFSET $2;",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(responses::Leaderboard {
        entries: rows
            .into_iter()
            .map(|row| responses::LeaderboardEntry {
                position: row.position,
                ranking: row.ranking.into_response(row.username),
            })
            .collect(),
        pagination: responses::Pagination {
            page,
            limit,
            total,
            pages: total_pages(total, limit),
        },
    })
}

/// Bucket `(rating, users)` pairs by tier, highest tier first, skipping
/// empty tiers.
fn tier_distribution(
    rating_counts: impl IntoIterator<Item = (i32, i64)>,
) -> Vec<responses::TierCount> {
    let mut counts: BTreeMap<Tier, i64> = BTreeMap::new();
    for (rating, users) in rating_counts {
        *counts.entry(tier_for(rating)).or_default() += users;
    }
    Tier::DESCENDING
        .into_iter()
        .filter_map(|tier| {
            let count = *counts.get(&tier)?;
            Some(responses::TierCount { tier, count })
        })
        .collect()
}

#[tracing::instrument(skip(pool))]
pub async fn get_ranking_stats(
    pool: &PgPool,
) -> Result<responses::RankingStats, StoreError> {
    let rating_counts = sqlx::query_as::<_, (i32, i64)>(
        "SELECT rating, COUNT(*) FROM user_rankings GROUP BY rating;",
    )
    .fetch_all(pool)
    .await?;

    let top_challengers = sqlx::query_as::<_, RankingWithUsername>(
        "SELECT r.*, u.username
        FROM user_rankings r
        JOIN users u ON u.id = r.user_id
        WHERE r.total_matches > 0
        ORDER BY r.total_matches DESC, r.rating DESC
        LIMIT $1;",
    )
    .bind(TOP_CHALLENGERS_LIMIT)
    .fetch_all(pool)
    .await?;

    let recent_challenges =
        challenge::recent_completed(None, RECENT_CHALLENGES_LIMIT, pool)
            .await?;

    Ok(responses::RankingStats {
        tier_distribution: tier_distribution(rating_counts),
        top_challengers: top_challengers.into_iter().map(Into::into).collect(),
        recent_challenges,
    })
}
