use actix_identity::Identity;
use actix_web::{HttpResponse, post, web};
use payloads::requests;
use sqlx::PgPool;

use crate::store;
use crate::time::TimeSource;

use super::{APIError, get_user_id};

/// The caller's ranking, created on first access.
#[tracing::instrument(
    skip(user, pool, time_source),
    fields(user_id=tracing::field::Empty),
    ret
)]
#[post("/ranking_profile")]
pub async fn ranking_profile(
    user: Identity,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let profile = store::get_profile(&user_id, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[post("/leaderboard")]
pub async fn leaderboard(
    user: Identity,
    page: web::Json<requests::LeaderboardPage>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    get_user_id(&user)?;
    let leaderboard = store::get_leaderboard(&page, &pool).await?;
    Ok(HttpResponse::Ok().json(leaderboard))
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[post("/ranking_stats")]
pub async fn ranking_stats(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    get_user_id(&user)?;
    let stats = store::get_ranking_stats(&pool).await?;
    Ok(HttpResponse::Ok().json(stats))
}
