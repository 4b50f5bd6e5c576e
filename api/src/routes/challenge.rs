use actix_identity::Identity;
use actix_web::{HttpResponse, post, web};
use payloads::{ChallengeId, requests};
use sqlx::PgPool;

use crate::store;
use crate::time::TimeSource;

use super::{APIError, get_user_id};

#[tracing::instrument(
    skip(user, pool, time_source),
    fields(user_id=tracing::field::Empty),
    ret
)]
#[post("/create_challenge")]
pub async fn create_challenge(
    user: Identity,
    details: web::Json<requests::CreateChallenge>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let challenge =
        store::create_challenge(&user_id, &details, &pool, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(challenge))
}

#[tracing::instrument(
    skip(user, pool, time_source),
    fields(user_id=tracing::field::Empty),
    ret
)]
#[post("/respond_to_challenge")]
pub async fn respond_to_challenge(
    user: Identity,
    details: web::Json<requests::RespondToChallenge>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let challenge = store::respond_to_challenge(
        &user_id,
        &details.challenge_id,
        details.response,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(challenge))
}

/// Any logged-in user may trigger completion; the result only depends on
/// the participants' logged activity.
#[tracing::instrument(
    skip(user, pool, time_source),
    fields(user_id=tracing::field::Empty),
    ret
)]
#[post("/complete_challenge")]
pub async fn complete_challenge(
    user: Identity,
    challenge_id: web::Json<ChallengeId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    get_user_id(&user)?;
    let result =
        store::complete_challenge(&challenge_id, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(result))
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[post("/challenges")]
pub async fn list_challenges(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let challenges = store::list_user_challenges(&user_id, &pool).await?;
    Ok(HttpResponse::Ok().json(challenges))
}
