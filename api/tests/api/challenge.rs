use jiff::SignedDuration;
use jiff::civil::date;
use payloads::{
    ChallengeResponse, ChallengeStatus, ChallengeType, Tier, requests,
};
use reqwest::StatusCode;

use test_helpers::{
    TestApp, assert_status_code, challenge_details, spawn_app,
};

/// alice (logged in), bob and charlie.
async fn app_with_users() -> anyhow::Result<TestApp> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.create_bob_user().await?;
    app.create_charlie_user().await?;
    Ok(app)
}

#[tokio::test]
async fn create_challenge_is_pending() -> anyhow::Result<()> {
    let app = app_with_users().await?;

    let challenge = app
        .client
        .create_challenge(&challenge_details("bob", ChallengeType::TotalReps))
        .await?;

    assert_eq!(challenge.status, ChallengeStatus::Pending);
    assert_eq!(challenge.challenger.username, "alice");
    assert_eq!(challenge.challenged.username, "bob");
    assert_eq!(challenge.challenged.user_id, app.user_id("bob").await?);
    assert_eq!(challenge.challenge_type, ChallengeType::TotalReps);
    assert_eq!(challenge.duration_days, requests::DEFAULT_DURATION_DAYS);
    assert_eq!(challenge.challenger_result, 0.0);
    assert_eq!(challenge.challenged_result, 0.0);
    assert_eq!(challenge.challenger_rating_before, None);
    assert_eq!(challenge.challenged_rating_before, None);
    assert_eq!(challenge.winner_id, None);
    assert_eq!(challenge.created_at, app.time_source.now());
    assert_eq!(challenge.started_at, None);

    Ok(())
}

#[tokio::test]
async fn open_challenge_blocks_pair_in_either_direction() -> anyhow::Result<()>
{
    let app = app_with_users().await?;

    let details = challenge_details("bob", ChallengeType::WorkoutCount);
    app.client.create_challenge(&details).await?;

    let result = app.client.create_challenge(&details).await;
    assert_status_code(result, StatusCode::CONFLICT);

    app.login_bob().await?;
    let result = app
        .client
        .create_challenge(&challenge_details(
            "alice",
            ChallengeType::Duration,
        ))
        .await;
    assert_status_code(result, StatusCode::CONFLICT);

    // other pairs are unaffected
    app.client
        .create_challenge(&challenge_details(
            "charlie",
            ChallengeType::Duration,
        ))
        .await?;

    Ok(())
}

#[tokio::test]
async fn active_challenge_still_blocks_pair() -> anyhow::Result<()> {
    let app = app_with_users().await?;
    app.start_alice_vs_bob(ChallengeType::WorkoutCount).await?;

    let result = app
        .client
        .create_challenge(&challenge_details("bob", ChallengeType::TotalReps))
        .await;
    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn invalid_challenges_rejected() -> anyhow::Result<()> {
    let app = app_with_users().await?;

    let result = app
        .client
        .create_challenge(&challenge_details(
            "alice",
            ChallengeType::WorkoutCount,
        ))
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    let result = app
        .client
        .create_challenge(&challenge_details(
            "nobody",
            ChallengeType::WorkoutCount,
        ))
        .await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    for days in [0, -3] {
        let mut details = challenge_details("bob", ChallengeType::Duration);
        details.duration_days = Some(days);
        let result = app.client.create_challenge(&details).await;
        assert_status_code(result, StatusCode::BAD_REQUEST);
    }

    let mut details = challenge_details("bob", ChallengeType::Duration);
    details.title = "   ".into();
    let result = app.client.create_challenge(&details).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    let mut details = challenge_details("bob", ChallengeType::Duration);
    details.title = "t".repeat(requests::CHALLENGE_TITLE_MAX_LEN + 1);
    let result = app.client.create_challenge(&details).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // none of the rejected attempts left a challenge behind
    assert!(app.client.list_challenges().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn unknown_challenge_type_rejected() -> anyhow::Result<()> {
    let app = app_with_users().await?;

    let response = app
        .client
        .inner_client
        .post(format!("{}/api/create_challenge", app.client.address))
        .json(&serde_json::json!({
            "challenged_username": "bob",
            "challenge_type": "marathon_distance",
            "title": "Run",
            "description": null,
            "target_value": null,
            "duration_days": 7,
        }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn only_challenged_user_can_respond() -> anyhow::Result<()> {
    let app = app_with_users().await?;
    let challenge = app
        .client
        .create_challenge(&challenge_details("bob", ChallengeType::Duration))
        .await?;
    let accept = requests::RespondToChallenge {
        challenge_id: challenge.challenge_id,
        response: ChallengeResponse::Accept,
    };

    // the challenger cannot accept on bob's behalf
    let result = app.client.respond_to_challenge(&accept).await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    app.login_charlie().await?;
    let result = app.client.respond_to_challenge(&accept).await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    app.login_bob().await?;
    let accepted = app.client.respond_to_challenge(&accept).await?;
    assert_eq!(accepted.status, ChallengeStatus::Active);

    // no longer pending
    let result = app.client.respond_to_challenge(&accept).await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn accept_snapshots_ratings() -> anyhow::Result<()> {
    let app = app_with_users().await?;

    let challenge = app.start_alice_vs_bob(ChallengeType::WorkoutCount).await?;

    assert_eq!(challenge.status, ChallengeStatus::Active);
    assert_eq!(challenge.started_at, Some(app.time_source.now()));
    assert_eq!(challenge.challenger_rating_before, Some(1200));
    assert_eq!(challenge.challenged_rating_before, Some(1200));
    assert_eq!(challenge.challenger_rating_after, None);

    Ok(())
}

#[tokio::test]
async fn decline_cancels_and_frees_pair() -> anyhow::Result<()> {
    let app = app_with_users().await?;
    let challenge = app
        .client
        .create_challenge(&challenge_details("bob", ChallengeType::Duration))
        .await?;

    app.login_bob().await?;
    let declined = app
        .client
        .respond_to_challenge(&requests::RespondToChallenge {
            challenge_id: challenge.challenge_id,
            response: ChallengeResponse::Decline,
        })
        .await?;
    assert_eq!(declined.status, ChallengeStatus::Cancelled);
    assert_eq!(declined.started_at, None);
    assert_eq!(declined.challenger_rating_before, None);

    let result = app.client.complete_challenge(&challenge.challenge_id).await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    // a cancelled challenge no longer blocks the pair
    app.client
        .create_challenge(&challenge_details(
            "alice",
            ChallengeType::WorkoutCount,
        ))
        .await?;

    Ok(())
}

#[tokio::test]
async fn pending_challenge_cannot_be_completed() -> anyhow::Result<()> {
    let app = app_with_users().await?;
    let challenge = app
        .client
        .create_challenge(&challenge_details("bob", ChallengeType::Duration))
        .await?;

    let result = app.client.complete_challenge(&challenge.challenge_id).await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn more_workouts_wins() -> anyhow::Result<()> {
    let app = app_with_users().await?;
    let challenge = app.start_alice_vs_bob(ChallengeType::WorkoutCount).await?;

    app.log_sessions("alice", 5).await?;
    app.log_sessions("bob", 2).await?;

    let result = app.client.complete_challenge(&challenge.challenge_id).await?;
    assert_eq!(result.challenger_result, 5.0);
    assert_eq!(result.challenged_result, 2.0);
    assert_eq!(result.winner_id, Some(app.user_id("alice").await?));
    assert_eq!(result.challenger_new_rating, 1216);
    assert_eq!(result.challenged_new_rating, 1184);

    let alice = app.client.ranking_profile().await?.ranking;
    assert_eq!(alice.rating, 1216);
    assert_eq!(alice.tier, Tier::Silver);
    assert_eq!(alice.wins, 1);
    assert_eq!(alice.total_matches, 1);
    assert_eq!(alice.current_streak, 1);
    assert_eq!(alice.best_streak, 1);
    assert_eq!(alice.last_match_at, Some(app.time_source.now()));

    app.login_bob().await?;
    let bob = app.client.ranking_profile().await?.ranking;
    assert_eq!(bob.rating, 1184);
    assert_eq!(bob.tier, Tier::Bronze);
    assert_eq!(bob.losses, 1);
    assert_eq!(bob.current_streak, 0);

    let completed = app.client.list_challenges().await?;
    assert_eq!(completed.len(), 1);
    let completed = &completed[0];
    assert_eq!(completed.status, ChallengeStatus::Completed);
    assert_eq!(completed.challenger_rating_after, Some(1216));
    assert_eq!(completed.challenged_rating_after, Some(1184));
    assert_eq!(completed.completed_at, Some(app.time_source.now()));

    Ok(())
}

#[tokio::test]
async fn equal_results_draw() -> anyhow::Result<()> {
    let app = app_with_users().await?;
    let challenge = app.start_alice_vs_bob(ChallengeType::Duration).await?;

    let today = app.today();
    app.log_workout("alice", today, Some(45), &[]).await?;
    app.log_workout("bob", today, Some(20), &[]).await?;
    app.log_workout("bob", today.tomorrow()?, Some(25), &[]).await?;

    let result = app.client.complete_challenge(&challenge.challenge_id).await?;
    assert_eq!(result.challenger_result, 45.0);
    assert_eq!(result.challenged_result, 45.0);
    assert_eq!(result.winner_id, None);
    assert_eq!(result.challenger_new_rating, 1200);
    assert_eq!(result.challenged_new_rating, 1200);

    let alice = app.client.ranking_profile().await?.ranking;
    assert_eq!(alice.draws, 1);
    assert_eq!(alice.wins, 0);
    assert_eq!(alice.total_matches, 1);
    assert_eq!(alice.current_streak, 0);

    Ok(())
}

#[tokio::test]
async fn no_activity_is_a_draw() -> anyhow::Result<()> {
    let app = app_with_users().await?;
    let challenge = app.start_alice_vs_bob(ChallengeType::WeightLifted).await?;

    let result = app.client.complete_challenge(&challenge.challenge_id).await?;
    assert_eq!(result.challenger_result, 0.0);
    assert_eq!(result.challenged_result, 0.0);
    assert_eq!(result.winner_id, None);

    Ok(())
}

#[tokio::test]
async fn second_completion_not_found() -> anyhow::Result<()> {
    let app = app_with_users().await?;
    let challenge = app.start_alice_vs_bob(ChallengeType::WorkoutCount).await?;
    app.log_sessions("bob", 1).await?;

    app.client.complete_challenge(&challenge.challenge_id).await?;
    let before = app.client.ranking_profile().await?.ranking;

    app.time_source.advance(SignedDuration::from_hours(1));
    let result = app.client.complete_challenge(&challenge.challenge_id).await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    let after = app.client.ranking_profile().await?.ranking;
    assert_eq!(before, after);
    assert_eq!(after.total_matches, 1);

    Ok(())
}

#[tokio::test]
async fn only_window_activity_counts() -> anyhow::Result<()> {
    let app = app_with_users().await?;
    // accepted on 2025-01-01, so the window is 2025-01-01..=2025-01-08
    let challenge = app.start_alice_vs_bob(ChallengeType::WorkoutCount).await?;

    app.log_workout("alice", date(2024, 12, 31), Some(30), &[]).await?;
    app.log_workout("alice", date(2025, 1, 9), Some(30), &[]).await?;
    app.log_workout("bob", date(2025, 1, 8), Some(30), &[]).await?;

    let result = app.client.complete_challenge(&challenge.challenge_id).await?;
    assert_eq!(result.challenger_result, 0.0);
    assert_eq!(result.challenged_result, 1.0);
    assert_eq!(result.winner_id, Some(app.user_id("bob").await?));

    Ok(())
}

#[tokio::test]
async fn reps_and_weight_scoring() -> anyhow::Result<()> {
    let app = app_with_users().await?;
    let reps = app.start_alice_vs_bob(ChallengeType::TotalReps).await?;

    let today = app.today();
    app.log_workout("alice", today, None, &[(3, 10, None), (5, 5, Some(100.0))])
        .await?;
    app.log_workout("bob", today, None, &[(4, 12, Some(20.0))])
        .await?;

    let result = app.client.complete_challenge(&reps.challenge_id).await?;
    assert_eq!(result.challenger_result, 55.0);
    assert_eq!(result.challenged_result, 48.0);

    // same workouts, scored by weight
    let weight = app.start_alice_vs_bob(ChallengeType::WeightLifted).await?;
    let result = app.client.complete_challenge(&weight.challenge_id).await?;
    assert_eq!(result.challenger_result, 2500.0);
    assert_eq!(result.challenged_result, 960.0);

    Ok(())
}

#[tokio::test]
async fn completion_records_contributions() -> anyhow::Result<()> {
    let app = app_with_users().await?;
    let challenge = app.start_alice_vs_bob(ChallengeType::Duration).await?;

    let today = app.today();
    app.log_workout("alice", today, Some(40), &[]).await?;
    // no duration contributes nothing and is not recorded
    app.log_workout("alice", today, None, &[(3, 10, None)]).await?;
    app.log_workout("bob", today, Some(15), &[]).await?;

    app.client.complete_challenge(&challenge.challenge_id).await?;

    let rows = sqlx::query_as::<_, (String, f64)>(
        "SELECT u.username, cc.contributed_value
        FROM challenge_contributions cc
        JOIN users u ON u.id = cc.user_id
        WHERE cc.challenge_id = $1
        ORDER BY u.username;",
    )
    .bind(challenge.challenge_id)
    .fetch_all(&app.db_pool)
    .await?;
    assert_eq!(
        rows,
        vec![("alice".to_string(), 40.0), ("bob".to_string(), 15.0)]
    );

    Ok(())
}

#[tokio::test]
async fn ratings_use_accept_time_snapshots() -> anyhow::Result<()> {
    let app = app_with_users().await?;

    let vs_bob = app.start_alice_vs_bob(ChallengeType::WorkoutCount).await?;
    let vs_charlie = app
        .client
        .create_challenge(&challenge_details(
            "charlie",
            ChallengeType::WorkoutCount,
        ))
        .await?;
    app.login_charlie().await?;
    app.client
        .respond_to_challenge(&requests::RespondToChallenge {
            challenge_id: vs_charlie.challenge_id,
            response: ChallengeResponse::Accept,
        })
        .await?;
    app.login_alice().await?;

    app.log_sessions("alice", 2).await?;
    app.client.complete_challenge(&vs_bob.challenge_id).await?;
    let result = app.client.complete_challenge(&vs_charlie.challenge_id).await?;

    // both were accepted at 1200, so the second win is rated from 1200 too
    assert_eq!(result.challenger_new_rating, 1216);
    let alice = app.client.ranking_profile().await?.ranking;
    assert_eq!(alice.rating, 1216);
    assert_eq!(alice.wins, 2);
    assert_eq!(alice.current_streak, 2);
    assert_eq!(alice.best_streak, 2);

    Ok(())
}

#[tokio::test]
async fn list_challenges_newest_first() -> anyhow::Result<()> {
    let app = app_with_users().await?;

    let first = app
        .client
        .create_challenge(&challenge_details("bob", ChallengeType::Duration))
        .await?;
    app.time_source.advance(SignedDuration::from_mins(5));
    let second = app
        .client
        .create_challenge(&challenge_details(
            "charlie",
            ChallengeType::TotalReps,
        ))
        .await?;

    let ids: Vec<_> = app
        .client
        .list_challenges()
        .await?
        .into_iter()
        .map(|c| c.challenge_id)
        .collect();
    assert_eq!(ids, vec![second.challenge_id, first.challenge_id]);

    // bob only sees the challenge involving bob
    app.login_bob().await?;
    let bobs = app.client.list_challenges().await?;
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].challenge_id, first.challenge_id);
    assert_eq!(bobs[0].status, ChallengeStatus::Pending);

    Ok(())
}
