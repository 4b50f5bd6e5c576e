use crate::{
    ChallengeId, ChallengeStatus, ChallengeType, Tier, UserId, UserIdentity,
};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A challenge joined with both participants' usernames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub challenge_id: ChallengeId,
    pub challenger: UserIdentity,
    pub challenged: UserIdentity,
    pub challenge_type: ChallengeType,
    pub title: String,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub duration_days: i32,
    pub status: ChallengeStatus,
    /// None on a completed challenge means a draw.
    pub winner_id: Option<UserId>,
    pub challenger_result: f64,
    pub challenged_result: f64,
    /// Snapshotted when the challenge is accepted.
    pub challenger_rating_before: Option<i32>,
    pub challenged_rating_before: Option<i32>,
    pub challenger_rating_after: Option<i32>,
    pub challenged_rating_after: Option<i32>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// Outcome of completing a challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeResult {
    pub challenge_id: ChallengeId,
    pub challenger_result: f64,
    pub challenged_result: f64,
    pub winner_id: Option<UserId>,
    pub challenger_new_rating: i32,
    pub challenged_new_rating: i32,
}

/// A user's competitive standing. `tier` is always derived from `rating`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub user: UserIdentity,
    pub rating: i32,
    pub tier: Tier,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub total_matches: i32,
    pub current_streak: i32,
    pub best_streak: i32,
    pub last_match_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingProfile {
    pub ranking: Ranking,
    /// 1 + number of users with a strictly higher rating.
    pub position: i64,
    /// Most recently completed challenges, newest first.
    pub recent_matches: Vec<Challenge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Row rank within the full ordering. Users with equal ratings get
    /// distinct, arbitrarily ordered positions.
    pub position: i64,
    pub ranking: Ranking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCount {
    pub tier: Tier,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingStats {
    /// Highest tier first; tiers without users are omitted.
    pub tier_distribution: Vec<TierCount>,
    pub top_challengers: Vec<Ranking>,
    pub recent_challenges: Vec<Challenge>,
}
