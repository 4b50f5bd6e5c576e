//! ELO rating model.
//!
//! Pure functions only; the store feeds in snapshot ratings and results and
//! writes back whatever comes out.

use std::cmp::Ordering;

use payloads::Tier;

/// Magnitude of the rating change for a single contest.
pub const K_FACTOR: f64 = 32.0;
pub const DEFAULT_RATING: i32 = 1200;

pub const SILVER_MIN_RATING: i32 = 1200;
pub const GOLD_MIN_RATING: i32 = 1400;
pub const PLATINUM_MIN_RATING: i32 = 1700;
pub const DIAMOND_MIN_RATING: i32 = 2000;

/// Probability-like expectation that `rating` beats `opponent`.
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(opponent - rating) / 400.0))
}

/// 1 for a strictly better result, 0 for strictly worse, 0.5 otherwise.
pub fn actual_score(result: f64, opponent_result: f64) -> f64 {
    match result.partial_cmp(&opponent_result) {
        Some(Ordering::Greater) => 1.0,
        Some(Ordering::Less) => 0.0,
        _ => 0.5,
    }
}

pub fn update_rating(rating: i32, opponent: i32, actual: f64) -> i32 {
    let delta = K_FACTOR * (actual - expected_score(rating, opponent));
    (f64::from(rating) + delta).round() as i32
}

/// New ratings for both sides of a contest.
///
/// Both updates read the same pre-contest pair, so the result does not depend
/// on which side is written first. Independent rounding means the deltas do
/// not always cancel exactly.
pub fn rate_pair(
    challenger_rating: i32,
    challenged_rating: i32,
    challenger_result: f64,
    challenged_result: f64,
) -> (i32, i32) {
    (
        update_rating(
            challenger_rating,
            challenged_rating,
            actual_score(challenger_result, challenged_result),
        ),
        update_rating(
            challenged_rating,
            challenger_rating,
            actual_score(challenged_result, challenger_result),
        ),
    )
}

pub fn tier_for(rating: i32) -> Tier {
    if rating >= DIAMOND_MIN_RATING {
        Tier::Diamond
    } else if rating >= PLATINUM_MIN_RATING {
        Tier::Platinum
    } else if rating >= GOLD_MIN_RATING {
        Tier::Gold
    } else if rating >= SILVER_MIN_RATING {
        Tier::Silver
    } else {
        Tier::Bronze
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    pub fn from_results(result: f64, opponent_result: f64) -> Self {
        match result.partial_cmp(&opponent_result) {
            Some(Ordering::Greater) => Self::Win,
            Some(Ordering::Less) => Self::Loss,
            _ => Self::Draw,
        }
    }
}

/// The mutable counters of a user's ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    pub rating: i32,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub total_matches: i32,
    pub current_streak: i32,
    pub best_streak: i32,
}

impl Default for Standing {
    fn default() -> Self {
        Self {
            rating: DEFAULT_RATING,
            wins: 0,
            losses: 0,
            draws: 0,
            total_matches: 0,
            current_streak: 0,
            best_streak: 0,
        }
    }
}

impl Standing {
    /// Apply one finished contest.
    ///
    /// Only a win extends the streak; losses and draws reset it to zero.
    pub fn record(self, outcome: Outcome, new_rating: i32) -> Self {
        let mut next = Self {
            rating: new_rating,
            total_matches: self.total_matches + 1,
            ..self
        };
        match outcome {
            Outcome::Win => {
                next.wins += 1;
                next.current_streak += 1;
            }
            Outcome::Loss => {
                next.losses += 1;
                next.current_streak = 0;
            }
            Outcome::Draw => {
                next.draws += 1;
                next.current_streak = 0;
            }
        }
        next.best_streak = next.best_streak.max(next.current_streak);
        next
    }

    pub fn tier(&self) -> Tier {
        tier_for(self.rating)
    }
}
