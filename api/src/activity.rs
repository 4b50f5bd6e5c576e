//! Scoring a participant's logged activity for a challenge.
//!
//! The store loads workouts for one user and one window; everything here is
//! pure so the per-type rules can be checked without a database.

use jiff::civil::Date;
use jiff::tz::TimeZone;
use jiff::{Span, Timestamp};
use payloads::{ChallengeType, WorkoutId};

/// A logged workout, reduced to what scoring looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    pub id: WorkoutId,
    pub date: Date,
    pub duration_minutes: Option<i32>,
    pub exercises: Vec<ExerciseSets>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExerciseSets {
    pub sets: i32,
    pub reps: i32,
    pub weight: Option<f64>,
}

impl ExerciseSets {
    fn reps_total(&self) -> f64 {
        f64::from(self.sets) * f64::from(self.reps)
    }
}

/// Closed range of calendar days (UTC) that count toward a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    pub start: Date,
    pub end: Date,
}

impl ActivityWindow {
    /// `[date(started_at), date(started_at) + duration_days]`, both ends
    /// included.
    pub fn for_challenge(
        started_at: Timestamp,
        duration_days: i32,
    ) -> Result<Self, jiff::Error> {
        let start = started_at.to_zoned(TimeZone::UTC).date();
        let end = start.checked_add(Span::new().try_days(duration_days)?)?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A participant's total plus how much each workout added to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Score {
    pub total: f64,
    /// Only workouts that added something are listed.
    pub contributions: Vec<(WorkoutId, f64)>,
}

/// How much a single workout adds to a score of the given type.
pub fn workout_value(challenge_type: ChallengeType, workout: &Workout) -> f64 {
    match challenge_type {
        ChallengeType::WorkoutCount => 1.0,
        ChallengeType::TotalReps => {
            workout.exercises.iter().map(ExerciseSets::reps_total).sum()
        }
        ChallengeType::Duration => {
            workout.duration_minutes.map(f64::from).unwrap_or(0.0)
        }
        ChallengeType::WeightLifted => workout
            .exercises
            .iter()
            .filter_map(|e| e.weight.map(|w| w * e.reps_total()))
            .sum(),
    }
}

/// Score a user's workouts. Workouts dated outside the window are ignored,
/// and no activity scores zero.
pub fn score(
    challenge_type: ChallengeType,
    window: &ActivityWindow,
    workouts: &[Workout],
) -> Score {
    let mut score = Score::default();
    for workout in workouts.iter().filter(|w| window.contains(w.date)) {
        let value = workout_value(challenge_type, workout);
        if value > 0.0 {
            score.total += value;
            score.contributions.push((workout.id, value));
        }
    }
    score
}
