//! Read access to the workout tracker's tables.

use std::collections::HashMap;

use jiff::civil::Date;
use jiff_sqlx::{Date as SqlxDate, ToSqlx};
use payloads::{UserId, WorkoutId};
use sqlx::{FromRow, Postgres, Transaction};

use crate::activity::{ActivityWindow, ExerciseSets, Workout};
use crate::store::StoreError;

#[derive(Debug, FromRow)]
struct WorkoutRow {
    id: WorkoutId,
    #[sqlx(try_from = "SqlxDate")]
    date: Date,
    duration_minutes: Option<i32>,
}

#[derive(Debug, FromRow)]
struct ExerciseRow {
    workout_id: WorkoutId,
    sets: i32,
    reps: i32,
    weight: Option<f64>,
}

/// All of a user's workouts dated inside the window, oldest first, with
/// their exercises attached.
pub async fn list_workouts(
    user_id: &UserId,
    window: &ActivityWindow,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<Vec<Workout>, StoreError> {
    let workouts = sqlx::query_as::<_, WorkoutRow>(
        "SELECT id, date, duration_minutes
        FROM workouts
        WHERE user_id = $1 AND date BETWEEN $2 AND $3
        ORDER BY date, created_at;",
    )
    .bind(user_id)
    .bind(window.start.to_sqlx())
    .bind(window.end.to_sqlx())
    .fetch_all(&mut **tx)
    .await?;

    let exercise_rows = sqlx::query_as::<_, ExerciseRow>(
        "SELECT e.workout_id, e.sets, e.reps, e.weight
        FROM exercises e
        JOIN workouts w ON w.id = e.workout_id
        WHERE w.user_id = $1 AND w.date BETWEEN $2 AND $3;",
    )
    .bind(user_id)
    .bind(window.start.to_sqlx())
    .bind(window.end.to_sqlx())
    .fetch_all(&mut **tx)
    .await?;

    let mut exercises: HashMap<WorkoutId, Vec<ExerciseSets>> = HashMap::new();
    for row in exercise_rows {
        exercises.entry(row.workout_id).or_default().push(ExerciseSets {
            sets: row.sets,
            reps: row.reps,
            weight: row.weight,
        });
    }

    Ok(workouts
        .into_iter()
        .map(|row| Workout {
            id: row.id,
            date: row.date,
            duration_minutes: row.duration_minutes,
            exercises: exercises.remove(&row.id).unwrap_or_default(),
        })
        .collect())
}
