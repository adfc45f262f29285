// src/handlers/tracks.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::{FromRow, PgPool};

use crate::{
    config::TRACK_COMPLETION_SCORE,
    error::AppError,
    models::track::{SkillTrack, TrackProgress, TrackQuiz, TrackStep, TrackView},
    utils::jwt::Claims,
};

pub(crate) const TRACK_COLUMNS: &str = "id, title, description, category";

async fn load_track_quizzes(pool: &PgPool, track_id: Option<i64>) -> Result<Vec<TrackQuiz>, AppError> {
    let quizzes = sqlx::query_as::<_, TrackQuiz>(
        r#"
        SELECT tq.track_id, tq.quiz_id, q.title, q.difficulty, tq.position
        FROM track_quizzes tq
        JOIN quizzes q ON q.id = tq.quiz_id
        WHERE ($1::BIGINT IS NULL OR tq.track_id = $1)
        ORDER BY tq.track_id, tq.position
        "#,
    )
    .bind(track_id)
    .fetch_all(pool)
    .await?;
    Ok(quizzes)
}

/// Every track with its ordered quizzes.
#[utoipa::path(
    get,
    path = "/api/tracks",
    responses((status = 200, description = "Tracks with quizzes")),
    tag = "tracks"
)]
pub async fn list_tracks(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let tracks = sqlx::query_as::<_, SkillTrack>(&format!(
        "SELECT {TRACK_COLUMNS} FROM skill_tracks ORDER BY category, title"
    ))
    .fetch_all(&pool)
    .await?;

    let mut by_track: HashMap<i64, Vec<TrackQuiz>> = HashMap::new();
    for quiz in load_track_quizzes(&pool, None).await? {
        by_track.entry(quiz.track_id).or_default().push(quiz);
    }

    let views: Vec<TrackView> = tracks
        .into_iter()
        .map(|track| TrackView {
            quizzes: by_track.remove(&track.id).unwrap_or_default(),
            track,
        })
        .collect();

    Ok(Json(views))
}

#[derive(FromRow)]
struct BestScore {
    quiz_id: i64,
    best: i32,
}

/// Builds progress from the ordered quiz list and the user's best scores.
fn build_progress(track_id: i64, quizzes: Vec<TrackQuiz>, best: &HashMap<i64, i32>) -> TrackProgress {
    let steps: Vec<TrackStep> = quizzes
        .into_iter()
        .map(|q| {
            let best_score = best.get(&q.quiz_id).copied();
            TrackStep {
                quiz_id: q.quiz_id,
                title: q.title,
                best_score,
                completed: best_score.is_some_and(|s| s >= TRACK_COMPLETION_SCORE),
            }
        })
        .collect();

    let total = steps.len();
    let completed = steps.iter().filter(|s| s.completed).count();
    let percent = if total == 0 {
        0
    } else {
        ((completed * 100) as f64 / total as f64).round() as u32
    };
    let next_quiz_id = steps.iter().find(|s| !s.completed).map(|s| s.quiz_id);

    TrackProgress {
        track_id,
        completed,
        total,
        percent,
        next_quiz_id,
        steps,
    }
}

/// Completion of a track for the current user.
#[utoipa::path(
    get,
    path = "/api/tracks/{id}/progress",
    params(("id" = i64, Path, description = "Track id")),
    responses(
        (status = 200, description = "Per-quiz progress"),
        (status = 404, description = "Track not found")
    ),
    security(("bearer" = [])),
    tag = "tracks"
)]
pub async fn track_progress(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(track_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM skill_tracks WHERE id = $1)")
        .bind(track_id)
        .fetch_one(&pool)
        .await?;
    if !exists {
        return Err(AppError::NotFound("Track not found".to_string()));
    }

    let quizzes = load_track_quizzes(&pool, Some(track_id)).await?;

    let best: HashMap<i64, i32> = sqlx::query_as::<_, BestScore>(
        r#"
        SELECT a.quiz_id, MAX(a.score) AS best
        FROM attempts a
        JOIN track_quizzes tq ON tq.quiz_id = a.quiz_id AND tq.track_id = $2
        WHERE a.user_id = $1
        GROUP BY a.quiz_id
        "#,
    )
    .bind(user_id)
    .bind(track_id)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .map(|row| (row.quiz_id, row.best))
    .collect();

    Ok(Json(build_progress(track_id, quizzes, &best)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(quiz_id: i64, position: i32) -> TrackQuiz {
        TrackQuiz {
            track_id: 1,
            quiz_id,
            title: format!("Quiz {quiz_id}"),
            difficulty: "easy".into(),
            position,
        }
    }

    #[test]
    fn progress_counts_scores_at_threshold() {
        let quizzes = vec![step(10, 1), step(11, 2), step(12, 3)];
        let best = HashMap::from([(10, 60), (11, 59)]);

        let progress = build_progress(1, quizzes, &best);

        assert_eq!(progress.total, 3);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.percent, 33);
        assert_eq!(progress.next_quiz_id, Some(11));
        assert_eq!(progress.steps[1].best_score, Some(59));
        assert!(!progress.steps[2].completed);
    }

    #[test]
    fn finished_track_has_no_next_quiz() {
        let best = HashMap::from([(10, 100)]);
        let progress = build_progress(1, vec![step(10, 1)], &best);
        assert_eq!(progress.percent, 100);
        assert_eq!(progress.next_quiz_id, None);
    }

    #[test]
    fn empty_track_is_zero_percent() {
        let progress = build_progress(1, Vec::new(), &HashMap::new());
        assert_eq!(progress.percent, 0);
        assert_eq!(progress.next_quiz_id, None);
    }
}
