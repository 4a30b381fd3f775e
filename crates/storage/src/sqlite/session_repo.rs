use chrono::{DateTime, Utc};
use codecards_core::model::{AnswerRecord, QuizSession, SessionToken, UserId};

use super::{SqliteRepository, mapping};
use crate::repository::{QuizSessionRepository, StorageError};

#[async_trait::async_trait]
impl QuizSessionRepository for SqliteRepository {
    async fn insert_session(&self, session: &QuizSession) -> Result<(), StorageError> {
        let questions = serde_json::to_string(session.questions()).map_err(mapping::ser)?;

        let result = sqlx::query(
            r"
            INSERT INTO quiz_sessions (
                token, user_id, language_slug, questions,
                started_at, expires_at, is_completed
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)
            ",
        )
        .bind(session.token().to_string())
        .bind(mapping::u64_to_i64("user_id", session.user_id().value())?)
        .bind(session.language_slug())
        .bind(questions)
        .bind(session.started_at())
        .bind(session.expires_at())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StorageError::Conflict)
            }
            Err(e) => Err(StorageError::Connection(e.to_string())),
        }
    }

    async fn get_session(
        &self,
        token: SessionToken,
        user_id: UserId,
    ) -> Result<Option<QuizSession>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT token, user_id, language_slug, questions, started_at, expires_at,
                   is_completed, completed_at, answers, score
            FROM quiz_sessions
            WHERE token = ?1 AND user_id = ?2
            ",
        )
        .bind(token.to_string())
        .bind(mapping::u64_to_i64("user_id", user_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| mapping::map_session_row(&r)).transpose()
    }

    async fn complete_session(
        &self,
        token: SessionToken,
        user_id: UserId,
        answers: &[AnswerRecord],
        score: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let answers_json = serde_json::to_string(answers).map_err(mapping::ser)?;

        // Conditional update serializes grading: of two concurrent
        // completion attempts only one matches is_completed = 0.
        let result = sqlx::query(
            r"
            UPDATE quiz_sessions
            SET is_completed = 1,
                completed_at = ?3,
                answers = ?4,
                score = ?5
            WHERE token = ?1 AND user_id = ?2 AND is_completed = 0
            ",
        )
        .bind(token.to_string())
        .bind(mapping::u64_to_i64("user_id", user_id.value())?)
        .bind(completed_at)
        .bind(answers_json)
        .bind(i64::from(score))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Either the session never existed for this user or it was already
        // completed; distinguish so callers can report the right failure.
        let exists = sqlx::query(
            "SELECT 1 FROM quiz_sessions WHERE token = ?1 AND user_id = ?2",
        )
        .bind(token.to_string())
        .bind(mapping::u64_to_i64("user_id", user_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if exists.is_some() {
            Ok(false)
        } else {
            Err(StorageError::NotFound)
        }
    }

    async fn purge_sessions_expired_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM quiz_sessions WHERE expires_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
