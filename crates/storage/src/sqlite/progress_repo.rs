use chrono::{DateTime, Utc};
use codecards_core::MasteryLevel;
use codecards_core::model::{FlashcardId, LanguageId, ProgressRecord, UserId};
use sqlx::Row;

use super::{SqliteRepository, mapping};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, flashcard_id, language_id, correct, incorrect,
                   last_practiced, mastery_level
            FROM progress
            WHERE user_id = ?1 AND flashcard_id = ?2
            ",
        )
        .bind(mapping::u64_to_i64("user_id", user_id.value())?)
        .bind(mapping::u64_to_i64("flashcard_id", flashcard_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| mapping::map_progress_row(&r)).transpose()
    }

    async fn list_progress_by_language(
        &self,
        user_id: UserId,
        language_id: LanguageId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, flashcard_id, language_id, correct, incorrect,
                   last_practiced, mastery_level
            FROM progress
            WHERE user_id = ?1 AND language_id = ?2
            ORDER BY flashcard_id
            ",
        )
        .bind(mapping::u64_to_i64("user_id", user_id.value())?)
        .bind(mapping::u64_to_i64("language_id", language_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(mapping::map_progress_row).collect()
    }

    async fn apply_attempt(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
        language_id: LanguageId,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError> {
        let correct_inc = i64::from(is_correct);
        let incorrect_inc = i64::from(!is_correct);
        let user = mapping::u64_to_i64("user_id", user_id.value())?;
        let card = mapping::u64_to_i64("flashcard_id", flashcard_id.value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // Counter bump happens inside the database, so two concurrent
        // submissions for the same pair each count exactly once.
        let row = sqlx::query(
            r"
            INSERT INTO progress (
                user_id, flashcard_id, language_id, correct, incorrect,
                last_practiced, mastery_level
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id, flashcard_id) DO UPDATE SET
                correct = progress.correct + excluded.correct,
                incorrect = progress.incorrect + excluded.incorrect,
                last_practiced = excluded.last_practiced
            RETURNING correct, incorrect
            ",
        )
        .bind(user)
        .bind(card)
        .bind(mapping::u64_to_i64("language_id", language_id.value())?)
        .bind(correct_inc)
        .bind(incorrect_inc)
        .bind(now)
        .bind(MasteryLevel::default().as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let correct = u32::try_from(row.try_get::<i64, _>("correct").map_err(mapping::ser)?)
            .map_err(|_| StorageError::Serialization("correct out of range".into()))?;
        let incorrect = u32::try_from(row.try_get::<i64, _>("incorrect").map_err(mapping::ser)?)
            .map_err(|_| StorageError::Serialization("incorrect out of range".into()))?;

        // The tier is a pure function of the counters, so re-deriving it
        // from the post-increment values keeps concurrent writers consistent.
        let mastery_level = MasteryLevel::evaluate(correct, incorrect);

        sqlx::query(
            "UPDATE progress SET mastery_level = ?3 WHERE user_id = ?1 AND flashcard_id = ?2",
        )
        .bind(user)
        .bind(card)
        .bind(mastery_level.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(ProgressRecord {
            user_id,
            flashcard_id,
            language_id,
            correct,
            incorrect,
            last_practiced: now,
            mastery_level,
        })
    }
}
