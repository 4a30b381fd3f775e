use codecards_core::model::{Flashcard, FlashcardId, LanguageId};
use sqlx::Row;

use super::{SqliteRepository, mapping};
use crate::repository::{FlashcardRepository, StorageError};

#[async_trait::async_trait]
impl FlashcardRepository for SqliteRepository {
    async fn upsert_flashcard(&self, flashcard: &Flashcard) -> Result<(), StorageError> {
        let distractors =
            serde_json::to_string(flashcard.distractors()).map_err(mapping::ser)?;

        sqlx::query(
            r"
            INSERT INTO flashcards (
                id, language_id, keyword, question, answer, code_example, distractors
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                -- cards are immutable after generation except for distractor backfill
                distractors = excluded.distractors
            ",
        )
        .bind(mapping::u64_to_i64("flashcard_id", flashcard.id().value())?)
        .bind(mapping::u64_to_i64("language_id", flashcard.language_id().value())?)
        .bind(flashcard.keyword())
        .bind(flashcard.question())
        .bind(flashcard.answer())
        .bind(flashcard.code_example())
        .bind(distractors)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_flashcard(&self, id: FlashcardId) -> Result<Option<Flashcard>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, language_id, keyword, question, answer, code_example, distractors
            FROM flashcards
            WHERE id = ?1
            ",
        )
        .bind(mapping::u64_to_i64("flashcard_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| mapping::map_flashcard_row(&r)).transpose()
    }

    async fn list_by_language(
        &self,
        language_id: LanguageId,
    ) -> Result<Vec<Flashcard>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, language_id, keyword, question, answer, code_example, distractors
            FROM flashcards
            WHERE language_id = ?1
            ORDER BY id
            ",
        )
        .bind(mapping::u64_to_i64("language_id", language_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(mapping::map_flashcard_row).collect()
    }

    async fn count_by_language(&self, language_id: LanguageId) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM flashcards WHERE language_id = ?1")
            .bind(mapping::u64_to_i64("language_id", language_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let count: i64 = row.try_get("cnt").map_err(mapping::ser)?;
        u64::try_from(count).map_err(|_| StorageError::Serialization("negative count".into()))
    }
}
