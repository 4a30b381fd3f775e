use codecards_core::model::Language;

use super::{SqliteRepository, mapping};
use crate::repository::{LanguageRepository, StorageError};

#[async_trait::async_trait]
impl LanguageRepository for SqliteRepository {
    async fn upsert_language(&self, language: &Language) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO languages (id, name, slug, is_generated)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                slug = excluded.slug,
                is_generated = excluded.is_generated
            ",
        )
        .bind(mapping::u64_to_i64("language_id", language.id().value())?)
        .bind(language.name())
        .bind(language.slug())
        .bind(language.is_generated())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_language_by_slug(&self, slug: &str) -> Result<Option<Language>, StorageError> {
        let row = sqlx::query("SELECT id, name, slug, is_generated FROM languages WHERE slug = ?1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| mapping::map_language_row(&r)).transpose()
    }

    async fn list_generated_languages(&self) -> Result<Vec<Language>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, name, slug, is_generated FROM languages WHERE is_generated = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(mapping::map_language_row).collect()
    }
}
