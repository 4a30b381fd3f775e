use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (languages, flashcards, progress, quiz sessions,
/// and indexes).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS languages (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    slug TEXT NOT NULL UNIQUE,
                    is_generated INTEGER NOT NULL DEFAULT 0
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS flashcards (
                    id INTEGER PRIMARY KEY,
                    language_id INTEGER NOT NULL,
                    keyword TEXT NOT NULL,
                    question TEXT NOT NULL,
                    answer TEXT NOT NULL,
                    code_example TEXT NOT NULL,
                    distractors TEXT NOT NULL DEFAULT '[]',
                    FOREIGN KEY (language_id) REFERENCES languages(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress (
                    user_id INTEGER NOT NULL,
                    flashcard_id INTEGER NOT NULL,
                    language_id INTEGER NOT NULL,
                    correct INTEGER NOT NULL CHECK (correct >= 0),
                    incorrect INTEGER NOT NULL CHECK (incorrect >= 0),
                    last_practiced TEXT NOT NULL,
                    mastery_level TEXT NOT NULL,
                    PRIMARY KEY (user_id, flashcard_id),
                    FOREIGN KEY (flashcard_id) REFERENCES flashcards(id) ON DELETE CASCADE,
                    FOREIGN KEY (language_id) REFERENCES languages(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quiz_sessions (
                    token TEXT PRIMARY KEY,
                    user_id INTEGER NOT NULL,
                    language_slug TEXT NOT NULL,
                    questions TEXT NOT NULL,
                    started_at TEXT NOT NULL,
                    expires_at TEXT NOT NULL,
                    is_completed INTEGER NOT NULL DEFAULT 0,
                    completed_at TEXT,
                    answers TEXT,
                    score INTEGER
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_flashcards_language ON flashcards(language_id);",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_progress_user_language ON progress(user_id, language_id);",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON quiz_sessions(expires_at);",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (1, ?1)")
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    Ok(())
}
