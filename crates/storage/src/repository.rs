use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codecards_core::model::{
    AnswerRecord, Flashcard, FlashcardId, Language, LanguageId, ProgressRecord, QuizSession,
    SessionToken, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for languages.
#[async_trait]
pub trait LanguageRepository: Send + Sync {
    /// Persist or update a language.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the language cannot be stored.
    async fn upsert_language(&self, language: &Language) -> Result<(), StorageError>;

    /// Fetch a language by slug. `None` when the slug is unknown.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_language_by_slug(&self, slug: &str) -> Result<Option<Language>, StorageError>;

    /// All languages whose flashcard set has been generated.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_generated_languages(&self) -> Result<Vec<Language>, StorageError>;
}

/// Repository contract for flashcards.
#[async_trait]
pub trait FlashcardRepository: Send + Sync {
    /// Persist or update a flashcard.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the flashcard cannot be stored.
    async fn upsert_flashcard(&self, flashcard: &Flashcard) -> Result<(), StorageError>;

    /// Fetch one flashcard. `None` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_flashcard(&self, id: FlashcardId) -> Result<Option<Flashcard>, StorageError>;

    /// All flashcards belonging to a language.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_by_language(
        &self,
        language_id: LanguageId,
    ) -> Result<Vec<Flashcard>, StorageError>;

    /// Number of flashcards belonging to a language.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn count_by_language(&self, language_id: LanguageId) -> Result<u64, StorageError>;
}

/// Repository contract for per-user flashcard progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the record for one (user, flashcard) pair, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_progress(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// All of the user's records for one language.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_progress_by_language(
        &self,
        user_id: UserId,
        language_id: LanguageId,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Record one practice attempt for a (user, flashcard) pair.
    ///
    /// The increment must be atomic at the storage layer (upsert-increment,
    /// never read-modify-write) so concurrent submissions each count exactly
    /// once. The mastery tier is re-evaluated from the post-increment
    /// counters and the updated record returned.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn apply_attempt(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
        language_id: LanguageId,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError>;
}

/// Repository contract for quiz sessions.
///
/// Sessions are always addressed by (token, user): a session belongs
/// strictly to the user who opened it, and a lookup with someone else's
/// token behaves exactly like a missing session.
#[async_trait]
pub trait QuizSessionRepository: Send + Sync {
    /// Persist a freshly opened session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the token already exists.
    async fn insert_session(&self, session: &QuizSession) -> Result<(), StorageError>;

    /// Fetch a session scoped by token and owner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_session(
        &self,
        token: SessionToken,
        user_id: UserId,
    ) -> Result<Option<QuizSession>, StorageError>;

    /// Complete a session if and only if it has not been completed yet.
    ///
    /// This is the serialization point for grading: of two concurrent
    /// completion attempts exactly one observes `true`. Returns `false`
    /// when the session was already completed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no session exists for the
    /// (token, user) pair.
    async fn complete_session(
        &self,
        token: SessionToken,
        user_id: UserId,
        answers: &[AnswerRecord],
        score: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// Delete sessions whose expiry is before the cutoff. Advisory cleanup;
    /// returns the number of sessions removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn purge_sessions_expired_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    languages: Arc<Mutex<HashMap<LanguageId, Language>>>,
    flashcards: Arc<Mutex<HashMap<FlashcardId, Flashcard>>>,
    progress: Arc<Mutex<HashMap<(UserId, FlashcardId), ProgressRecord>>>,
    sessions: Arc<Mutex<HashMap<SessionToken, QuizSession>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl LanguageRepository for InMemoryRepository {
    async fn upsert_language(&self, language: &Language) -> Result<(), StorageError> {
        let mut guard = self.languages.lock().map_err(lock_err)?;
        guard.insert(language.id(), language.clone());
        Ok(())
    }

    async fn get_language_by_slug(&self, slug: &str) -> Result<Option<Language>, StorageError> {
        let guard = self.languages.lock().map_err(lock_err)?;
        Ok(guard.values().find(|l| l.slug() == slug).cloned())
    }

    async fn list_generated_languages(&self) -> Result<Vec<Language>, StorageError> {
        let guard = self.languages.lock().map_err(lock_err)?;
        let mut langs: Vec<Language> = guard.values().filter(|l| l.is_generated()).cloned().collect();
        langs.sort_by_key(|l| l.id().value());
        Ok(langs)
    }
}

#[async_trait]
impl FlashcardRepository for InMemoryRepository {
    async fn upsert_flashcard(&self, flashcard: &Flashcard) -> Result<(), StorageError> {
        let mut guard = self.flashcards.lock().map_err(lock_err)?;
        guard.insert(flashcard.id(), flashcard.clone());
        Ok(())
    }

    async fn get_flashcard(&self, id: FlashcardId) -> Result<Option<Flashcard>, StorageError> {
        let guard = self.flashcards.lock().map_err(lock_err)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_by_language(
        &self,
        language_id: LanguageId,
    ) -> Result<Vec<Flashcard>, StorageError> {
        let guard = self.flashcards.lock().map_err(lock_err)?;
        let mut cards: Vec<Flashcard> = guard
            .values()
            .filter(|c| c.language_id() == language_id)
            .cloned()
            .collect();
        cards.sort_by_key(|c| c.id().value());
        Ok(cards)
    }

    async fn count_by_language(&self, language_id: LanguageId) -> Result<u64, StorageError> {
        let guard = self.flashcards.lock().map_err(lock_err)?;
        let count = guard
            .values()
            .filter(|c| c.language_id() == language_id)
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self.progress.lock().map_err(lock_err)?;
        Ok(guard.get(&(user_id, flashcard_id)).cloned())
    }

    async fn list_progress_by_language(
        &self,
        user_id: UserId,
        language_id: LanguageId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self.progress.lock().map_err(lock_err)?;
        let mut records: Vec<ProgressRecord> = guard
            .values()
            .filter(|p| p.user_id == user_id && p.language_id == language_id)
            .cloned()
            .collect();
        records.sort_by_key(|p| p.flashcard_id.value());
        Ok(records)
    }

    async fn apply_attempt(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
        language_id: LanguageId,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError> {
        // The whole upsert happens under one lock, matching the atomic
        // increment the SQL backend gets from its ON CONFLICT clause.
        let mut guard = self.progress.lock().map_err(lock_err)?;
        let record = guard
            .entry((user_id, flashcard_id))
            .and_modify(|p| p.record_attempt(is_correct, now))
            .or_insert_with(|| {
                ProgressRecord::first_attempt(user_id, flashcard_id, language_id, is_correct, now)
            });
        Ok(record.clone())
    }
}

#[async_trait]
impl QuizSessionRepository for InMemoryRepository {
    async fn insert_session(&self, session: &QuizSession) -> Result<(), StorageError> {
        let mut guard = self.sessions.lock().map_err(lock_err)?;
        if guard.contains_key(&session.token()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(session.token(), session.clone());
        Ok(())
    }

    async fn get_session(
        &self,
        token: SessionToken,
        user_id: UserId,
    ) -> Result<Option<QuizSession>, StorageError> {
        let guard = self.sessions.lock().map_err(lock_err)?;
        Ok(guard
            .get(&token)
            .filter(|s| s.user_id() == user_id)
            .cloned())
    }

    async fn complete_session(
        &self,
        token: SessionToken,
        user_id: UserId,
        answers: &[AnswerRecord],
        score: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut guard = self.sessions.lock().map_err(lock_err)?;
        let Some(session) = guard.get_mut(&token).filter(|s| s.user_id() == user_id) else {
            return Err(StorageError::NotFound);
        };

        if session.is_completed() {
            return Ok(false);
        }

        let completed = QuizSession::from_persisted(
            session.token(),
            session.user_id(),
            session.language_slug().to_string(),
            session.questions().to_vec(),
            session.started_at(),
            session.expires_at(),
            Some(completed_at),
            Some(answers.to_vec()),
            Some(score),
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

        *session = completed;
        Ok(true)
    }

    async fn purge_sessions_expired_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let mut guard = self.sessions.lock().map_err(lock_err)?;
        let before = guard.len();
        guard.retain(|_, s| s.expires_at() >= cutoff);
        Ok((before - guard.len()) as u64)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub languages: Arc<dyn LanguageRepository>,
    pub flashcards: Arc<dyn FlashcardRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub sessions: Arc<dyn QuizSessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let languages: Arc<dyn LanguageRepository> = Arc::new(repo.clone());
        let flashcards: Arc<dyn FlashcardRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn QuizSessionRepository> = Arc::new(repo);
        Self {
            languages,
            flashcards,
            progress,
            sessions,
        }
    }
}
