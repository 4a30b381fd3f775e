use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use codecards_core::model::{Flashcard, FlashcardId, Language, UserId};
use codecards_core::time::Clock;
use storage::repository::{FlashcardRepository, LanguageRepository, ProgressRepository};

use crate::error::PracticeError;

//
// ─── INPUT & VIEW TYPES ────────────────────────────────────────────────────────
//

/// One practice outcome as reported for a single flashcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeResult {
    pub flashcard_id: FlashcardId,
    pub is_correct: bool,
}

/// Aggregated progress for one user across one language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageStats {
    pub language: String,
    pub slug: String,
    pub total_flashcards: u64,
    pub practiced: u64,
    pub correct: u64,
    pub incorrect: u64,
    pub mastered: u64,
    pub average_accuracy: f64,
}

/// Aggregated progress for one user across every generated language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProgressSummary {
    pub total_languages: u64,
    pub languages_in_progress: u64,
    pub total_flashcards_practiced: u64,
    pub overall_accuracy: f64,
    pub language_stats: Vec<LanguageStats>,
}

/// Round to two decimal places for accuracy percentages.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Selects flashcards for practice and tracks per-card progress.
///
/// Selection ranks a language's cards into priority buckets from the
/// user's progress records: never-practiced first, then practiced but not
/// mastered, then mastered, with older practice times first inside each
/// bucket.
#[derive(Clone)]
pub struct PracticeService {
    clock: Clock,
    languages: Arc<dyn LanguageRepository>,
    flashcards: Arc<dyn FlashcardRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl PracticeService {
    #[must_use]
    pub fn new(
        clock: Clock,
        languages: Arc<dyn LanguageRepository>,
        flashcards: Arc<dyn FlashcardRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            languages,
            flashcards,
            progress,
        }
    }

    /// Resolve a language by slug.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::LanguageNotFound` for an unknown slug.
    pub async fn language_by_slug(&self, slug: &str) -> Result<Language, PracticeError> {
        self.languages
            .get_language_by_slug(slug)
            .await?
            .ok_or_else(|| PracticeError::LanguageNotFound(slug.to_string()))
    }

    /// Pick up to `limit` flashcards the user should practice next.
    ///
    /// Cards with no progress record sort as if practiced at the epoch, so
    /// a stable never-practiced-first order falls out of one sort key.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::LanguageNotFound` for an unknown slug or a
    /// storage error. A language with zero flashcards yields an empty list.
    pub async fn select_for_practice(
        &self,
        user_id: UserId,
        language_slug: &str,
        limit: usize,
    ) -> Result<Vec<Flashcard>, PracticeError> {
        let language = self.language_by_slug(language_slug).await?;
        let cards = self.flashcards.list_by_language(language.id()).await?;
        let records = self
            .progress
            .list_progress_by_language(user_id, language.id())
            .await?;

        let by_card: std::collections::HashMap<FlashcardId, _> = records
            .into_iter()
            .map(|p| (p.flashcard_id, p))
            .collect();

        let mut ranked: Vec<(u8, DateTime<Utc>, Flashcard)> = cards
            .into_iter()
            .map(|card| match by_card.get(&card.id()) {
                None => (0, DateTime::<Utc>::UNIX_EPOCH, card),
                Some(p) if p.mastery_level.is_mastered() => (2, p.last_practiced, card),
                Some(p) => (1, p.last_practiced, card),
            })
            .collect();

        ranked.sort_by_key(|(priority, last, card)| (*priority, *last, card.id().value()));

        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(_, _, card)| card)
            .collect())
    }

    /// Record a batch of practice results.
    ///
    /// Best-effort per item: results naming an unknown flashcard are
    /// skipped without rolling back the rest of the batch. Each recorded
    /// item is an atomic upsert-increment in storage, and the mastery tier
    /// is re-evaluated from the updated counters.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::LanguageNotFound` for an unknown slug or a
    /// storage error.
    pub async fn record_practice_results(
        &self,
        user_id: UserId,
        language_slug: &str,
        results: &[PracticeResult],
    ) -> Result<(), PracticeError> {
        let language = self.language_by_slug(language_slug).await?;
        let now = self.clock.now();

        for result in results {
            if self
                .flashcards
                .get_flashcard(result.flashcard_id)
                .await?
                .is_none()
            {
                log::debug!(
                    "skipping practice result for unknown flashcard {}",
                    result.flashcard_id
                );
                continue;
            }

            self.progress
                .apply_attempt(
                    user_id,
                    result.flashcard_id,
                    language.id(),
                    result.is_correct,
                    now,
                )
                .await?;
        }

        Ok(())
    }

    /// Aggregate the user's progress for one language.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::LanguageNotFound` for an unknown slug or a
    /// storage error.
    pub async fn summarize(
        &self,
        user_id: UserId,
        language_slug: &str,
    ) -> Result<LanguageStats, PracticeError> {
        let language = self.language_by_slug(language_slug).await?;
        self.summarize_language(user_id, &language).await
    }

    async fn summarize_language(
        &self,
        user_id: UserId,
        language: &Language,
    ) -> Result<LanguageStats, PracticeError> {
        let total_flashcards = self.flashcards.count_by_language(language.id()).await?;
        let records = self
            .progress
            .list_progress_by_language(user_id, language.id())
            .await?;

        let practiced = records.len() as u64;
        let correct: u64 = records.iter().map(|p| u64::from(p.correct)).sum();
        let incorrect: u64 = records.iter().map(|p| u64::from(p.incorrect)).sum();
        let mastered = records
            .iter()
            .filter(|p| p.mastery_level.is_mastered())
            .count() as u64;

        let attempts = correct + incorrect;
        let average_accuracy = if attempts > 0 {
            round2(correct as f64 / attempts as f64 * 100.0)
        } else {
            0.0
        };

        Ok(LanguageStats {
            language: language.name().to_string(),
            slug: language.slug().to_string(),
            total_flashcards,
            practiced,
            correct,
            incorrect,
            mastered,
            average_accuracy,
        })
    }

    /// Aggregate the user's progress across every generated language.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Storage` on storage failure.
    pub async fn summarize_all(&self, user_id: UserId) -> Result<UserProgressSummary, PracticeError> {
        let languages = self.languages.list_generated_languages().await?;

        let mut language_stats = Vec::with_capacity(languages.len());
        for language in &languages {
            language_stats.push(self.summarize_language(user_id, language).await?);
        }

        let total_languages = languages.len() as u64;
        let languages_in_progress = language_stats.iter().filter(|s| s.practiced > 0).count() as u64;
        let total_flashcards_practiced: u64 = language_stats.iter().map(|s| s.practiced).sum();

        let total_correct: u64 = language_stats.iter().map(|s| s.correct).sum();
        let total_incorrect: u64 = language_stats.iter().map(|s| s.incorrect).sum();
        let total_attempts = total_correct + total_incorrect;
        let overall_accuracy = if total_attempts > 0 {
            round2(total_correct as f64 / total_attempts as f64 * 100.0)
        } else {
            0.0
        };

        Ok(UserProgressSummary {
            total_languages,
            languages_in_progress,
            total_flashcards_practiced,
            overall_accuracy,
            language_stats,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
