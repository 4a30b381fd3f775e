use chrono::{DateTime, Utc};

use crate::mastery::MasteryLevel;
use crate::model::ids::{FlashcardId, LanguageId, UserId};

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// Per-user practice history for one flashcard.
///
/// Exactly one record exists per (user, flashcard) pair; it is created
/// lazily on the first recorded attempt and never deleted. The mastery
/// level is always derived from the running counters, never stored state
/// that drifts from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    pub user_id: UserId,
    pub flashcard_id: FlashcardId,
    pub language_id: LanguageId,
    pub correct: u32,
    pub incorrect: u32,
    pub last_practiced: DateTime<Utc>,
    pub mastery_level: MasteryLevel,
}

impl ProgressRecord {
    /// Create the record for a user's first attempt at a flashcard.
    #[must_use]
    pub fn first_attempt(
        user_id: UserId,
        flashcard_id: FlashcardId,
        language_id: LanguageId,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let correct = u32::from(is_correct);
        let incorrect = u32::from(!is_correct);
        Self {
            user_id,
            flashcard_id,
            language_id,
            correct,
            incorrect,
            last_practiced: now,
            mastery_level: MasteryLevel::evaluate(correct, incorrect),
        }
    }

    /// Apply one practice result: bump the matching counter, stamp the
    /// practice time, and re-evaluate the mastery tier from scratch.
    pub fn record_attempt(&mut self, is_correct: bool, now: DateTime<Utc>) {
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        } else {
            self.incorrect = self.incorrect.saturating_add(1);
        }
        self.last_practiced = now;
        self.mastery_level = MasteryLevel::evaluate(self.correct, self.incorrect);
    }

    /// Total attempts recorded.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.correct + self.incorrect
    }

    /// Accuracy as a percentage, 0 when nothing has been attempted.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.attempts();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.correct) / f64::from(total) * 100.0
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
