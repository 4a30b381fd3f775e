use std::sync::{Arc, Mutex, PoisonError};

use chrono::Duration;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::SeedableRng;
use serde::Serialize;

use codecards_core::model::{
    Flashcard, FlashcardId, GradedSubmission, QuizOption, QuizQuestion, QuizSession,
    SessionToken, SessionValidity, SubmittedAnswer, UserId, DISTRACTORS_PER_CARD,
};
use codecards_core::time::Clock;
use storage::repository::{FlashcardRepository, QuizSessionRepository};

use crate::error::QuizError;
use crate::practice::{PracticeResult, PracticeService};

/// Default wall-clock window for finishing a quiz.
pub const DEFAULT_TIME_LIMIT_MINUTES: i64 = 10;

/// Sessions older than this past their expiry are eligible for purging.
pub const SESSION_RETENTION_HOURS: i64 = 24;

/// Minimum score percentage counted as a pass.
pub const PASS_THRESHOLD_PERCENT: f64 = 70.0;

//
// ─── RESULT VIEWS ──────────────────────────────────────────────────────────────
//

/// One question of a completed quiz, joined with the graded answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizAnswerReview {
    pub flashcard_id: FlashcardId,
    pub keyword: String,
    pub your_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// Full results view for a completed quiz session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResults {
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f64,
    pub passed: bool,
    pub time_taken_seconds: i64,
    pub answers: Vec<QuizAnswerReview>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Builds, validates, grades, and reports on time-boxed quiz sessions.
///
/// The question set is frozen into the session when it opens, so grading
/// and the results view never depend on the live flashcard table.
pub struct QuizService {
    clock: Clock,
    time_limit: Duration,
    rng: Mutex<StdRng>,
    practice: PracticeService,
    flashcards: Arc<dyn FlashcardRepository>,
    sessions: Arc<dyn QuizSessionRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        practice: PracticeService,
        flashcards: Arc<dyn FlashcardRepository>,
        sessions: Arc<dyn QuizSessionRepository>,
    ) -> Self {
        Self {
            clock,
            time_limit: Duration::minutes(DEFAULT_TIME_LIMIT_MINUTES),
            rng: Mutex::new(StdRng::from_os_rng()),
            practice,
            flashcards,
            sessions,
        }
    }

    /// Override the session time limit.
    #[must_use]
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Seed the option shuffler, for reproducible question layouts in tests.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Open a quiz session over the user's next practice cards.
    ///
    /// Each question gets five shuffled options: the card's answer plus
    /// four wrong ones, taken from the card's stored distractors or, when
    /// those are missing, from other cards of the same language.
    ///
    /// # Errors
    ///
    /// Returns `LanguageNotFound` for an unknown slug, `NoFlashcards` when
    /// the selection is empty, and `InsufficientDistractors` when a card
    /// has no stored distractors and the language is too small to sample
    /// wrong answers from.
    pub async fn build_quiz(
        &self,
        user_id: UserId,
        language_slug: &str,
        limit: usize,
    ) -> Result<QuizSession, QuizError> {
        let language = self.practice.language_by_slug(language_slug).await?;
        let cards = self
            .practice
            .select_for_practice(user_id, language_slug, limit)
            .await?;
        if cards.is_empty() {
            return Err(QuizError::NoFlashcards);
        }
        let pool = self.flashcards.list_by_language(language.id()).await?;

        // Question building is pure once the card pool is in hand; keep the
        // rng lock out of any await point.
        let questions = {
            let mut guard = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let rng = &mut *guard;
            let mut questions = Vec::with_capacity(cards.len());
            for card in &cards {
                questions.push(build_question(card, &pool, rng)?);
            }
            questions
        };

        let session = QuizSession::open(
            user_id,
            language_slug,
            questions,
            self.clock.now(),
            self.time_limit,
        )?;
        self.sessions.insert_session(&session).await?;

        log::info!(
            "opened quiz session {} for user {user_id} on {language_slug} ({} questions)",
            session.token(),
            session.questions().len()
        );
        Ok(session)
    }

    /// Report a session's state without changing it.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` on storage failure.
    pub async fn validate_session(
        &self,
        token: SessionToken,
        user_id: UserId,
    ) -> Result<SessionValidity, QuizError> {
        let Some(session) = self.sessions.get_session(token, user_id).await? else {
            return Ok(SessionValidity::NotFound);
        };
        Ok(session.validity(self.clock.now()))
    }

    /// Grade a submission and complete the session.
    ///
    /// Correctness is recomputed against the session's stored questions;
    /// the submission carries only the selected option ids. Storage
    /// serializes the completion, so of two racing calls exactly one
    /// fixes the score.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, `AlreadyCompleted`, or `Expired` per the
    /// session's state at grading time.
    pub async fn complete_quiz(
        &self,
        token: SessionToken,
        user_id: UserId,
        submitted: &[SubmittedAnswer],
    ) -> Result<GradedSubmission, QuizError> {
        let (_, graded) = self.complete_inner(token, user_id, submitted).await?;
        Ok(graded)
    }

    async fn complete_inner(
        &self,
        token: SessionToken,
        user_id: UserId,
        submitted: &[SubmittedAnswer],
    ) -> Result<(QuizSession, GradedSubmission), QuizError> {
        let Some(session) = self.sessions.get_session(token, user_id).await? else {
            return Err(QuizError::SessionNotFound);
        };

        let now = self.clock.now();
        match session.validity(now) {
            SessionValidity::AlreadyCompleted => return Err(QuizError::AlreadyCompleted),
            SessionValidity::Expired => return Err(QuizError::Expired),
            SessionValidity::Valid | SessionValidity::NotFound => {}
        }

        let graded = session.grade(submitted);
        let won = self
            .sessions
            .complete_session(token, user_id, &graded.answers, graded.score, now)
            .await?;
        if !won {
            // Lost the race to a concurrent completion.
            return Err(QuizError::AlreadyCompleted);
        }

        log::info!(
            "completed quiz session {token} for user {user_id}: {}/{}",
            graded.score,
            session.questions().len()
        );
        Ok((session, graded))
    }

    /// Grade a submission, complete the session, and fold every graded
    /// answer into the user's practice progress.
    ///
    /// Completion happens first: a retried or duplicate submission fails
    /// with `AlreadyCompleted` before any progress is written, so each
    /// quiz counts toward mastery exactly once.
    ///
    /// # Errors
    ///
    /// Returns the same errors as `complete_quiz`, plus `LanguageNotFound`
    /// if the slug no longer resolves when recording progress.
    pub async fn submit_quiz_results(
        &self,
        token: SessionToken,
        user_id: UserId,
        language_slug: &str,
        submitted: &[SubmittedAnswer],
    ) -> Result<GradedSubmission, QuizError> {
        let (_, graded) = self.complete_inner(token, user_id, submitted).await?;

        let results: Vec<PracticeResult> = graded
            .answers
            .iter()
            .map(|a| PracticeResult {
                flashcard_id: a.flashcard_id,
                is_correct: a.is_correct,
            })
            .collect();
        self.practice
            .record_practice_results(user_id, language_slug, &results)
            .await?;

        Ok(graded)
    }

    /// Results view for a completed session.
    ///
    /// Questions the user never answered appear with an empty answer text
    /// and count as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `ResultsNotFound` when the session is missing, belongs to
    /// another user, or has not been completed.
    pub async fn get_results(
        &self,
        token: SessionToken,
        user_id: UserId,
    ) -> Result<QuizResults, QuizError> {
        let Some(session) = self.sessions.get_session(token, user_id).await? else {
            return Err(QuizError::ResultsNotFound);
        };
        let (Some(answers), Some(score)) = (session.answers(), session.score()) else {
            return Err(QuizError::ResultsNotFound);
        };

        let reviews: Vec<QuizAnswerReview> = session
            .questions()
            .iter()
            .map(|question| {
                let graded = answers
                    .iter()
                    .find(|a| a.flashcard_id == question.flashcard_id());
                let your_answer = graded
                    .and_then(|a| question.option_text(&a.selected_option_id))
                    .unwrap_or_default()
                    .to_string();
                QuizAnswerReview {
                    flashcard_id: question.flashcard_id(),
                    keyword: question.keyword().to_string(),
                    your_answer,
                    correct_answer: question.correct_text().to_string(),
                    is_correct: graded.is_some_and(|a| a.is_correct),
                }
            })
            .collect();

        let total_questions = session.questions().len() as u32;
        let percentage = if total_questions > 0 {
            (f64::from(score) / f64::from(total_questions) * 100.0).round()
        } else {
            0.0
        };
        let time_taken_seconds = session
            .time_taken()
            .map(|d| d.num_seconds())
            .unwrap_or_default();

        Ok(QuizResults {
            score,
            total_questions,
            percentage,
            passed: percentage >= PASS_THRESHOLD_PERCENT,
            time_taken_seconds,
            answers: reviews,
        })
    }

    /// Delete sessions whose expiry is more than the retention window in
    /// the past. Advisory; safe to run from any background cadence.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` on storage failure.
    pub async fn purge_stale_sessions(&self) -> Result<u64, QuizError> {
        let cutoff = self.clock.now() - Duration::hours(SESSION_RETENTION_HOURS);
        let removed = self.sessions.purge_sessions_expired_before(cutoff).await?;
        if removed > 0 {
            log::info!("purged {removed} stale quiz sessions");
        }
        Ok(removed)
    }
}

/// Assemble one five-option question for a card.
///
/// Stored distractors win; otherwise wrong options are sampled from other
/// cards of the same language, reusing those cards' ids and answers.
fn build_question(
    card: &Flashcard,
    pool: &[Flashcard],
    rng: &mut StdRng,
) -> Result<QuizQuestion, QuizError> {
    let correct_id = card.id().to_string();
    let mut options = vec![QuizOption::new(correct_id.clone(), card.answer())];

    if card.has_full_distractors() {
        for (i, text) in card
            .distractors()
            .iter()
            .take(DISTRACTORS_PER_CARD)
            .enumerate()
        {
            options.push(QuizOption::new(
                format!("distractor_{i}_{}", card.id()),
                text.clone(),
            ));
        }
    } else {
        let others: Vec<&Flashcard> = pool.iter().filter(|c| c.id() != card.id()).collect();
        if others.len() < DISTRACTORS_PER_CARD {
            return Err(QuizError::InsufficientDistractors {
                flashcard_id: card.id(),
                needed: DISTRACTORS_PER_CARD,
            });
        }
        for other in others.choose_multiple(rng, DISTRACTORS_PER_CARD) {
            options.push(QuizOption::new(other.id().to_string(), other.answer()));
        }
    }

    options.shuffle(rng);
    Ok(QuizQuestion::new(
        card.id(),
        card.keyword(),
        options,
        correct_id,
    )?)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
