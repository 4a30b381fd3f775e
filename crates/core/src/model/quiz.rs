use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{FlashcardId, SessionToken, UserId};

/// Every quiz question carries one correct option plus four wrong ones.
pub const OPTIONS_PER_QUESTION: usize = 5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizQuestionError {
    #[error("question needs exactly {OPTIONS_PER_QUESTION} options, got {len}")]
    WrongOptionCount { len: usize },

    #[error("correct option id {id} does not match exactly one option")]
    CorrectOptionMissing { id: String },

    #[error("duplicate option id: {id}")]
    DuplicateOptionId { id: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("session has no questions")]
    NoQuestions,

    #[error("time limit must be positive")]
    InvalidTimeLimit,

    #[error("expires_at is before started_at")]
    InvalidTimeRange,

    #[error("session already completed")]
    AlreadyCompleted,

    #[error("session expired before completion")]
    Expired,

    #[error("completed_at, answers, and score must be persisted together")]
    CompletionMismatch,
}

//
// ─── OPTIONS & QUESTIONS ───────────────────────────────────────────────────────
//

/// One selectable answer in a multiple-choice question.
///
/// The correct option's id is the flashcard id itself; wrong options carry
/// synthetic `distractor_<n>_<flashcardId>` ids or, for fallback options
/// sampled from other flashcards, that flashcard's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: String,
    pub text: String,
}

impl QuizOption {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A multiple-choice question frozen into a session.
///
/// Questions are generated once when the session opens and stored verbatim
/// so grading stays reproducible even if the underlying flashcard is later
/// edited or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    flashcard_id: FlashcardId,
    keyword: String,
    options: Vec<QuizOption>,
    correct_option_id: String,
}

impl QuizQuestion {
    /// Build a question, enforcing the five-option shape.
    ///
    /// # Errors
    ///
    /// Returns `QuizQuestionError` if the option count is wrong, option ids
    /// repeat, or the correct id does not name exactly one option.
    pub fn new(
        flashcard_id: FlashcardId,
        keyword: impl Into<String>,
        options: Vec<QuizOption>,
        correct_option_id: impl Into<String>,
    ) -> Result<Self, QuizQuestionError> {
        if options.len() != OPTIONS_PER_QUESTION {
            return Err(QuizQuestionError::WrongOptionCount { len: options.len() });
        }
        for (i, opt) in options.iter().enumerate() {
            if options[..i].iter().any(|other| other.id == opt.id) {
                return Err(QuizQuestionError::DuplicateOptionId {
                    id: opt.id.clone(),
                });
            }
        }

        let correct_option_id = correct_option_id.into();
        if !options.iter().any(|opt| opt.id == correct_option_id) {
            return Err(QuizQuestionError::CorrectOptionMissing {
                id: correct_option_id,
            });
        }

        Ok(Self {
            flashcard_id,
            keyword: keyword.into(),
            options,
            correct_option_id,
        })
    }

    #[must_use]
    pub fn flashcard_id(&self) -> FlashcardId {
        self.flashcard_id
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    #[must_use]
    pub fn options(&self) -> &[QuizOption] {
        &self.options
    }

    #[must_use]
    pub fn correct_option_id(&self) -> &str {
        &self.correct_option_id
    }

    /// Whether the selected option is the stored correct one.
    ///
    /// Correctness is always derived here from the session snapshot; a
    /// client-asserted flag is never trusted.
    #[must_use]
    pub fn is_correct(&self, selected_option_id: &str) -> bool {
        self.correct_option_id == selected_option_id
    }

    /// Text of the given option, if it exists on this question.
    #[must_use]
    pub fn option_text(&self, option_id: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|opt| opt.id == option_id)
            .map(|opt| opt.text.as_str())
    }

    /// Text of the correct option.
    #[must_use]
    pub fn correct_text(&self) -> &str {
        self.option_text(&self.correct_option_id)
            .unwrap_or_default()
    }
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// One answer as submitted by a client.
///
/// Deliberately carries no correctness flag; grading recomputes it against
/// the session's stored questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub flashcard_id: FlashcardId,
    pub selected_option_id: String,
}

/// A graded answer as fixed into a completed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub flashcard_id: FlashcardId,
    pub selected_option_id: String,
    pub correct_option_id: String,
    pub is_correct: bool,
}

/// Outcome of grading a submission against a session's questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedSubmission {
    pub answers: Vec<AnswerRecord>,
    pub score: u32,
}

//
// ─── VALIDITY ──────────────────────────────────────────────────────────────────
//

/// Result of validating a session ahead of grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionValidity {
    Valid,
    NotFound,
    AlreadyCompleted,
    Expired,
}

impl SessionValidity {
    #[must_use]
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    #[must_use]
    pub fn is_expired(self) -> bool {
        matches!(self, Self::Expired)
    }

    /// Human-readable reason fed back to the client.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Valid => "session is valid",
            Self::NotFound => "session not found",
            Self::AlreadyCompleted => "already completed",
            Self::Expired => "expired, time limit exceeded",
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// A time-boxed, single-use quiz attempt.
///
/// Opens with its full question set embedded, stays open until exactly one
/// grading transition fixes answers and score, and is rejected for grading
/// once the wall clock passes `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    token: SessionToken,
    user_id: UserId,
    language_slug: String,
    questions: Vec<QuizQuestion>,
    started_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    is_completed: bool,
    completed_at: Option<DateTime<Utc>>,
    answers: Option<Vec<AnswerRecord>>,
    score: Option<u32>,
}

impl QuizSession {
    /// Open a new session with a freshly generated token.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::NoQuestions` for an empty question set
    /// and `InvalidTimeLimit` for a non-positive time limit.
    pub fn open(
        user_id: UserId,
        language_slug: impl Into<String>,
        questions: Vec<QuizQuestion>,
        started_at: DateTime<Utc>,
        time_limit: Duration,
    ) -> Result<Self, QuizSessionError> {
        if questions.is_empty() {
            return Err(QuizSessionError::NoQuestions);
        }
        if time_limit <= Duration::zero() {
            return Err(QuizSessionError::InvalidTimeLimit);
        }

        Ok(Self {
            token: SessionToken::generate(),
            user_id,
            language_slug: language_slug.into(),
            questions,
            started_at,
            expires_at: started_at + time_limit,
            is_completed: false,
            completed_at: None,
            answers: None,
            score: None,
        })
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTimeRange` if the expiry precedes the start, and
    /// `CompletionMismatch` if completion fields are only partially set.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        token: SessionToken,
        user_id: UserId,
        language_slug: String,
        questions: Vec<QuizQuestion>,
        started_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        answers: Option<Vec<AnswerRecord>>,
        score: Option<u32>,
    ) -> Result<Self, QuizSessionError> {
        if expires_at < started_at {
            return Err(QuizSessionError::InvalidTimeRange);
        }
        let is_completed = completed_at.is_some();
        if is_completed != answers.is_some() || is_completed != score.is_some() {
            return Err(QuizSessionError::CompletionMismatch);
        }

        Ok(Self {
            token,
            user_id,
            language_slug,
            questions,
            started_at,
            expires_at,
            is_completed,
            completed_at,
            answers,
            score,
        })
    }

    #[must_use]
    pub fn token(&self) -> SessionToken {
        self.token
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn language_slug(&self) -> &str {
        &self.language_slug
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn answers(&self) -> Option<&[AnswerRecord]> {
        self.answers.as_deref()
    }

    #[must_use]
    pub fn score(&self) -> Option<u32> {
        self.score
    }

    /// Stored question matching the given flashcard, if any.
    #[must_use]
    pub fn question_for(&self, flashcard_id: FlashcardId) -> Option<&QuizQuestion> {
        self.questions
            .iter()
            .find(|q| q.flashcard_id() == flashcard_id)
    }

    /// Check the session's state at a point in time, in the order the API
    /// reports it: completed first, then expiry.
    #[must_use]
    pub fn validity(&self, now: DateTime<Utc>) -> SessionValidity {
        if self.is_completed {
            SessionValidity::AlreadyCompleted
        } else if now > self.expires_at {
            SessionValidity::Expired
        } else {
            SessionValidity::Valid
        }
    }

    /// Grade a submission against the stored questions.
    ///
    /// Correctness is recomputed from each question's `correct_option_id`.
    /// Answers naming a flashcard outside the session, and repeat answers
    /// for an already-answered flashcard, are dropped rather than failing
    /// the whole submission.
    #[must_use]
    pub fn grade(&self, submitted: &[SubmittedAnswer]) -> GradedSubmission {
        let mut answers: Vec<AnswerRecord> = Vec::with_capacity(submitted.len());

        for answer in submitted {
            let Some(question) = self.question_for(answer.flashcard_id) else {
                continue;
            };
            if answers
                .iter()
                .any(|a| a.flashcard_id == answer.flashcard_id)
            {
                continue;
            }
            answers.push(AnswerRecord {
                flashcard_id: answer.flashcard_id,
                selected_option_id: answer.selected_option_id.clone(),
                correct_option_id: question.correct_option_id().to_string(),
                is_correct: question.is_correct(&answer.selected_option_id),
            });
        }

        let score = answers.iter().filter(|a| a.is_correct).count();
        let score = u32::try_from(score).unwrap_or(u32::MAX);

        GradedSubmission { answers, score }
    }

    /// Apply the one-shot completion transition.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyCompleted` if the transition already happened and
    /// `Expired` if `now` is past the session's expiry.
    pub fn complete(
        &mut self,
        graded: GradedSubmission,
        now: DateTime<Utc>,
    ) -> Result<(), QuizSessionError> {
        match self.validity(now) {
            SessionValidity::AlreadyCompleted => Err(QuizSessionError::AlreadyCompleted),
            SessionValidity::Expired => Err(QuizSessionError::Expired),
            _ => {
                self.is_completed = true;
                self.completed_at = Some(now);
                self.score = Some(graded.score);
                self.answers = Some(graded.answers);
                Ok(())
            }
        }
    }

    /// Wall-clock time between start and completion, if completed.
    #[must_use]
    pub fn time_taken(&self) -> Option<Duration> {
        self.completed_at.map(|done| done - self.started_at)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn options_for(card: u64) -> Vec<QuizOption> {
        let mut opts = vec![QuizOption::new(card.to_string(), format!("answer {card}"))];
        for i in 0..4 {
            opts.push(QuizOption::new(
                format!("distractor_{i}_{card}"),
                format!("wrong {i}"),
            ));
        }
        opts
    }

    fn question(card: u64) -> QuizQuestion {
        QuizQuestion::new(
            FlashcardId::new(card),
            format!("kw{card}"),
            options_for(card),
            card.to_string(),
        )
        .unwrap()
    }

    fn session(cards: &[u64]) -> QuizSession {
        QuizSession::open(
            UserId::new(1),
            "python",
            cards.iter().copied().map(question).collect(),
            fixed_now(),
            Duration::minutes(10),
        )
        .unwrap()
    }

    #[test]
    fn question_requires_exactly_five_options() {
        let mut opts = options_for(1);
        opts.pop();
        let err = QuizQuestion::new(FlashcardId::new(1), "kw", opts, "1").unwrap_err();
        assert!(matches!(err, QuizQuestionError::WrongOptionCount { len: 4 }));
    }

    #[test]
    fn question_rejects_unknown_correct_id() {
        let err =
            QuizQuestion::new(FlashcardId::new(1), "kw", options_for(1), "999").unwrap_err();
        assert!(matches!(err, QuizQuestionError::CorrectOptionMissing { .. }));
    }

    #[test]
    fn question_rejects_duplicate_option_ids() {
        let mut opts = options_for(1);
        opts[4].id = opts[1].id.clone();
        let err = QuizQuestion::new(FlashcardId::new(1), "kw", opts, "1").unwrap_err();
        assert!(matches!(err, QuizQuestionError::DuplicateOptionId { .. }));
    }

    #[test]
    fn open_rejects_empty_question_set() {
        let err = QuizSession::open(
            UserId::new(1),
            "python",
            vec![],
            fixed_now(),
            Duration::minutes(10),
        )
        .unwrap_err();
        assert_eq!(err, QuizSessionError::NoQuestions);
    }

    #[test]
    fn open_sets_expiry_from_time_limit() {
        let s = session(&[1]);
        assert_eq!(s.expires_at(), s.started_at() + Duration::minutes(10));
        assert!(!s.is_completed());
    }

    #[test]
    fn fresh_tokens_differ_between_sessions() {
        assert_ne!(session(&[1]).token(), session(&[1]).token());
    }

    #[test]
    fn validity_reports_expired_past_deadline() {
        let s = session(&[1]);
        let validity = s.validity(s.expires_at() + Duration::seconds(1));
        assert!(validity.is_expired());
        assert_eq!(validity.message(), "expired, time limit exceeded");
    }

    #[test]
    fn validity_is_valid_at_exact_deadline() {
        let s = session(&[1]);
        assert!(s.validity(s.expires_at()).is_valid());
    }

    #[test]
    fn grade_recomputes_correctness_from_snapshot() {
        let s = session(&[1, 2]);
        let graded = s.grade(&[
            SubmittedAnswer {
                flashcard_id: FlashcardId::new(1),
                selected_option_id: "1".into(),
            },
            SubmittedAnswer {
                flashcard_id: FlashcardId::new(2),
                selected_option_id: "distractor_0_2".into(),
            },
        ]);

        assert_eq!(graded.score, 1);
        assert!(graded.answers[0].is_correct);
        assert!(!graded.answers[1].is_correct);
        assert_eq!(graded.answers[1].correct_option_id, "2");
    }

    #[test]
    fn grade_drops_answers_for_foreign_flashcards() {
        let s = session(&[1]);
        let graded = s.grade(&[SubmittedAnswer {
            flashcard_id: FlashcardId::new(42),
            selected_option_id: "42".into(),
        }]);
        assert!(graded.answers.is_empty());
        assert_eq!(graded.score, 0);
    }

    #[test]
    fn grade_keeps_first_answer_per_flashcard() {
        let s = session(&[1]);
        let graded = s.grade(&[
            SubmittedAnswer {
                flashcard_id: FlashcardId::new(1),
                selected_option_id: "distractor_0_1".into(),
            },
            SubmittedAnswer {
                flashcard_id: FlashcardId::new(1),
                selected_option_id: "1".into(),
            },
        ]);
        assert_eq!(graded.answers.len(), 1);
        assert_eq!(graded.score, 0);
    }

    #[test]
    fn complete_is_one_shot() {
        let mut s = session(&[1]);
        let graded = s.grade(&[SubmittedAnswer {
            flashcard_id: FlashcardId::new(1),
            selected_option_id: "1".into(),
        }]);

        s.complete(graded.clone(), fixed_now() + Duration::minutes(1))
            .unwrap();
        assert_eq!(s.score(), Some(1));
        assert!(s.is_completed());

        let err = s
            .complete(graded, fixed_now() + Duration::minutes(2))
            .unwrap_err();
        assert_eq!(err, QuizSessionError::AlreadyCompleted);
        assert_eq!(s.score(), Some(1));
    }

    #[test]
    fn complete_rejects_expired_session() {
        let mut s = session(&[1]);
        let graded = s.grade(&[]);
        let err = s
            .complete(graded, fixed_now() + Duration::minutes(11))
            .unwrap_err();
        assert_eq!(err, QuizSessionError::Expired);
        assert!(!s.is_completed());
    }

    #[test]
    fn from_persisted_rejects_partial_completion() {
        let s = session(&[1]);
        let err = QuizSession::from_persisted(
            s.token(),
            s.user_id(),
            s.language_slug().to_string(),
            s.questions().to_vec(),
            s.started_at(),
            s.expires_at(),
            Some(fixed_now()),
            None,
            Some(1),
        )
        .unwrap_err();
        assert_eq!(err, QuizSessionError::CompletionMismatch);
    }

    #[test]
    fn time_taken_spans_start_to_completion() {
        let mut s = session(&[1]);
        let graded = s.grade(&[]);
        s.complete(graded, fixed_now() + Duration::seconds(95))
            .unwrap();
        assert_eq!(s.time_taken(), Some(Duration::seconds(95)));
    }
}
