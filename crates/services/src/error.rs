//! Shared error types for the services crate.

use thiserror::Error;

use codecards_core::model::{QuizQuestionError, QuizSessionError};
use storage::repository::StorageError;

/// Errors emitted by `PracticeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error("language not found: {0}")]
    LanguageNotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizService`.
///
/// A session looked up with the wrong user deliberately surfaces as
/// `SessionNotFound` so a foreign token leaks nothing about whether the
/// session exists.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("language not found: {0}")]
    LanguageNotFound(String),

    #[error("no flashcards available")]
    NoFlashcards,

    #[error("not enough material to build {needed} wrong options for flashcard {flashcard_id}")]
    InsufficientDistractors {
        flashcard_id: codecards_core::model::FlashcardId,
        needed: usize,
    },

    #[error("session not found")]
    SessionNotFound,

    #[error("session already completed")]
    AlreadyCompleted,

    #[error("session expired, time limit exceeded")]
    Expired,

    #[error("quiz results not found or quiz not completed")]
    ResultsNotFound,

    #[error(transparent)]
    Question(#[from] QuizQuestionError),

    #[error(transparent)]
    Session(#[from] QuizSessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<PracticeError> for QuizError {
    fn from(err: PracticeError) -> Self {
        match err {
            PracticeError::LanguageNotFound(slug) => Self::LanguageNotFound(slug),
            PracticeError::Storage(e) => Self::Storage(e),
        }
    }
}
