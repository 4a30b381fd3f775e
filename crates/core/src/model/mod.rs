mod flashcard;
mod ids;
mod language;
mod progress;
mod quiz;

pub use flashcard::{DISTRACTORS_PER_CARD, Flashcard, FlashcardError};
pub use ids::{FlashcardId, LanguageId, ParseIdError, SessionToken, UserId};
pub use language::{Language, LanguageError};
pub use progress::ProgressRecord;
pub use quiz::{
    AnswerRecord, GradedSubmission, OPTIONS_PER_QUESTION, QuizOption, QuizQuestion,
    QuizQuestionError, QuizSession, QuizSessionError, SessionValidity, SubmittedAnswer,
};
