#![forbid(unsafe_code)]

pub mod error;
pub mod practice;
pub mod quiz;

pub use codecards_core::Clock;

pub use error::{PracticeError, QuizError};
pub use practice::{LanguageStats, PracticeResult, PracticeService, UserProgressSummary};
pub use quiz::{
    QuizAnswerReview, QuizResults, QuizService, DEFAULT_TIME_LIMIT_MINUTES,
    PASS_THRESHOLD_PERCENT, SESSION_RETENTION_HOURS,
};
