use thiserror::Error;

use crate::model::ids::{FlashcardId, LanguageId};

/// Number of wrong options each quiz question needs.
pub const DISTRACTORS_PER_CARD: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlashcardError {
    #[error("flashcard keyword cannot be empty")]
    EmptyKeyword,

    #[error("flashcard question cannot be empty")]
    EmptyQuestion,

    #[error("flashcard answer cannot be empty")]
    EmptyAnswer,

    #[error("too many distractors: {len} (maximum {DISTRACTORS_PER_CARD})")]
    TooManyDistractors { len: usize },
}

//
// ─── FLASHCARD ─────────────────────────────────────────────────────────────────
//

/// One keyword flashcard belonging to a language.
///
/// Flashcards are immutable once generated except for distractor backfill:
/// cards created before distractor generation existed carry fewer than
/// four and get topped up later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    id: FlashcardId,
    language_id: LanguageId,
    keyword: String,
    question: String,
    answer: String,
    code_example: String,
    distractors: Vec<String>,
}

impl Flashcard {
    /// Create a flashcard, validating its text fields.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError` if keyword, question, or answer is blank,
    /// or if more than [`DISTRACTORS_PER_CARD`] distractors are supplied.
    pub fn new(
        id: FlashcardId,
        language_id: LanguageId,
        keyword: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
        code_example: impl Into<String>,
        distractors: Vec<String>,
    ) -> Result<Self, FlashcardError> {
        let keyword = keyword.into();
        if keyword.trim().is_empty() {
            return Err(FlashcardError::EmptyKeyword);
        }
        let question = question.into();
        if question.trim().is_empty() {
            return Err(FlashcardError::EmptyQuestion);
        }
        let answer = answer.into();
        if answer.trim().is_empty() {
            return Err(FlashcardError::EmptyAnswer);
        }
        if distractors.len() > DISTRACTORS_PER_CARD {
            return Err(FlashcardError::TooManyDistractors {
                len: distractors.len(),
            });
        }

        Ok(Self {
            id,
            language_id,
            keyword,
            question,
            answer,
            code_example: code_example.into(),
            distractors,
        })
    }

    #[must_use]
    pub fn id(&self) -> FlashcardId {
        self.id
    }

    #[must_use]
    pub fn language_id(&self) -> LanguageId {
        self.language_id
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn code_example(&self) -> &str {
        &self.code_example
    }

    #[must_use]
    pub fn distractors(&self) -> &[String] {
        &self.distractors
    }

    /// Whether this card carries a full set of stored distractors.
    #[must_use]
    pub fn has_full_distractors(&self) -> bool {
        self.distractors.len() >= DISTRACTORS_PER_CARD
    }

    /// Backfill distractors on a card generated without them.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError::TooManyDistractors` if the new set exceeds
    /// [`DISTRACTORS_PER_CARD`].
    pub fn set_distractors(&mut self, distractors: Vec<String>) -> Result<(), FlashcardError> {
        if distractors.len() > DISTRACTORS_PER_CARD {
            return Err(FlashcardError::TooManyDistractors {
                len: distractors.len(),
            });
        }
        self.distractors = distractors;
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn card(distractors: Vec<String>) -> Result<Flashcard, FlashcardError> {
        Flashcard::new(
            FlashcardId::new(1),
            LanguageId::new(1),
            "match",
            "What does `match` do?",
            "Pattern matches a value against arms",
            "match x { 0 => a(), _ => b() }",
            distractors,
        )
    }

    #[test]
    fn builds_card_without_distractors() {
        let card = card(vec![]).unwrap();
        assert!(!card.has_full_distractors());
        assert_eq!(card.keyword(), "match");
    }

    #[test]
    fn builds_card_with_four_distractors() {
        let card = card(vec!["a".into(), "b".into(), "c".into(), "d".into()]).unwrap();
        assert!(card.has_full_distractors());
    }

    #[test]
    fn rejects_five_distractors() {
        let err = card(vec!["a".into(); 5]).unwrap_err();
        assert!(matches!(err, FlashcardError::TooManyDistractors { len: 5 }));
    }

    #[test]
    fn rejects_blank_keyword() {
        let err = Flashcard::new(
            FlashcardId::new(1),
            LanguageId::new(1),
            "  ",
            "q",
            "a",
            "",
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, FlashcardError::EmptyKeyword);
    }

    #[test]
    fn rejects_blank_answer() {
        let err = Flashcard::new(
            FlashcardId::new(1),
            LanguageId::new(1),
            "if",
            "q",
            " ",
            "",
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, FlashcardError::EmptyAnswer);
    }

    #[test]
    fn backfill_replaces_distractors() {
        let mut card = card(vec!["old".into()]).unwrap();
        card.set_distractors(vec!["a".into(), "b".into(), "c".into(), "d".into()])
            .unwrap();
        assert!(card.has_full_distractors());
        assert_eq!(card.distractors()[0], "a");
    }
}
