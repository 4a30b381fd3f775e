use thiserror::Error;

use crate::model::ids::LanguageId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LanguageError {
    #[error("language name cannot be empty")]
    EmptyName,

    #[error("language slug cannot be empty")]
    EmptySlug,

    #[error("language slug must be lowercase alphanumeric with dashes: {0}")]
    InvalidSlug(String),
}

//
// ─── LANGUAGE ──────────────────────────────────────────────────────────────────
//

/// A programming language whose keywords have flashcards.
///
/// The slug is the stable external handle ("python", "rust"); all practice
/// and quiz operations address a language by slug. `is_generated` marks
/// languages whose flashcard set has been produced, and only those count
/// toward cross-language progress summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    id: LanguageId,
    name: String,
    slug: String,
    is_generated: bool,
}

impl Language {
    /// Create a language, validating name and slug.
    ///
    /// # Errors
    ///
    /// Returns `LanguageError` if the name is empty or the slug is empty
    /// or contains characters outside `[a-z0-9-]`.
    pub fn new(
        id: LanguageId,
        name: impl Into<String>,
        slug: impl Into<String>,
        is_generated: bool,
    ) -> Result<Self, LanguageError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LanguageError::EmptyName);
        }

        let slug = slug.into();
        if slug.is_empty() {
            return Err(LanguageError::EmptySlug);
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(LanguageError::InvalidSlug(slug));
        }

        Ok(Self {
            id,
            name,
            slug,
            is_generated,
        })
    }

    #[must_use]
    pub fn id(&self) -> LanguageId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.is_generated
    }

    /// Mark the language's flashcard set as generated.
    pub fn set_generated(&mut self, generated: bool) {
        self.is_generated = generated;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
