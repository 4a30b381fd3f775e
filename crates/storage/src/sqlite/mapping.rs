use codecards_core::MasteryLevel;
use codecards_core::model::{
    AnswerRecord, Flashcard, FlashcardId, Language, LanguageId, ProgressRecord, QuizQuestion,
    QuizSession, SessionToken, UserId,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn language_id_from_i64(v: i64) -> Result<LanguageId, StorageError> {
    Ok(LanguageId::new(i64_to_u64("language_id", v)?))
}

pub(crate) fn flashcard_id_from_i64(v: i64) -> Result<FlashcardId, StorageError> {
    Ok(FlashcardId::new(i64_to_u64("flashcard_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn map_language_row(row: &sqlx::sqlite::SqliteRow) -> Result<Language, StorageError> {
    Language::new(
        language_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<String, _>("slug").map_err(ser)?,
        row.try_get::<bool, _>("is_generated").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_flashcard_row(row: &sqlx::sqlite::SqliteRow) -> Result<Flashcard, StorageError> {
    let distractors: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("distractors").map_err(ser)?)
            .map_err(ser)?;

    Flashcard::new(
        flashcard_id_from_i64(row.try_get("id").map_err(ser)?)?,
        language_id_from_i64(row.try_get("language_id").map_err(ser)?)?,
        row.try_get::<String, _>("keyword").map_err(ser)?,
        row.try_get::<String, _>("question").map_err(ser)?,
        row.try_get::<String, _>("answer").map_err(ser)?,
        row.try_get::<String, _>("code_example").map_err(ser)?,
        distractors,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProgressRecord, StorageError> {
    let correct = u32::try_from(row.try_get::<i64, _>("correct").map_err(ser)?)
        .map_err(|_| StorageError::Serialization("correct out of range".into()))?;
    let incorrect = u32::try_from(row.try_get::<i64, _>("incorrect").map_err(ser)?)
        .map_err(|_| StorageError::Serialization("incorrect out of range".into()))?;
    let mastery_level: MasteryLevel = row
        .try_get::<String, _>("mastery_level")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    Ok(ProgressRecord {
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        flashcard_id: flashcard_id_from_i64(row.try_get("flashcard_id").map_err(ser)?)?,
        language_id: language_id_from_i64(row.try_get("language_id").map_err(ser)?)?,
        correct,
        incorrect,
        last_practiced: row.try_get("last_practiced").map_err(ser)?,
        mastery_level,
    })
}

pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<QuizSession, StorageError> {
    let token: SessionToken = row
        .try_get::<String, _>("token")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    let questions: Vec<QuizQuestion> =
        serde_json::from_str(&row.try_get::<String, _>("questions").map_err(ser)?)
            .map_err(ser)?;

    let answers: Option<Vec<AnswerRecord>> = row
        .try_get::<Option<String>, _>("answers")
        .map_err(ser)?
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(ser)?;

    let score = row
        .try_get::<Option<i64>, _>("score")
        .map_err(ser)?
        .map(|s| {
            u32::try_from(s).map_err(|_| StorageError::Serialization("score out of range".into()))
        })
        .transpose()?;

    QuizSession::from_persisted(
        token,
        user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        row.try_get::<String, _>("language_slug").map_err(ser)?,
        questions,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("expires_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        answers,
        score,
    )
    .map_err(ser)
}
