use std::fmt;

use codecards_core::model::{Flashcard, FlashcardId, Language, LanguageId};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    language_id: LanguageId,
    language_name: String,
    language_slug: String,
    cards: u32,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidLanguageId { raw: String },
    InvalidCards { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLanguageId { raw } => write!(f, "invalid --language-id value: {raw}"),
            ArgsError::InvalidCards { raw } => write!(f, "invalid --cards value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("CODECARDS_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut language_id = std::env::var("CODECARDS_LANGUAGE_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| LanguageId::new(1), LanguageId::new);
        let mut language_name =
            std::env::var("CODECARDS_LANGUAGE_NAME").unwrap_or_else(|_| "Python".into());
        let mut language_slug =
            std::env::var("CODECARDS_LANGUAGE_SLUG").unwrap_or_else(|_| "python".into());
        let mut cards = std::env::var("CODECARDS_CARDS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(10);

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--language-id" => {
                    let value = require_value(&mut args, "--language-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLanguageId { raw: value.clone() })?;
                    language_id = LanguageId::new(parsed);
                }
                "--language-name" => {
                    language_name = require_value(&mut args, "--language-name")?;
                }
                "--language-slug" => {
                    language_slug = require_value(&mut args, "--language-slug")?;
                }
                "--cards" => {
                    let value = require_value(&mut args, "--cards")?;
                    cards = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCards { raw: value.clone() })?;
                }
                other => return Err(ArgsError::UnknownArg(other.to_string())),
            }
        }

        Ok(Self {
            db_url,
            language_id,
            language_name,
            language_slug,
            cards,
        })
    }
}

const KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "return", "break", "continue", "match", "fn", "let", "const",
    "struct", "enum", "impl", "trait", "mod", "use", "pub", "async", "await",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse()?;

    let storage = Storage::sqlite(&args.db_url).await?;

    let language = Language::new(
        args.language_id,
        args.language_name.clone(),
        args.language_slug.clone(),
        true,
    )?;
    storage.languages.upsert_language(&language).await?;

    let base = args.language_id.value() * 1_000;
    for n in 0..args.cards {
        let keyword = KEYWORDS[n as usize % KEYWORDS.len()];
        let distractors: Vec<String> = (0..4)
            .map(|d| format!("Plausible but wrong meaning {d} of `{keyword}`"))
            .collect();
        let card = Flashcard::new(
            FlashcardId::new(base + u64::from(n) + 1),
            args.language_id,
            keyword,
            format!("What does the `{keyword}` keyword do in {}?", args.language_name),
            format!("The `{keyword}` keyword controls program flow or declares an item."),
            format!("{keyword} ..."),
            distractors,
        )?;
        storage.flashcards.upsert_flashcard(&card).await?;
    }

    println!(
        "seeded language '{}' ({}) with {} flashcards into {}",
        args.language_name, args.language_slug, args.cards, args.db_url
    );

    Ok(())
}
