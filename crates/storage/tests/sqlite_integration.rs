use chrono::Duration;
use codecards_core::MasteryLevel;
use codecards_core::model::{
    Flashcard, FlashcardId, Language, LanguageId, QuizOption, QuizQuestion, QuizSession,
    SubmittedAnswer, UserId,
};
use codecards_core::time::fixed_now;
use storage::repository::{
    FlashcardRepository, LanguageRepository, ProgressRepository, QuizSessionRepository,
    StorageError,
};
use storage::sqlite::SqliteRepository;

fn build_language(id: u64, slug: &str) -> Language {
    Language::new(LanguageId::new(id), slug.to_uppercase(), slug, true).unwrap()
}

fn build_flashcard(id: u64, language_id: LanguageId, distractors: Vec<String>) -> Flashcard {
    Flashcard::new(
        FlashcardId::new(id),
        language_id,
        format!("kw{id}"),
        format!("What is kw{id}?"),
        format!("A{id}"),
        format!("// example {id}"),
        distractors,
    )
    .unwrap()
}

fn build_session(user: u64, card: u64) -> QuizSession {
    let options = vec![
        QuizOption::new(card.to_string(), format!("A{card}")),
        QuizOption::new(format!("distractor_0_{card}"), "w0"),
        QuizOption::new(format!("distractor_1_{card}"), "w1"),
        QuizOption::new(format!("distractor_2_{card}"), "w2"),
        QuizOption::new(format!("distractor_3_{card}"), "w3"),
    ];
    let question = QuizQuestion::new(
        FlashcardId::new(card),
        format!("kw{card}"),
        options,
        card.to_string(),
    )
    .unwrap();
    QuizSession::open(
        UserId::new(user),
        "python",
        vec![question],
        fixed_now(),
        Duration::minutes(10),
    )
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrip_flashcards_with_distractors() {
    let repo = connect("memdb_flashcards").await;

    let lang = build_language(1, "python");
    repo.upsert_language(&lang).await.unwrap();

    let card = build_flashcard(
        1,
        lang.id(),
        vec!["w1".into(), "w2".into(), "w3".into(), "w4".into()],
    );
    repo.upsert_flashcard(&card).await.unwrap();

    let fetched = repo.get_flashcard(card.id()).await.unwrap().expect("card");
    assert_eq!(fetched, card);
    assert!(fetched.has_full_distractors());

    assert_eq!(repo.count_by_language(lang.id()).await.unwrap(), 1);
    assert!(repo.get_flashcard(FlashcardId::new(99)).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_upsert_only_backfills_distractors() {
    let repo = connect("memdb_backfill").await;

    let lang = build_language(1, "rust");
    repo.upsert_language(&lang).await.unwrap();

    let mut card = build_flashcard(1, lang.id(), vec![]);
    repo.upsert_flashcard(&card).await.unwrap();

    card.set_distractors(vec!["a".into(), "b".into(), "c".into(), "d".into()])
        .unwrap();
    repo.upsert_flashcard(&card).await.unwrap();

    let fetched = repo.get_flashcard(card.id()).await.unwrap().expect("card");
    assert_eq!(fetched.distractors().len(), 4);
    assert_eq!(fetched.keyword(), "kw1");
}

#[tokio::test]
async fn sqlite_apply_attempt_accumulates_and_reevaluates_mastery() {
    let repo = connect("memdb_progress").await;

    let lang = build_language(1, "python");
    repo.upsert_language(&lang).await.unwrap();
    repo.upsert_flashcard(&build_flashcard(1, lang.id(), vec![]))
        .await
        .unwrap();

    let user = UserId::new(7);
    let card = FlashcardId::new(1);

    let first = repo
        .apply_attempt(user, card, lang.id(), true, fixed_now())
        .await
        .unwrap();
    assert_eq!((first.correct, first.incorrect), (1, 0));
    assert_eq!(first.mastery_level, MasteryLevel::Beginner);

    repo.apply_attempt(user, card, lang.id(), true, fixed_now())
        .await
        .unwrap();
    repo.apply_attempt(user, card, lang.id(), true, fixed_now())
        .await
        .unwrap();
    let fourth = repo
        .apply_attempt(user, card, lang.id(), false, fixed_now())
        .await
        .unwrap();

    assert_eq!((fourth.correct, fourth.incorrect), (3, 1));
    assert_eq!(fourth.mastery_level, MasteryLevel::Intermediate);

    let stored = repo.get_progress(user, card).await.unwrap().expect("record");
    assert_eq!(stored.correct, 3);
    assert_eq!(stored.mastery_level, MasteryLevel::Intermediate);
}

#[tokio::test]
async fn sqlite_session_roundtrip_and_owner_scoping() {
    let repo = connect("memdb_sessions").await;

    let session = build_session(1, 1);
    repo.insert_session(&session).await.unwrap();

    let fetched = repo
        .get_session(session.token(), UserId::new(1))
        .await
        .unwrap()
        .expect("session");
    assert_eq!(fetched, session);
    assert!(!fetched.is_completed());

    assert!(repo
        .get_session(session.token(), UserId::new(2))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn sqlite_complete_session_is_one_shot() {
    let repo = connect("memdb_complete").await;

    let session = build_session(1, 1);
    repo.insert_session(&session).await.unwrap();

    let graded = session.grade(&[SubmittedAnswer {
        flashcard_id: FlashcardId::new(1),
        selected_option_id: "1".into(),
    }]);
    let done_at = fixed_now() + Duration::minutes(3);

    let won = repo
        .complete_session(session.token(), UserId::new(1), &graded.answers, graded.score, done_at)
        .await
        .unwrap();
    assert!(won);

    let again = repo
        .complete_session(session.token(), UserId::new(1), &[], 0, done_at)
        .await
        .unwrap();
    assert!(!again);

    let fetched = repo
        .get_session(session.token(), UserId::new(1))
        .await
        .unwrap()
        .expect("session");
    assert!(fetched.is_completed());
    assert_eq!(fetched.score(), Some(1));
    assert_eq!(fetched.answers().map(<[_]>::len), Some(1));
    assert_eq!(fetched.completed_at(), Some(done_at));
}

#[tokio::test]
async fn sqlite_complete_unknown_session_is_not_found() {
    let repo = connect("memdb_complete_missing").await;

    let session = build_session(1, 1);
    let err = repo
        .complete_session(session.token(), UserId::new(1), &[], 0, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_purge_drops_expired_sessions_only() {
    let repo = connect("memdb_purge").await;

    let session = build_session(1, 1);
    repo.insert_session(&session).await.unwrap();

    let removed = repo
        .purge_sessions_expired_before(session.expires_at() - Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(removed, 0);

    let removed = repo
        .purge_sessions_expired_before(session.expires_at() + Duration::hours(24))
        .await
        .unwrap();
    assert_eq!(removed, 1);

    assert!(repo
        .get_session(session.token(), UserId::new(1))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn sqlite_duplicate_token_conflicts() {
    let repo = connect("memdb_conflict").await;

    let session = build_session(1, 1);
    repo.insert_session(&session).await.unwrap();
    let err = repo.insert_session(&session).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}
