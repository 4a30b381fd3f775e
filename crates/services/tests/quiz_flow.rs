use std::sync::Arc;

use chrono::Duration;
use codecards_core::model::{
    Flashcard, FlashcardId, Language, LanguageId, SubmittedAnswer, UserId,
};
use codecards_core::time::fixed_now;
use codecards_core::MasteryLevel;
use services::{Clock, PracticeService, QuizService};
use storage::repository::{
    FlashcardRepository, InMemoryRepository, LanguageRepository, ProgressRepository,
};

async fn seed_python(repo: &InMemoryRepository, cards: u64) {
    let language = Language::new(LanguageId::new(1), "Python", "python", true).unwrap();
    repo.upsert_language(&language).await.unwrap();
    for n in 1..=cards {
        let card = Flashcard::new(
            FlashcardId::new(n),
            language.id(),
            format!("keyword{n}"),
            format!("What does keyword{n} do?"),
            format!("answer {n}"),
            format!("print({n})"),
            (0..4).map(|i| format!("wrong {i} for {n}")).collect(),
        )
        .unwrap();
        repo.upsert_flashcard(&card).await.unwrap();
    }
}

fn services(repo: &InMemoryRepository, clock: Clock) -> (PracticeService, QuizService) {
    let practice = PracticeService::new(
        clock.clone(),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    );
    let quiz = QuizService::new(
        clock,
        practice.clone(),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
    .with_rng_seed(42);
    (practice, quiz)
}

#[tokio::test]
async fn full_quiz_flow_updates_progress_and_results() {
    let repo = InMemoryRepository::new();
    seed_python(&repo, 3).await;
    let clock = Clock::fixed(fixed_now());
    let (practice, quiz) = services(&repo, clock.clone());
    let user = UserId::new(1);

    let session = quiz.build_quiz(user, "python", 10).await.unwrap();
    assert_eq!(session.questions().len(), 3);
    for question in session.questions() {
        assert_eq!(question.options().len(), 5);
    }

    let submitted: Vec<SubmittedAnswer> = session
        .questions()
        .iter()
        .map(|q| SubmittedAnswer {
            flashcard_id: q.flashcard_id(),
            selected_option_id: q.correct_option_id().to_string(),
        })
        .collect();

    clock.advance(Duration::minutes(2));
    let graded = quiz
        .submit_quiz_results(session.token(), user, "python", &submitted)
        .await
        .unwrap();
    assert_eq!(graded.score, 3);

    let results = quiz.get_results(session.token(), user).await.unwrap();
    assert_eq!(results.score, 3);
    assert_eq!(results.total_questions, 3);
    assert_eq!(results.percentage, 100.0);
    assert!(results.passed);
    assert_eq!(results.time_taken_seconds, 120);

    let stats = practice.summarize(user, "python").await.unwrap();
    assert_eq!(stats.practiced, 3);
    assert_eq!(stats.correct, 3);
    assert_eq!(stats.average_accuracy, 100.0);
}

#[tokio::test]
async fn selection_feeds_quiz_with_weakest_cards_first() {
    let repo = InMemoryRepository::new();
    seed_python(&repo, 4).await;
    let clock = Clock::fixed(fixed_now());
    let (practice, quiz) = services(&repo, clock.clone());
    let user = UserId::new(1);

    // Master card 1, touch card 2, leave 3 and 4 fresh.
    for _ in 0..10 {
        repo.apply_attempt(user, FlashcardId::new(1), LanguageId::new(1), true, clock.now())
            .await
            .unwrap();
    }
    repo.apply_attempt(user, FlashcardId::new(2), LanguageId::new(1), false, clock.now())
        .await
        .unwrap();

    let picked = practice
        .select_for_practice(user, "python", 2)
        .await
        .unwrap();
    let ids: Vec<u64> = picked.iter().map(|c| c.id().value()).collect();
    assert_eq!(ids, vec![3, 4]);

    let session = quiz.build_quiz(user, "python", 2).await.unwrap();
    let mut quizzed: Vec<u64> = session
        .questions()
        .iter()
        .map(|q| q.flashcard_id().value())
        .collect();
    quizzed.sort_unstable();
    assert_eq!(quizzed, vec![3, 4]);
}

#[tokio::test]
async fn quiz_progress_drives_mastery_over_repeated_sessions() {
    let repo = InMemoryRepository::new();
    seed_python(&repo, 3).await;
    let clock = Clock::fixed(fixed_now());
    let (_, quiz) = services(&repo, clock.clone());
    let user = UserId::new(1);

    // Ten all-correct quizzes push every card to the top tier.
    for _ in 0..10 {
        let session = quiz.build_quiz(user, "python", 10).await.unwrap();
        let submitted: Vec<SubmittedAnswer> = session
            .questions()
            .iter()
            .map(|q| SubmittedAnswer {
                flashcard_id: q.flashcard_id(),
                selected_option_id: q.correct_option_id().to_string(),
            })
            .collect();
        quiz.submit_quiz_results(session.token(), user, "python", &submitted)
            .await
            .unwrap();
        clock.advance(Duration::minutes(15));
    }

    for n in 1..=3 {
        let record = repo
            .get_progress(user, FlashcardId::new(n))
            .await
            .unwrap()
            .expect("progress record");
        assert_eq!(record.correct, 10);
        assert_eq!(record.mastery_level, MasteryLevel::Mastered);
    }
}

#[tokio::test]
async fn abandoned_session_expires_and_gets_purged() {
    let repo = InMemoryRepository::new();
    seed_python(&repo, 3).await;
    let clock = Clock::fixed(fixed_now());
    let (_, quiz) = services(&repo, clock.clone());
    let user = UserId::new(1);

    let session = quiz.build_quiz(user, "python", 10).await.unwrap();

    clock.advance(Duration::minutes(11));
    let err = quiz
        .submit_quiz_results(session.token(), user, "python", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, services::QuizError::Expired));

    // Still within retention, so the purge leaves it alone.
    assert_eq!(quiz.purge_stale_sessions().await.unwrap(), 0);

    clock.advance(Duration::hours(services::SESSION_RETENTION_HOURS));
    assert_eq!(quiz.purge_stale_sessions().await.unwrap(), 1);
}
