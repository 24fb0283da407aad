mod common;

use std::sync::Arc;

use quiz_core::integrity::TerminationReason;
use quiz_core::model::{CompletionReason, Lifecycle, OptionId, QuestionId, QuizId};
use services::{LoadError, PersistenceStatus, ResultsView, SessionError};
use storage::repository::Storage;

use common::{RecordingDisplay, participant, seeded, service};

#[tokio::test]
async fn two_section_quiz_scores_and_persists() {
    let storage = Storage::in_memory();
    seeded(&storage, 10).await;
    let display = Arc::new(RecordingDisplay::default());
    let service = service(&storage, Arc::clone(&display));

    let mut attempt = service.load(participant("PRN1")).await.unwrap();
    service.start(&mut attempt).await.unwrap();
    assert_eq!(display.requests(), 1);

    let session = attempt.session_mut();
    for (question, option) in [(1, 11), (2, 21), (3, 32)] {
        session
            .select_option(QuestionId::new(question), OptionId::new(option))
            .unwrap();
        session.next();
    }

    let status = service.submit(&mut attempt).await.unwrap();
    let PersistenceStatus::Stored(id) = status else {
        panic!("expected stored result");
    };
    assert_eq!(attempt.session().lifecycle(), Lifecycle::Completed);
    assert_eq!(attempt.session().score(), Some(2));
    assert!(!attempt.session().is_cheating());
    assert_eq!(display.releases(), 1);

    let stored = storage.results.get_result(id).await.unwrap();
    assert_eq!(stored.score(), 2);
    assert_eq!(stored.total_questions(), 3);
    assert_eq!(stored.participant().batch.as_deref(), Some("B1"));

    let view = ResultsView::from_session(attempt.session()).unwrap();
    let ResultsView::Scored { report, .. } = view else {
        panic!("expected scored view");
    };
    assert_eq!(report.percentage, 67);
    assert_eq!(report.passed, Some(true));
}

#[tokio::test]
async fn cheating_result_is_flagged_in_storage() {
    let storage = Storage::in_memory();
    seeded(&storage, 10).await;
    let display = Arc::new(RecordingDisplay::default());
    let service = service(&storage, Arc::clone(&display));

    let mut attempt = service.load(participant("PRN2")).await.unwrap();
    service.start(&mut attempt).await.unwrap();
    let session = attempt.session_mut();
    session
        .select_option(QuestionId::new(1), OptionId::new(11))
        .unwrap();
    session.display_mode_changed(false, quiz_core::time::fixed_now());
    session.display_mode_changed(true, quiz_core::time::fixed_now());
    session.display_mode_changed(false, quiz_core::time::fixed_now());
    assert_eq!(display.releases(), 0);

    let status = service.finalize(&mut attempt).await.unwrap();
    let id = status.result_id().unwrap();
    let stored = storage.results.get_result(id).await.unwrap();
    assert!(stored.is_cheating());
    assert_eq!(stored.score(), 1);
    assert_eq!(
        stored.completion(),
        CompletionReason::Terminated(TerminationReason::RepeatedExit)
    );

    let view = ResultsView::from_session(attempt.session()).unwrap();
    assert!(view.is_terminated());

    let listed = service.list_results(QuizId::new(1)).await.unwrap();
    assert!(listed[0].cheating);
}

#[tokio::test]
async fn load_failures_are_terminal() {
    let storage = Storage::in_memory();
    let service = service(&storage, Arc::new(RecordingDisplay::default()));
    let err = service.load(participant("PRN1")).await.unwrap_err();
    assert!(matches!(err, SessionError::Load(LoadError::NotFound)));
    assert_eq!(err.to_string(), "quiz not found");

    seeded(&storage, 10).await;
    let mut attempt = service.load(participant("PRN1")).await.unwrap();
    service.start(&mut attempt).await.unwrap();
    let err = service.load(participant("PRN1")).await.unwrap_err();
    assert!(matches!(err, SessionError::Load(LoadError::AlreadyAttempted)));
}

#[tokio::test]
async fn sqlite_backed_attempt_roundtrips() {
    let storage = Storage::sqlite("sqlite:file:memdb_services_flow?mode=memory&cache=shared")
        .await
        .unwrap();
    seeded(&storage, 5).await;
    let service = service(&storage, Arc::new(RecordingDisplay::default()));

    let mut attempt = service.load(participant("PRN9")).await.unwrap();
    assert_eq!(attempt.session().time_remaining(), "05:00");
    service.start(&mut attempt).await.unwrap();
    attempt
        .session_mut()
        .select_option(QuestionId::new(3), OptionId::new(31))
        .unwrap();

    let status = service.submit(&mut attempt).await.unwrap();
    let stored = storage
        .results
        .get_result(status.result_id().unwrap())
        .await
        .unwrap();
    assert_eq!(stored.score(), 1);
    assert_eq!(stored.answers().len(), 3);
    assert_eq!(stored.answers()[2].selected, Some(OptionId::new(31)));
}
