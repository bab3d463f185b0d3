//! End-to-end lesson flows through the session controller.
//!
//! Runs on in-memory stores with a paused clock; no Docker needed.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use classroom_core::{EngagementLevel, MasteryLevel, ServerEvent};
use integration_tests::{fixtures, setup::TestContext};
use session_engine::EventReceiver;
use worker::{NotificationWorker, SessionReaper};

fn drain(events: &mut EventReceiver) -> Vec<ServerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push((*event).clone());
    }
    out
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Push, answer, auto-close: results, mastery and the engagement log line up.
#[tokio::test(start_paused = true)]
async fn test_full_question_cycle() {
    let ctx = TestContext::new([fixtures::mcq("q1", "B")]);
    let students = fixtures::students(3);
    let mut events = ctx.start_classroom(&students).await;

    ctx.controller
        .push_question(&fixtures::push("q1", Some(30)))
        .await
        .expect("push should succeed");

    let pushed = drain(&mut events)
        .into_iter()
        .find_map(|e| match e {
            ServerEvent::QuestionPushed(p) => Some(p),
            _ => None,
        })
        .expect("question:pushed broadcast");
    assert_eq!(pushed.time_limit, 30);
    assert_eq!(pushed.question.id, "q1");

    let answers = [("B", 10.0), ("A", 20.0), ("B", 30.0)];
    for (student, (value, time)) in students.iter().zip(answers) {
        let update = ctx
            .controller
            .submit_answer(&fixtures::answer("q1", student, value, time))
            .await
            .expect("answer should succeed")
            .expect("answer to the active question is scored");
        assert_eq!(update.previous_score, 0);
    }

    tokio::time::sleep(Duration::from_secs(31)).await;
    settle().await;

    let results = drain(&mut events)
        .into_iter()
        .find_map(|e| match e {
            ServerEvent::QuestionResults(r) => Some(r),
            _ => None,
        })
        .expect("question:results broadcast after the time limit");
    assert_eq!(results.total_responses, 3);
    assert_eq!(results.correct_responses, 2);
    assert_eq!(results.average_time, 20);
    assert_eq!(results.option_distribution.get("B"), Some(&2));

    assert_eq!(ctx.persisted_logs(), 1);
    let log = &ctx.learning.inner().all_engagement_logs()[0];
    assert_eq!(log.participation_rate, 100.0);
    assert_eq!(log.engagement_level, EngagementLevel::Green);
    assert_eq!(log.concept_id, fixtures::CONCEPT_ID);

    let class = ctx
        .controller
        .class_mastery(fixtures::CONCEPT_ID, &students)
        .await
        .unwrap();
    assert_eq!(class.distribution.strong, 2);
    assert_eq!(class.distribution.weak, 1);
    assert_eq!(class.average, 68);

    let trends = ctx
        .controller
        .engagement_trends(
            fixtures::CLASS_ID,
            Utc::now() - ChronoDuration::days(1),
            Utc::now() + ChronoDuration::days(1),
        )
        .await
        .unwrap();
    assert_eq!(trends.session_count, 1);
}

/// Answers after the question closed are dropped without scoring.
#[tokio::test(start_paused = true)]
async fn test_late_answer_is_ignored() {
    let ctx = TestContext::new([fixtures::mcq("q1", "A")]);
    let students = fixtures::students(1);
    let _events = ctx.start_classroom(&students).await;

    ctx.controller
        .push_question(&fixtures::push("q1", Some(5)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;
    settle().await;

    let late = ctx
        .controller
        .submit_answer(&fixtures::answer("q1", &students[0], "A", 7.0))
        .await
        .unwrap();
    assert!(late.is_none());
    assert!(ctx
        .controller
        .student_mastery(&students[0])
        .await
        .unwrap()
        .is_empty());
}

/// A single failed write is absorbed by the retry policy.
#[tokio::test(start_paused = true)]
async fn test_transient_store_failure_is_retried() {
    let ctx = TestContext::new([fixtures::mcq("q1", "A")]);
    let students = fixtures::students(1);
    let _events = ctx.start_classroom(&students).await;
    ctx.controller
        .push_question(&fixtures::push("q1", None))
        .await
        .unwrap();

    ctx.learning.fail_next_writes(1);
    let update = ctx
        .controller
        .submit_answer(&fixtures::answer("q1", &students[0], "A", 12.0))
        .await
        .expect("retry should recover")
        .expect("scored");

    assert_eq!(update.previous_score, 0);
    assert_eq!(ctx.learning.write_attempts(), 2);
}

/// Persistent store failure fails the request but not the session.
#[tokio::test(start_paused = true)]
async fn test_persistent_store_failure_keeps_session_alive() {
    let ctx = TestContext::new([fixtures::mcq("q1", "A"), fixtures::mcq("q2", "C")]);
    let students = fixtures::students(2);
    let mut events = ctx.start_classroom(&students).await;
    ctx.controller
        .push_question(&fixtures::push("q1", None))
        .await
        .unwrap();
    drain(&mut events);

    ctx.learning.set_failing(true);
    let err = ctx
        .controller
        .submit_answer(&fixtures::answer("q1", &students[0], "A", 12.0))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), Some("STORE_002"));
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, ServerEvent::EngagementUpdate(_))));

    assert!(ctx.controller.close_question(fixtures::SESSION_ID, "q1").await.is_err());
    let snapshot = ctx.controller.snapshot(fixtures::SESSION_ID).await.unwrap();
    assert_eq!(snapshot.active_question_id, None);

    ctx.learning.set_failing(false);
    ctx.controller
        .push_question(&fixtures::push("q2", None))
        .await
        .unwrap();
    assert!(ctx
        .controller
        .submit_answer(&fixtures::answer("q2", &students[1], "C", 8.0))
        .await
        .unwrap()
        .is_some());
}

/// Idle sessions are ended by the reaper and clients see `session:ended`.
#[tokio::test]
async fn test_reaper_ends_idle_session() {
    let ctx = TestContext::empty();
    let mut events = ctx.start_classroom(&fixtures::students(2)).await;
    drain(&mut events);

    let reaper = SessionReaper::new(ctx.controller.clone());
    let reaped = reaper.run_once(Utc::now() + ChronoDuration::minutes(16)).await;
    assert_eq!(reaped, 1);
    assert_eq!(ctx.controller.session_count(), 0);

    let ended = drain(&mut events)
        .into_iter()
        .find_map(|e| match e {
            ServerEvent::SessionEnded(e) => Some(e),
            _ => None,
        })
        .expect("session:ended broadcast");
    assert_eq!(ended.summary.questions_asked, 0);
}

/// A question nobody answered turns the session red and is alerted once.
#[tokio::test]
async fn test_low_engagement_alert() {
    let ctx = TestContext::new([fixtures::mcq("q1", "A")]);
    let _events = ctx.start_classroom(&fixtures::students(3)).await;

    // Joined students alone keep the live index out of red.
    let snapshot = ctx.controller.snapshot(fixtures::SESSION_ID).await.unwrap();
    assert_eq!(snapshot.engagement_level, Some(EngagementLevel::Yellow));

    let notifications = NotificationWorker::new(3);
    assert_eq!(notifications.check_sessions(&ctx.controller).await, 0);

    ctx.controller
        .push_question(&fixtures::push("q1", None))
        .await
        .unwrap();
    ctx.controller
        .close_question(fixtures::SESSION_ID, "q1")
        .await
        .unwrap();

    let snapshot = ctx.controller.snapshot(fixtures::SESSION_ID).await.unwrap();
    let last = snapshot.last_question.expect("closed question stats");
    assert_eq!(last.level(), EngagementLevel::Red);
    assert_eq!(last.participation_rate, 0.0);

    assert_eq!(notifications.check_sessions(&ctx.controller).await, 1);
    assert_eq!(notifications.check_sessions(&ctx.controller).await, 0);
}

/// Scores carry over between questions on the same concept.
#[tokio::test]
async fn test_mastery_accumulates_across_questions() {
    let ctx = TestContext::new([fixtures::mcq("q1", "A"), fixtures::mcq("q2", "B")]);
    let students = fixtures::students(1);
    let _events = ctx.start_classroom(&students).await;

    ctx.controller
        .push_question(&fixtures::push("q1", None))
        .await
        .unwrap();
    let first = ctx
        .controller
        .submit_answer(&fixtures::answer("q1", &students[0], "A", 10.0))
        .await
        .unwrap()
        .unwrap();
    ctx.controller
        .close_question(fixtures::SESSION_ID, "q1")
        .await
        .unwrap();

    ctx.controller
        .push_question(&fixtures::push("q2", None))
        .await
        .unwrap();
    let second = ctx
        .controller
        .submit_answer(&fixtures::answer("q2", &students[0], "B", 10.0))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(second.previous_score, first.new_score);
    let mastery = ctx.controller.student_mastery(&students[0]).await.unwrap();
    assert_eq!(mastery.len(), 1);
    assert_eq!(mastery[0].attempts, 2);
    assert_eq!(mastery[0].level(), MasteryLevel::Strong);
}
