//! ClickHouse learning store against a real server.
//!
//! Requires Docker (testcontainers) or `CLASSROOM_TEST_CLICKHOUSE_URL`.
//! Run with `cargo test -p integration-tests --test clickhouse_store -- --ignored`.

use chrono::{Duration, TimeZone, Utc};
use classroom_core::{
    Attempt, EngagementLevel, EngagementLog, LearningStore, MasteryPolicy, MasteryScore,
};
use integration_tests::{fixtures, setup::ClickHouseContext};

fn attempt(question_id: &str, is_correct: bool) -> Attempt {
    Attempt {
        question_id: question_id.into(),
        is_correct,
        time_taken: 12.5,
    }
}

fn log(class_id: &str, minutes_ago: i64, level: EngagementLevel) -> EngagementLog {
    EngagementLog {
        session_id: fixtures::SESSION_ID.into(),
        class_id: class_id.into(),
        teacher_id: fixtures::TEACHER_ID.into(),
        concept_id: fixtures::CONCEPT_ID.into(),
        timestamp: Utc::now() - Duration::minutes(minutes_ago),
        participation_rate: 75.0,
        engagement_level: level,
        active_students: 3,
        total_students: 4,
        average_response_time: 18.0,
        correct_response_rate: 66.0,
    }
}

/// Test the latest mastery version wins
#[tokio::test]
#[ignore = "requires Docker"]
async fn test_mastery_score_is_replaced() {
    let ctx = ClickHouseContext::new().await;
    let policy = MasteryPolicy::default();
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

    let mut score = MasteryScore::new("student-1", fixtures::CONCEPT_ID);
    score.created_at = t0;
    score.record(attempt("q1", true), t0, &policy);
    ctx.store.put_mastery_score(&score).await.unwrap();

    score.record(attempt("q2", false), t0 + Duration::minutes(1), &policy);
    ctx.store.put_mastery_score(&score).await.unwrap();

    let stored = ctx
        .store
        .mastery_score("student-1", fixtures::CONCEPT_ID)
        .await
        .unwrap()
        .expect("record stored");
    assert_eq!(stored.attempts, 2);
    assert_eq!(stored.history.len(), 2);
    assert_eq!(stored, score);

    let all = ctx.store.student_mastery("student-1").await.unwrap();
    assert_eq!(all.len(), 1);
}

/// Test concept mastery filters by student list
#[tokio::test]
#[ignore = "requires Docker"]
async fn test_concept_mastery_for_students() {
    let ctx = ClickHouseContext::new().await;
    let policy = MasteryPolicy::default();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

    for student in fixtures::students(3) {
        let mut score = MasteryScore::new(student.as_str(), fixtures::CONCEPT_ID);
        score.created_at = now;
        score.record(attempt("q1", true), now, &policy);
        ctx.store.put_mastery_score(&score).await.unwrap();
    }

    let subset = vec!["student-1".to_string(), "student-3".to_string()];
    let scores = ctx
        .store
        .concept_mastery(fixtures::CONCEPT_ID, &subset)
        .await
        .unwrap();
    assert_eq!(scores.len(), 2);

    assert!(ctx
        .store
        .concept_mastery(fixtures::CONCEPT_ID, &[])
        .await
        .unwrap()
        .is_empty());
}

/// Test engagement logs are windowed and ordered by time
#[tokio::test]
#[ignore = "requires Docker"]
async fn test_engagement_logs_window() {
    let ctx = ClickHouseContext::new().await;

    ctx.store
        .append_engagement_log(&log(fixtures::CLASS_ID, 10, EngagementLevel::Yellow))
        .await
        .unwrap();
    ctx.store
        .append_engagement_log(&log(fixtures::CLASS_ID, 60 * 24 * 40, EngagementLevel::Red))
        .await
        .unwrap();
    ctx.store
        .append_engagement_log(&log(fixtures::CLASS_ID, 5, EngagementLevel::Green))
        .await
        .unwrap();
    ctx.store
        .append_engagement_log(&log("other-class", 5, EngagementLevel::Green))
        .await
        .unwrap();

    let logs = ctx
        .store
        .engagement_logs(
            fixtures::CLASS_ID,
            Utc::now() - Duration::days(30),
            Utc::now(),
        )
        .await
        .unwrap();

    let levels: Vec<_> = logs.iter().map(|l| l.engagement_level).collect();
    assert_eq!(levels, vec![EngagementLevel::Yellow, EngagementLevel::Green]);

    let total = clickhouse_client::query::count_engagement_logs(&ctx.client, fixtures::CLASS_ID)
        .await
        .unwrap();
    assert_eq!(total, 3);
}

/// Test ping succeeds against a live server
#[tokio::test]
#[ignore = "requires Docker"]
async fn test_ping() {
    let ctx = ClickHouseContext::new().await;
    ctx.store.ping().await.expect("ClickHouse should answer");
}
