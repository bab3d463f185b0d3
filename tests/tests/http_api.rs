//! Tests for the HTTP read API.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};

async fn answered_lesson() -> (TestContext, Vec<String>) {
    let ctx = TestContext::new([fixtures::mcq("q1", "B")]);
    let students = fixtures::students(3);
    let _events = ctx.start_classroom(&students).await;

    ctx.controller
        .push_question(&fixtures::push("q1", None))
        .await
        .unwrap();
    for (student, value) in students.iter().zip(["B", "A", "B"]) {
        ctx.controller
            .submit_answer(&fixtures::answer("q1", student, value, 10.0))
            .await
            .unwrap();
    }
    ctx.controller
        .close_question(fixtures::SESSION_ID, "q1")
        .await
        .unwrap();

    (ctx, students)
}

/// Test GET /sessions lists live sessions
#[tokio::test]
async fn test_list_sessions() {
    let ctx = TestContext::empty();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let empty: Vec<serde_json::Value> = server.get("/sessions").await.json();
    assert!(empty.is_empty());

    let _events = ctx.start_classroom(&fixtures::students(2)).await;
    let response = server.get("/sessions").await;
    response.assert_status_ok();

    let body: Vec<serde_json::Value> = response.json();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["id"], fixtures::SESSION_ID);
    assert_eq!(body[0]["students"].as_array().map(Vec::len), Some(2));
}

/// Test unknown session returns 404 with a coded body
#[tokio::test]
async fn test_unknown_session_returns_404() {
    let ctx = TestContext::empty();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/sessions/nope").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");

    server
        .get("/sessions/nope/engagement")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .post("/sessions/nope/end")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

/// Test session engagement reflects the joined students
#[tokio::test]
async fn test_session_engagement() {
    let (ctx, students) = answered_lesson().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .get(&format!("/sessions/{}/engagement", fixtures::SESSION_ID))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["sessionId"], fixtures::SESSION_ID);
    assert_eq!(
        body["activeStudents"].as_array().map(Vec::len),
        Some(students.len())
    );
}

/// Test POST /sessions/:id/end returns the summary and removes the session
#[tokio::test]
async fn test_end_session() {
    let (ctx, _students) = answered_lesson().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post(&format!("/sessions/{}/end", fixtures::SESSION_ID))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["questionsAsked"], 1);

    assert_eq!(ctx.controller.session_count(), 0);
    server
        .get(&format!("/sessions/{}", fixtures::SESSION_ID))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

/// Test student mastery includes levels
#[tokio::test]
async fn test_student_mastery() {
    let (ctx, students) = answered_lesson().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .get(&format!("/students/{}/mastery", students[0]))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["studentId"], students[0].as_str());
    let concepts = body["concepts"].as_array().expect("concepts array");
    assert_eq!(concepts.len(), 1);
    assert_eq!(concepts[0]["conceptId"], fixtures::CONCEPT_ID);
    assert_eq!(concepts[0]["level"], "strong");
}

/// Test class mastery for a student list
#[tokio::test]
async fn test_concept_mastery() {
    let (ctx, students) = answered_lesson().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .get(&format!("/concepts/{}/mastery", fixtures::CONCEPT_ID))
        .add_query_param("students", students.join(","))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["distribution"]["strong"], 2);
    assert_eq!(body["distribution"]["weak"], 1);
}

/// Test class mastery requires a valid student list
#[tokio::test]
async fn test_concept_mastery_validation() {
    let ctx = TestContext::empty();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .get("/concepts/newton-2/mastery")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .get("/concepts/newton-2/mastery")
        .add_query_param("students", "ok,not ok")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_002");
}

/// Test engagement trends over the default window
#[tokio::test]
async fn test_engagement_trends() {
    let (ctx, _students) = answered_lesson().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .get(&format!("/classes/{}/engagement/trends", fixtures::CLASS_ID))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["sessionCount"], 1);
    assert_eq!(body["timeline"].as_array().map(Vec::len), Some(1));

    let response = server
        .get(&format!("/classes/{}/engagement/trends", fixtures::CLASS_ID))
        .add_query_param("from", "2030-01-02T00:00:00Z")
        .add_query_param("to", "2030-01-01T00:00:00Z")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

/// Test /metrics reports counters
#[tokio::test]
async fn test_metrics_endpoint() {
    let (ctx, _students) = answered_lesson().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/metrics").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert!(body.get("uptime_secs").is_some());
    assert!(body["questions_pushed"].as_u64().unwrap_or(0) >= 1);
    assert!(body["answers_received"].as_u64().unwrap_or(0) >= 3);
}
