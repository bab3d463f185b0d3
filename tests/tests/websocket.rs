//! Tests for the realtime WebSocket transport.
//!
//! Runs the real router over an HTTP transport; no Docker needed.

use axum_test::{TestServer, TestWebSocket};
use integration_tests::{fixtures, setup::TestContext};
use serde_json::Value;

fn server(ctx: &TestContext) -> TestServer {
    TestServer::builder()
        .http_transport()
        .build(ctx.router.clone())
        .expect("Failed to create test server")
}

async fn connect(server: &TestServer) -> TestWebSocket {
    server.get_websocket("/ws").await.into_websocket().await
}

/// Reads frames until one with the given event name arrives.
async fn expect_event(socket: &mut TestWebSocket, event: &str) -> Value {
    for _ in 0..10 {
        let frame: Value = socket.receive_json().await;
        if frame["event"] == event {
            return frame["data"].clone();
        }
    }
    panic!("no {event} frame received");
}

/// Test teacher join starts the session
#[tokio::test]
async fn test_teacher_join_starts_session() {
    let ctx = TestContext::empty();
    let server = server(&ctx);
    let mut teacher = connect(&server).await;

    teacher
        .send_text(fixtures::join_frame(fixtures::TEACHER_ID, "teacher"))
        .await;

    let started = expect_event(&mut teacher, "session:started").await;
    assert_eq!(started["sessionId"], fixtures::SESSION_ID);
    assert_eq!(started["classId"], fixtures::CLASS_ID);

    let engagement = expect_event(&mut teacher, "engagement:update").await;
    assert_eq!(engagement["participationRate"], 0.0);
    assert_eq!(ctx.controller.session_count(), 1);
}

/// Test malformed frames get a VALID_001 error frame
#[tokio::test]
async fn test_malformed_frame_returns_error() {
    let ctx = TestContext::empty();
    let server = server(&ctx);
    let mut socket = connect(&server).await;

    socket.send_text("{not json").await;
    let error = expect_event(&mut socket, "error").await;
    assert_eq!(error["code"], "VALID_001");

    socket
        .send_text(fixtures::frame(
            "session:join",
            serde_json::json!({ "sessionId": "bad id", "userId": "u", "role": "student" }),
        ))
        .await;
    let error = expect_event(&mut socket, "error").await;
    assert_eq!(error["code"], "VALID_002");
}

/// Test joins to unknown sessions leave no topic behind
#[tokio::test]
async fn test_join_unknown_session_leaves_no_topic() {
    let ctx = TestContext::empty();
    let server = server(&ctx);
    let mut socket = connect(&server).await;

    for i in 0..20 {
        socket
            .send_text(fixtures::frame(
                "session:join",
                serde_json::json!({
                    "sessionId": format!("ghost-{i}"),
                    "userId": "student-1",
                    "role": "student"
                }),
            ))
            .await;
    }

    // Frames are handled in order, so this reply follows every join.
    socket.send_text("{not json").await;
    expect_event(&mut socket, "error").await;

    assert_eq!(ctx.controller.session_count(), 0);
    assert_eq!(ctx.controller.hub().topic_count(), 0);
}

/// Test students cannot push questions
#[tokio::test]
async fn test_student_push_is_rejected() {
    let ctx = TestContext::new([fixtures::mcq("q1", "A")]);
    let server = server(&ctx);

    let mut teacher = connect(&server).await;
    teacher
        .send_text(fixtures::join_frame(fixtures::TEACHER_ID, "teacher"))
        .await;
    expect_event(&mut teacher, "session:started").await;

    let mut student = connect(&server).await;
    student
        .send_text(fixtures::join_frame("student-1", "student"))
        .await;
    expect_event(&mut student, "engagement:update").await;

    student.send_text(fixtures::push_frame("q1", 30)).await;
    let error = expect_event(&mut student, "error").await;
    assert_eq!(error["code"], "FORBIDDEN");

    let snapshot = ctx.controller.snapshot(fixtures::SESSION_ID).await.unwrap();
    assert_eq!(snapshot.active_question_id, None);
}

/// Test the answer key reaches the teacher but not students
#[tokio::test]
async fn test_pushed_question_is_redacted_for_students() {
    let ctx = TestContext::new([fixtures::mcq("q1", "A")]);
    let server = server(&ctx);

    let mut teacher = connect(&server).await;
    teacher
        .send_text(fixtures::join_frame(fixtures::TEACHER_ID, "teacher"))
        .await;
    expect_event(&mut teacher, "session:started").await;

    let mut student = connect(&server).await;
    student
        .send_text(fixtures::join_frame("student-1", "student"))
        .await;
    expect_event(&mut student, "engagement:update").await;

    teacher.send_text(fixtures::push_frame("q1", 30)).await;

    let teacher_view = expect_event(&mut teacher, "question:pushed").await;
    assert_eq!(teacher_view["question"]["correctAnswer"], "A");

    let student_view = expect_event(&mut student, "question:pushed").await;
    assert!(student_view["question"].get("correctAnswer").is_none());
    assert_eq!(student_view["timeLimit"], 30);

    student
        .send_text(fixtures::answer_frame("q1", "student-1", "A", 4.0))
        .await;
    let update = expect_event(&mut student, "student:mastery-update").await;
    assert_eq!(update["studentId"], "student-1");
    assert_eq!(update["previousScore"], 0);
}
