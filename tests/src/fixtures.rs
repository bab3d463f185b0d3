//! Test fixtures: questions and client frames.

use classroom_core::{
    AnswerValue, Difficulty, JoinSession, PushQuestion, Question, QuestionOption, QuestionType,
    Role, SubmitAnswer,
};
use serde_json::{json, Value};

pub const SESSION_ID: &str = "physics-101:morning";
pub const CLASS_ID: &str = "physics-101";
pub const TEACHER_ID: &str = "teacher-1";
pub const CONCEPT_ID: &str = "newton-2";

/// A four-option multiple choice question on the fixture concept.
pub fn mcq(id: &str, correct: &str) -> Question {
    Question {
        id: id.into(),
        concept_id: CONCEPT_ID.into(),
        kind: QuestionType::Mcq,
        text: format!("Question {id}"),
        options: ["A", "B", "C", "D"]
            .iter()
            .map(|o| QuestionOption {
                id: o.to_string(),
                text: format!("Option {o}"),
            })
            .collect(),
        correct_answer: correct.into(),
        difficulty: Difficulty::Medium,
        time_limit: 30,
        points: 10,
        explanation: Some("F = ma".into()),
        tags: vec!["mechanics".into()],
    }
}

/// Student ids `student-1..=n`.
pub fn students(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("student-{i}")).collect()
}

pub fn teacher_join() -> JoinSession {
    JoinSession {
        session_id: SESSION_ID.into(),
        user_id: TEACHER_ID.into(),
        role: Role::Teacher,
        class_id: Some(CLASS_ID.into()),
    }
}

pub fn student_join(student_id: &str) -> JoinSession {
    JoinSession {
        session_id: SESSION_ID.into(),
        user_id: student_id.into(),
        role: Role::Student,
        class_id: Some(CLASS_ID.into()),
    }
}

pub fn push(question_id: &str, time_limit: Option<u32>) -> PushQuestion {
    PushQuestion {
        session_id: SESSION_ID.into(),
        question_id: question_id.into(),
        time_limit,
    }
}

pub fn answer(question_id: &str, student_id: &str, value: &str, time_taken: f64) -> SubmitAnswer {
    SubmitAnswer {
        session_id: SESSION_ID.into(),
        question_id: question_id.into(),
        student_id: student_id.into(),
        answer: AnswerValue::from(value),
        time_taken,
    }
}

/// Wire frame `{"event", "data"}`.
pub fn frame(event: &str, data: Value) -> String {
    json!({ "event": event, "data": data }).to_string()
}

pub fn join_frame(user_id: &str, role: &str) -> String {
    frame(
        "session:join",
        json!({
            "sessionId": SESSION_ID,
            "userId": user_id,
            "role": role,
            "classId": CLASS_ID
        }),
    )
}

pub fn push_frame(question_id: &str, time_limit: u32) -> String {
    frame(
        "question:push",
        json!({
            "sessionId": SESSION_ID,
            "questionId": question_id,
            "timeLimit": time_limit
        }),
    )
}

pub fn answer_frame(question_id: &str, student_id: &str, value: &str, time_taken: f64) -> String {
    frame(
        "question:answer",
        json!({
            "sessionId": SESSION_ID,
            "questionId": question_id,
            "studentId": student_id,
            "answer": value,
            "timeTaken": time_taken
        }),
    )
}
