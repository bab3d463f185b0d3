//! Question lifecycle controller.
//!
//! Every operation on a session holds that session's lock for its whole
//! duration, including the mastery update, so answers are applied one at a
//! time in the order they were received. Operations on unknown sessions are
//! no-ops.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use classroom_core::{
    engagement_trends, Attempt, ClassMastery, ContentStore, EngagementState, EngagementTrends,
    JoinSession, LearningStore, MasteryScore, MasteryUpdate, PushQuestion, QuestionPushed,
    QuestionResults, Result, Role, ServerEvent, Session, SessionEnded, SessionSnapshot,
    SessionStarted, SessionSummary, SubmitAnswer,
};
use telemetry::metrics;

use crate::config::SessionConfig;
use crate::hub::{EventReceiver, SessionHub};
use crate::registry::SessionRegistry;
use crate::retry::{with_retry, RetryPolicy};
use crate::timers::AutoCloseTimers;
use crate::tracker::MasteryTracker;

#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    config: SessionConfig,
    registry: SessionRegistry,
    hub: SessionHub,
    timers: AutoCloseTimers,
    tracker: MasteryTracker,
    content: Arc<dyn ContentStore>,
    learning: Arc<dyn LearningStore>,
    retry: RetryPolicy,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        content: Arc<dyn ContentStore>,
        learning: Arc<dyn LearningStore>,
    ) -> Self {
        let retry = RetryPolicy {
            max_retries: config.store_retries,
            backoff: config.store_retry_backoff(),
        };
        let tracker = MasteryTracker::new(learning.clone(), config.mastery_policy(), retry);

        Self {
            inner: Arc::new(Inner {
                hub: SessionHub::new(config.topic_capacity),
                registry: SessionRegistry::new(),
                timers: AutoCloseTimers::new(),
                tracker,
                content,
                learning,
                retry,
                config,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn hub(&self) -> &SessionHub {
        &self.inner.hub
    }

    pub fn subscribe(&self, session_id: &str) -> EventReceiver {
        self.inner.hub.subscribe(session_id)
    }

    /// Drops the session's topic when no session is registered under the id
    /// and nobody is subscribed. Topics of live sessions are kept.
    pub fn release_topic(&self, session_id: &str) -> bool {
        if self.inner.registry.get(session_id).is_some() {
            return false;
        }
        self.inner.hub.release(session_id)
    }

    fn publish(&self, session_id: &str, event: ServerEvent) {
        self.inner.hub.publish(session_id, event);
    }

    fn broadcast_engagement(&self, session: &mut Session) {
        let state = session.recompute_engagement();
        self.publish(&session.id, ServerEvent::EngagementUpdate(state));
    }

    // === Registry ===

    /// A teacher join creates the session if needed; a student join adds the
    /// student to an existing session. Returns `false` when the join was
    /// dropped because the session does not exist.
    pub async fn join(&self, join: &JoinSession) -> bool {
        let now = Utc::now();

        match join.role {
            Role::Teacher => {
                let (handle, created) = self.inner.registry.get_or_create(&join.session_id, || {
                    Session::new(
                        join.session_id.clone(),
                        join.user_id.clone(),
                        join.class_id.clone().unwrap_or_default(),
                        now,
                    )
                });
                let mut session = handle.lock().await;
                session.touch(now);

                if created {
                    metrics().sessions_started.inc();
                    metrics().active_sessions.inc();
                    info!(
                        session_id = %session.id,
                        teacher_id = %session.teacher_id,
                        class_id = %session.class_id,
                        "Session started"
                    );
                    self.publish(
                        &session.id,
                        ServerEvent::SessionStarted(SessionStarted {
                            session_id: session.id.clone(),
                            class_id: session.class_id.clone(),
                            teacher_id: session.teacher_id.clone(),
                            concept_id: session.concept_id.clone(),
                            started_at: session.started_at,
                        }),
                    );
                }

                self.broadcast_engagement(&mut session);
                true
            }
            Role::Student => {
                let Some(mut session) = self.inner.registry.lock(&join.session_id).await else {
                    debug!(session_id = %join.session_id, user_id = %join.user_id, "Join for unknown session");
                    return false;
                };
                if session.add_student(&join.user_id) {
                    metrics().students_joined.inc();
                    info!(session_id = %session.id, student_id = %join.user_id, "Student joined");
                }
                session.touch(now);
                self.broadcast_engagement(&mut session);
                true
            }
        }
    }

    /// Removes the user from the session. Answers already given stay.
    pub async fn leave(&self, session_id: &str, user_id: &str) {
        let Some(mut session) = self.inner.registry.lock(session_id).await else {
            debug!(session_id, user_id, "Leave for unknown session");
            return;
        };
        if session.remove_student(user_id) {
            info!(session_id, student_id = user_id, "Student left");
        }
        session.touch(Utc::now());
        self.broadcast_engagement(&mut session);
    }

    /// Ends the session, returning its summary. The active question, if
    /// any, is discarded without results.
    pub async fn end(&self, session_id: &str) -> Option<SessionSummary> {
        let handle = self.inner.registry.get(session_id)?;
        let session = handle.clone().lock_owned().await;
        if !self.inner.registry.remove_if_current(session_id, &handle) {
            return None;
        }

        self.inner.timers.cancel(session_id);
        let summary = session.summary();
        let ended_at = Utc::now();

        self.publish(
            session_id,
            ServerEvent::SessionEnded(SessionEnded {
                session_id: session_id.to_string(),
                ended_at,
                summary: summary.clone(),
            }),
        );
        self.inner.hub.close(session_id);

        metrics().sessions_ended.inc();
        metrics().active_sessions.dec();
        info!(
            session_id,
            questions_asked = summary.questions_asked,
            average_engagement = summary.average_engagement,
            duration_secs = (ended_at - session.started_at).num_seconds(),
            "Session ended"
        );

        Some(summary)
    }

    // === Question lifecycle ===

    /// Fetches the question, makes it active and schedules its auto-close.
    /// A question that does not exist aborts the push without any broadcast.
    pub async fn push_question(&self, push: &PushQuestion) -> Result<()> {
        let Some(mut session) = self.inner.registry.lock(&push.session_id).await else {
            debug!(session_id = %push.session_id, "Push for unknown session");
            return Ok(());
        };

        let started = Instant::now();
        let fetched = self.inner.content.question_by_id(&push.question_id).await;
        metrics()
            .content_fetch_latency_ms
            .observe(started.elapsed().as_millis() as u64);

        let question = match fetched {
            Ok(Some(question)) => question,
            Ok(None) => {
                metrics().questions_not_found.inc();
                warn!(
                    session_id = %push.session_id,
                    question_id = %push.question_id,
                    "Question not found, push aborted"
                );
                return Ok(());
            }
            Err(e) => {
                metrics().content_errors.inc();
                error!(question_id = %push.question_id, error = %e, "Question fetch failed");
                return Err(e);
            }
        };

        let now = Utc::now();
        let time_limit = push
            .time_limit
            .unwrap_or(self.inner.config.default_time_limit_secs);
        let view = question.view();

        if let Some(replaced) = session.start_question(question, time_limit, now) {
            metrics().questions_replaced.inc();
            warn!(
                session_id = %session.id,
                replaced_question_id = %replaced.question_id(),
                discarded_answers = replaced.answers.len(),
                "Active question replaced without scoring"
            );
        }
        metrics().questions_pushed.inc();

        self.publish(
            &session.id,
            ServerEvent::QuestionPushed(QuestionPushed {
                session_id: session.id.clone(),
                question: view,
                pushed_at: now,
                time_limit,
            }),
        );

        let controller = self.clone();
        let session_id = session.id.clone();
        let question_id = push.question_id.clone();
        self.inner.timers.schedule(
            &session.id,
            &push.question_id,
            Duration::from_secs(time_limit as u64),
            async move {
                if let Err(e) = controller.close_question(&session_id, &question_id).await {
                    error!(%session_id, %question_id, error = %e, "Auto-close failed");
                }
            },
        );

        info!(
            session_id = %session.id,
            question_id = %push.question_id,
            concept_id = %session.concept_id,
            time_limit,
            "Question pushed"
        );
        Ok(())
    }

    /// Records an answer to the active question and updates the student's
    /// mastery. Answers to any other question are dropped (`Ok(None)`).
    ///
    /// The returned update is meant for the answering connection only.
    pub async fn submit_answer(&self, answer: &SubmitAnswer) -> Result<Option<MasteryUpdate>> {
        let started = Instant::now();

        let Some(mut session) = self.inner.registry.lock(&answer.session_id).await else {
            metrics().answers_stale.inc();
            debug!(session_id = %answer.session_id, "Answer for unknown session");
            return Ok(None);
        };

        let Some(recorded) = session.record_answer(
            &answer.question_id,
            &answer.student_id,
            answer.answer.clone(),
            answer.time_taken,
            Utc::now(),
        ) else {
            metrics().answers_stale.inc();
            debug!(
                session_id = %answer.session_id,
                question_id = %answer.question_id,
                student_id = %answer.student_id,
                "Answer for inactive question dropped"
            );
            return Ok(None);
        };
        metrics().answers_received.inc();

        let concept_id = session.concept_id.clone();
        let outcome = self
            .inner
            .tracker
            .record(
                &answer.student_id,
                &concept_id,
                Attempt {
                    question_id: answer.question_id.clone(),
                    is_correct: recorded.is_correct,
                    time_taken: answer.time_taken,
                },
            )
            .await;

        self.broadcast_engagement(&mut session);
        metrics()
            .answer_latency_ms
            .observe(started.elapsed().as_millis() as u64);

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                metrics().store_errors.inc();
                error!(
                    session_id = %answer.session_id,
                    student_id = %answer.student_id,
                    %concept_id,
                    error = %e,
                    "Mastery update failed"
                );
                return Err(e);
            }
        };

        debug!(
            session_id = %answer.session_id,
            question_id = %answer.question_id,
            student_id = %answer.student_id,
            is_correct = recorded.is_correct,
            "Answer recorded"
        );

        Ok(Some(MasteryUpdate {
            student_id: answer.student_id.clone(),
            change: outcome.change(),
            concept_id,
            new_score: outcome.score.overall_score,
            previous_score: outcome.previous_score,
        }))
    }

    /// Closes `question_id` if it is still active: broadcasts the results
    /// and persists an engagement log. Returns `None` when there was nothing
    /// to close. The question is cleared even when persisting fails.
    pub async fn close_question(
        &self,
        session_id: &str,
        question_id: &str,
    ) -> Result<Option<QuestionResults>> {
        let Some(mut session) = self.inner.registry.lock(session_id).await else {
            return Ok(None);
        };

        let Some(closed) = session.close_question(question_id, Utc::now()) else {
            debug!(session_id, question_id, "Close for inactive question ignored");
            return Ok(None);
        };
        self.inner.timers.cancel_question(session_id, question_id);
        metrics().questions_closed.inc();

        self.publish(session_id, ServerEvent::QuestionResults(closed.results.clone()));

        info!(
            session_id,
            question_id,
            total_responses = closed.results.total_responses,
            correct_responses = closed.results.correct_responses,
            average_time = closed.results.average_time,
            "Question closed"
        );

        let learning = &self.inner.learning;
        if let Err(e) = with_retry(self.inner.retry, "append_engagement_log", || {
            learning.append_engagement_log(&closed.log)
        })
        .await
        {
            metrics().store_errors.inc();
            error!(session_id, question_id, error = %e, "Engagement log not persisted");
            return Err(e);
        }
        metrics().engagement_logs_written.inc();

        Ok(Some(closed.results))
    }

    // === Reads ===

    /// Last computed engagement state of the session.
    pub async fn engagement(&self, session_id: &str) -> Option<EngagementState> {
        self.inner
            .registry
            .lock(session_id)
            .await
            .and_then(|s| s.engagement.clone())
    }

    pub async fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.inner
            .registry
            .lock(session_id)
            .await
            .map(|s| s.snapshot())
    }

    pub async fn list(&self) -> Vec<SessionSnapshot> {
        let mut snapshots = Vec::new();
        for handle in self.inner.registry.handles() {
            snapshots.push(handle.lock().await.snapshot());
        }
        snapshots.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        snapshots
    }

    pub fn session_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Sessions past their maximum duration or idle timeout at `now`.
    pub async fn expired_sessions(&self, now: DateTime<Utc>) -> Vec<String> {
        let max_duration = self.inner.config.max_duration();
        let idle_timeout = self.inner.config.idle_timeout();

        let mut expired = Vec::new();
        for handle in self.inner.registry.handles() {
            let session = handle.lock().await;
            if session.is_expired(now, max_duration, idle_timeout) {
                expired.push(session.id.clone());
            }
        }
        expired
    }

    pub async fn student_mastery(&self, student_id: &str) -> Result<Vec<MasteryScore>> {
        let learning = &self.inner.learning;
        with_retry(self.inner.retry, "student_mastery", || {
            learning.student_mastery(student_id)
        })
        .await
    }

    pub async fn class_mastery(
        &self,
        concept_id: &str,
        student_ids: &[String],
    ) -> Result<ClassMastery> {
        let learning = &self.inner.learning;
        let scores = with_retry(self.inner.retry, "concept_mastery", || {
            learning.concept_mastery(concept_id, student_ids)
        })
        .await?;
        Ok(ClassMastery::from_scores(concept_id, &scores))
    }

    pub async fn engagement_trends(
        &self,
        class_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<EngagementTrends> {
        let learning = &self.inner.learning;
        let logs = with_retry(self.inner.retry, "engagement_logs", || {
            learning.engagement_logs(class_id, from, to)
        })
        .await?;
        Ok(engagement_trends(&logs))
    }

    /// Readiness probe of the learning store.
    pub async fn ping_store(&self) -> Result<()> {
        self.inner.learning.ping().await
    }
}
