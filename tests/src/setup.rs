//! Common test setup functions.

use std::sync::Arc;

use api::{router, AppState};
use axum::Router;
use classroom_core::Question;
use clickhouse_client::{init_schema, ClickHouseClient, ClickHouseConfig, ClickHouseLearningStore};
use session_engine::{EventReceiver, InMemoryStore, SessionConfig, SessionController};

use crate::containers::TestContainers;
use crate::fixtures;
use crate::mocks::FlakyStore;

/// Test context wiring the real controller and router to in-memory stores.
///
/// Content comes from an [`InMemoryStore`] seeded with the given questions;
/// the learning store is a [`FlakyStore`] so tests can inject write
/// failures. No Docker needed.
pub struct TestContext {
    pub content: Arc<InMemoryStore>,
    pub learning: FlakyStore,
    pub controller: SessionController,
    pub router: Router,
}

impl TestContext {
    /// No authored questions.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn new(questions: impl IntoIterator<Item = Question>) -> Self {
        Self::with_config(SessionConfig::default(), questions)
    }

    pub fn with_config(
        config: SessionConfig,
        questions: impl IntoIterator<Item = Question>,
    ) -> Self {
        let content = Arc::new(InMemoryStore::with_questions(questions));
        let learning = FlakyStore::new(Arc::new(InMemoryStore::new()));
        let controller =
            SessionController::new(config, content.clone(), Arc::new(learning.clone()));
        let router = router(AppState::new(controller.clone()));

        Self {
            content,
            learning,
            controller,
            router,
        }
    }

    /// Subscribes to the fixture session, then starts it with the fixture
    /// teacher and the given students.
    pub async fn start_classroom(&self, students: &[String]) -> EventReceiver {
        let events = self.controller.subscribe(fixtures::SESSION_ID);
        self.controller.join(&fixtures::teacher_join()).await;
        for student in students {
            self.controller.join(&fixtures::student_join(student)).await;
        }
        events
    }

    /// Engagement logs that actually reached the store.
    pub fn persisted_logs(&self) -> usize {
        self.learning.inner().engagement_log_count()
    }
}

/// Test context against a real ClickHouse (testcontainer or
/// `CLASSROOM_TEST_CLICKHOUSE_URL`).
pub struct ClickHouseContext {
    pub containers: TestContainers,
    pub client: ClickHouseClient,
    pub store: ClickHouseLearningStore,
}

impl ClickHouseContext {
    pub async fn new() -> Self {
        let containers = TestContainers::start().await;

        let client = ClickHouseClient::new(ClickHouseConfig {
            url: containers.clickhouse_url.clone(),
            database: containers.clickhouse_database.clone(),
            username: containers.clickhouse_username.clone(),
            password: containers.clickhouse_password.clone(),
            init_schema: true,
        });

        init_schema(&client)
            .await
            .expect("Failed to initialize schema");
        clickhouse_client::query::truncate_all(&client)
            .await
            .expect("Failed to truncate tables");

        let store = ClickHouseLearningStore::new(client.clone());

        Self {
            containers,
            client,
            store,
        }
    }
}
