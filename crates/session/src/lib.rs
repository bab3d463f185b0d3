//! Live session engine: session registry, question lifecycle, auto-close
//! timers, per-session broadcast topics and mastery tracking.

pub mod config;
pub mod controller;
pub mod hub;
pub mod memory;
pub mod registry;
pub mod retry;
pub mod timers;
pub mod tracker;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use hub::{EventReceiver, SessionHub};
pub use memory::InMemoryStore;
pub use retry::{with_retry, RetryPolicy};
pub use tracker::{MasteryOutcome, MasteryTracker};
