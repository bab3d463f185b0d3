//! Background workers for the classroom engine.
//!
//! - Reaper (ends sessions past their maximum duration or idle timeout)
//! - Notifications (low-engagement alerts to teachers' dashboards)
//! - Metrics logging

pub mod notifications;
pub mod reaper;
pub mod scheduler;

pub use notifications::{Notification, NotificationChannel, NotificationWorker};
pub use reaper::SessionReaper;
pub use scheduler::*;
