//! Core types, scoring models and wire protocol for the classroom engine.

pub mod engagement;
pub mod error;
pub mod limits;
pub mod mastery;
pub mod protocol;
pub mod question;
pub mod session;
pub mod store;

pub use engagement::*;
pub use error::{Error, Result};
pub use mastery::*;
pub use protocol::*;
pub use question::*;
pub use session::*;
pub use store::{ContentStore, LearningStore};
