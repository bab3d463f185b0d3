//! ClickHouse learning store for the classroom engine.

pub mod client;
pub mod config;
pub mod health;
pub mod insert;
pub mod query;
pub mod rows;
pub mod schema;
pub mod store;

pub use client::*;
pub use config::*;
pub use schema::init_schema;
pub use store::ClickHouseLearningStore;
