//! WebSocket transport and HTTP read API for the classroom engine.

pub mod content;
pub mod response;
pub mod routes;
pub mod state;

pub use content::ContentClient;
pub use routes::router;
pub use state::AppState;
