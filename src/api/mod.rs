//! API layer - HTTP endpoints and middleware

pub mod farm;
pub mod health;
pub mod middleware;
pub mod router;
pub mod state;
pub mod types;

pub use router::create_router;
pub use state::AppState;
