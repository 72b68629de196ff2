//! REST API module

pub mod handlers;
pub mod models;
pub mod routes;
pub mod session;

pub use routes::{AppState, create_router};
pub use session::ModelSession;
