pub mod handlers;
pub mod relay;
pub mod routes;

pub use routes::{build_app, router, AppState};
