pub mod cli;
pub mod models;
pub mod service;

pub use models::*;
pub use service::{AppState, build_router, create_app};
