pub mod admission;
pub mod app;
pub mod authority;
pub mod config;
pub mod db;
pub mod errors;
pub mod jwt;
pub mod models;
pub mod routes;
pub mod store;

// Re-export commonly used items for tests
pub use app::{create_app, AppState};
