pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod state;
pub mod validation;

pub use app::build_router;
