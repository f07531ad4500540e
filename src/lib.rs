pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod handler;
pub mod repository;
pub mod services;
pub mod views;

// re-exports for ease
pub use app::{AppServices, build_app};
pub use config::Settings;
pub use error::AppError;
