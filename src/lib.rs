pub mod api;
pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod llm;
pub mod providers;
pub mod service;

// Re-export commonly used items
pub use config::AppConfig;
pub use service::{Answer, AskError, InitError, QAService, QAServiceBuilder, ServiceLifecycle, ServiceState};
