//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Database connection and migrations (db)
//! - Configuration loading (config)
//! - Concurrency, soft-delete and audit core (persistence)
//! - Repository implementations (repositories)
//! - HTTP server setup (server)
//! - Application state (state)

pub mod config;
pub mod db;
pub mod persistence;
pub mod repositories;
pub mod server;
pub mod state;

pub use repositories::*;
pub use state::AppState;
