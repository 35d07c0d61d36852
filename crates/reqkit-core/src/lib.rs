//! Core configuration and error types for reqkit.
//!
//! Everything here is process-level: the server binary reads its settings
//! with [`ServerConfig::from_env`] and reports setup failures as
//! [`ReqkitError`]. Request-level errors live in `reqkit-model`.

mod config;
mod error;

pub use config::ServerConfig;
pub use error::{ReqkitError, ReqkitResult};
