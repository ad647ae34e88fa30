//! Error types for the core library.

use thiserror::Error;

use crate::config::ConfigError;
use crate::session::{ConnectError, SessionError};

/// Errors that halt a run.
///
/// Everything else that can go wrong during a run is absorbed per leaf and
/// shows up in the [`RunReport`](crate::RunReport) instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Could not connect or log in.
    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    /// The inbox baseline could not be established.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
