//! Gatekeeper error types

use thiserror::Error;

/// Errors that can occur while configuring the gatekeeper
#[derive(Error, Debug)]
pub enum GatekeeperError {
    /// Configuration could not be parsed or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),
}
