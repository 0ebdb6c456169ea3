// Error types for hostswitch

use thiserror::Error;

/// Result type alias using anyhow::Error
pub type Result<T> = anyhow::Result<T>;

/// Hostswitch-specific error types
#[derive(Error, Debug)]
pub enum SwitchError {
    #[error("Service not found")]
    ServiceNotFound(String),

    /// A unit start/stop/restart failed; `detail` is the controller's message verbatim
    #[error("{detail}")]
    ActionFailed {
        service: String,
        action: String,
        detail: String,
    },

    #[error("Failed to connect to systemd D-Bus: {0}")]
    SystemdConnection(String),

    #[error("Failed to fetch service information: {0}")]
    ServiceInfo(String),

    #[error("Failed to sample resources: {0}")]
    Sampling(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
