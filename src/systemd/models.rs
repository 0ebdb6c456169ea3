// Unit and proxy data models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle action issued against a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitAction {
    Start,
    Stop,
    Restart,
}

impl UnitAction {
    /// systemd Manager method implementing this action
    pub fn dbus_method(&self) -> &'static str {
        match self {
            UnitAction::Start => "StartUnit",
            UnitAction::Stop => "StopUnit",
            UnitAction::Restart => "RestartUnit",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UnitAction::Start => "start",
            UnitAction::Stop => "stop",
            UnitAction::Restart => "restart",
        }
    }

    /// Whether an `ActiveState` value means the action has finished successfully
    pub fn is_settled(&self, active_state: &str) -> bool {
        match self {
            UnitAction::Start | UnitAction::Restart => {
                active_state == "active" || active_state == "reloading"
            }
            UnitAction::Stop => active_state == "inactive" || active_state == "failed",
        }
    }
}

impl fmt::Display for UnitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure detail reported by a controller call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ActionError(pub String);

impl ActionError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }

    pub fn detail(&self) -> &str {
        &self.0
    }
}

/// Outcome of a unit or proxy action
pub type ActionResult = std::result::Result<(), ActionError>;

/// A reverse-proxy site definition that can be linked into sites-enabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRoute {
    config_path: PathBuf,
}

impl ProxyRoute {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Path of the site definition (the symlink target)
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// File name used for the link under sites-enabled
    pub fn site_name(&self) -> Option<&str> {
        self.config_path.file_name().and_then(|name| name.to_str())
    }
}

/// Live status of a registered service, derived per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub key: String,
    pub name: String,
    pub active: bool,
    pub unit: String,
    pub port: u16,
}
